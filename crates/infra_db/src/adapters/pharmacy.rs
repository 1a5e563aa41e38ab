//! PostgreSQL Pharmacy Adapter
//!
//! A dispense runs in one transaction:
//!
//! 1. lock the prescription row (`FOR UPDATE`)
//! 2. lock every referenced inventory item, then batch, in id order
//! 3. plan the prescription change and each stock withdrawal on the locked
//!    values using the domain rules
//! 4. write the prescription, the fill record, the stock levels and the
//!    `OUT` movements, then commit
//!
//! Any error returns before commit and the transaction rolls back on drop.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    BatchId, DomainPort, FillId, InventoryItemId, PatientId, PortError, PrescriptionId,
    StockMovementId, UserId,
};
use domain_pharmacy::{
    DispenseCommand, DispenseItem, DispenseOutcome, InventoryBatch, InventoryItem, Medication,
    MovementType, PharmacyError, PharmacyPort, Prescription, PrescriptionFill, PrescriptionQuery,
    PrescriptionStatus, StockMovement, StockReceipt,
};

use crate::error::{db_err, decode_json, encode_json, from_count, parse_column, to_count, DatabaseError};

const PRESCRIPTION_COLUMNS: &str = "id, patient_id, prescribed_by, medications, status, \
    refills_remaining, last_refill_date, dispensed_by, dispensed_at, dispensing_notes, notes, \
    created_at, updated_at";

const FILL_COLUMNS: &str = "id, prescription_id, fill_type, items, dispensed_by, notes, created_at";

const ITEM_COLUMNS: &str = "id, name, sku, unit, current_stock, reorder_level, is_active, \
    created_at, updated_at";

const BATCH_COLUMNS: &str = "id, item_id, batch_number, expiry_date, remaining_quantity, received_at";

const MOVEMENT_COLUMNS: &str = "id, item_id, batch_id, movement_type, quantity, reference_type, \
    reference_id, performed_by, created_at";

#[derive(Debug, FromRow)]
struct PrescriptionRow {
    id: Uuid,
    patient_id: Uuid,
    prescribed_by: Uuid,
    medications: String,
    status: String,
    refills_remaining: i32,
    last_refill_date: Option<DateTime<Utc>>,
    dispensed_by: Option<Uuid>,
    dispensed_at: Option<DateTime<Utc>>,
    dispensing_notes: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PrescriptionRow> for Prescription {
    type Error = PortError;

    fn try_from(row: PrescriptionRow) -> Result<Self, Self::Error> {
        Ok(Prescription {
            id: PrescriptionId::from(row.id),
            patient_id: PatientId::from(row.patient_id),
            prescribed_by: UserId::from(row.prescribed_by),
            medications: decode_json::<Vec<Medication>>(&row.medications, "medications")?,
            status: parse_column::<PrescriptionStatus>(&row.status, "status")?,
            refills_remaining: to_count(row.refills_remaining, "refills_remaining")?,
            last_refill_date: row.last_refill_date,
            dispensed_by: row.dispensed_by.map(UserId::from),
            dispensed_at: row.dispensed_at,
            dispensing_notes: row.dispensing_notes,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct FillRow {
    id: Uuid,
    prescription_id: Uuid,
    fill_type: String,
    items: String,
    dispensed_by: Uuid,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FillRow> for PrescriptionFill {
    type Error = PortError;

    fn try_from(row: FillRow) -> Result<Self, Self::Error> {
        Ok(PrescriptionFill {
            id: FillId::from(row.id),
            prescription_id: PrescriptionId::from(row.prescription_id),
            fill_type: parse_column(&row.fill_type, "fill_type")?,
            items: decode_json::<Vec<DispenseItem>>(&row.items, "items")?,
            dispensed_by: UserId::from(row.dispensed_by),
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    name: String,
    sku: String,
    unit: String,
    current_stock: i32,
    reorder_level: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = PortError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(InventoryItem {
            id: InventoryItemId::from(row.id),
            name: row.name,
            sku: row.sku,
            unit: row.unit,
            current_stock: to_count(row.current_stock, "current_stock")?,
            reorder_level: to_count(row.reorder_level, "reorder_level")?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    item_id: Uuid,
    batch_number: String,
    expiry_date: Option<NaiveDate>,
    remaining_quantity: i32,
    received_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for InventoryBatch {
    type Error = PortError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(InventoryBatch {
            id: BatchId::from(row.id),
            item_id: InventoryItemId::from(row.item_id),
            batch_number: row.batch_number,
            expiry_date: row.expiry_date,
            remaining_quantity: to_count(row.remaining_quantity, "remaining_quantity")?,
            received_at: row.received_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    item_id: Uuid,
    batch_id: Option<Uuid>,
    movement_type: String,
    quantity: i32,
    reference_type: String,
    reference_id: Option<String>,
    performed_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = PortError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(StockMovement {
            id: StockMovementId::from(row.id),
            item_id: InventoryItemId::from(row.item_id),
            batch_id: row.batch_id.map(BatchId::from),
            movement_type: parse_column::<MovementType>(&row.movement_type, "movement_type")?,
            quantity: to_count(row.quantity, "quantity")?,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            performed_by: UserId::from(row.performed_by),
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL-backed implementation of the PharmacyPort trait
#[derive(Debug, Clone)]
pub struct PostgresPharmacyAdapter {
    pool: PgPool,
}

impl PostgresPharmacyAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_items(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[Uuid],
    ) -> Result<HashMap<InventoryItemId, InventoryItem>, PortError> {
        let sql = format!(
            "SELECT {} FROM inventory_items WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(ids)
            .fetch_all(&mut **tx)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|row| InventoryItem::try_from(row).map(|item| (item.id, item)))
            .collect()
    }

    async fn lock_batches(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[Uuid],
    ) -> Result<HashMap<BatchId, InventoryBatch>, PortError> {
        let sql = format!(
            "SELECT {} FROM inventory_batches WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(ids)
            .fetch_all(&mut **tx)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|row| InventoryBatch::try_from(row).map(|batch| (batch.id, batch)))
            .collect()
    }

    async fn insert_movement(
        tx: &mut Transaction<'_, Postgres>,
        movement: &StockMovement,
    ) -> Result<(), PortError> {
        let sql = format!(
            "INSERT INTO stock_movements ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            MOVEMENT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(*movement.id.as_uuid())
            .bind(*movement.item_id.as_uuid())
            .bind(movement.batch_id.map(Uuid::from))
            .bind(movement.movement_type.as_str())
            .bind(from_count(movement.quantity, "quantity")?)
            .bind(&movement.reference_type)
            .bind(&movement.reference_id)
            .bind(*movement.performed_by.as_uuid())
            .bind(movement.created_at)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn write_item_stock(
        tx: &mut Transaction<'_, Postgres>,
        item: &InventoryItem,
        at: DateTime<Utc>,
    ) -> Result<(), PortError> {
        sqlx::query("UPDATE inventory_items SET current_stock = $2, updated_at = $3 WHERE id = $1")
            .bind(*item.id.as_uuid())
            .bind(from_count(item.current_stock, "current_stock")?)
            .bind(at)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

impl DomainPort for PostgresPharmacyAdapter {}

#[async_trait]
impl PharmacyPort for PostgresPharmacyAdapter {
    #[instrument(skip(self, prescription), fields(prescription_id = %prescription.id))]
    async fn create_prescription(&self, prescription: Prescription) -> Result<Prescription, PortError> {
        let sql = format!(
            "INSERT INTO prescriptions ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {}",
            PRESCRIPTION_COLUMNS, PRESCRIPTION_COLUMNS
        );
        sqlx::query_as::<_, PrescriptionRow>(&sql)
            .bind(*prescription.id.as_uuid())
            .bind(*prescription.patient_id.as_uuid())
            .bind(*prescription.prescribed_by.as_uuid())
            .bind(encode_json(&prescription.medications, "medications")?)
            .bind(prescription.status.as_str())
            .bind(from_count(prescription.refills_remaining, "refills_remaining")?)
            .bind(prescription.last_refill_date)
            .bind(prescription.dispensed_by.map(Uuid::from))
            .bind(prescription.dispensed_at)
            .bind(&prescription.dispensing_notes)
            .bind(&prescription.notes)
            .bind(prescription.created_at)
            .bind(prescription.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()
    }

    #[instrument(skip(self), fields(prescription_id = %id))]
    async fn get_prescription(&self, id: PrescriptionId) -> Result<Prescription, PortError> {
        let sql = format!("SELECT {} FROM prescriptions WHERE id = $1", PRESCRIPTION_COLUMNS);
        sqlx::query_as::<_, PrescriptionRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("Prescription", id))?
            .try_into()
    }

    #[instrument(skip(self))]
    async fn find_prescriptions(&self, query: PrescriptionQuery) -> Result<Vec<Prescription>, PortError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM prescriptions WHERE 1 = 1",
            PRESCRIPTION_COLUMNS
        ));
        if let Some(patient_id) = query.patient_id {
            builder.push(" AND patient_id = ");
            builder.push_bind(Uuid::from(patient_id));
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        builder.push(" ORDER BY created_at DESC");
        let rows = builder
            .build_query_as::<PrescriptionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(Prescription::try_from).collect()
    }

    #[instrument(skip(self), fields(prescription_id = %id))]
    async fn list_fills(&self, id: PrescriptionId) -> Result<Vec<PrescriptionFill>, PortError> {
        let sql = format!(
            "SELECT {} FROM prescription_fills WHERE prescription_id = $1 ORDER BY created_at",
            FILL_COLUMNS
        );
        let rows = sqlx::query_as::<_, FillRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(PrescriptionFill::try_from).collect()
    }

    #[instrument(
        skip(self, command),
        fields(prescription_id = %command.prescription_id, kind = command.dispense_type.as_str())
    )]
    async fn dispense(&self, command: DispenseCommand) -> Result<DispenseOutcome, PharmacyError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "SELECT {} FROM prescriptions WHERE id = $1 FOR UPDATE",
            PRESCRIPTION_COLUMNS
        );
        let current: Prescription = sqlx::query_as::<_, PrescriptionRow>(&sql)
            .bind(*command.prescription_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| PharmacyError::PrescriptionNotFound(command.prescription_id.to_string()))?
            .try_into()?;
        let prescription = command.plan_prescription(&current)?;

        let mut item_ids: Vec<Uuid> = command.items.iter().map(|l| Uuid::from(l.item_id)).collect();
        item_ids.sort();
        item_ids.dedup();
        let mut batch_ids: Vec<Uuid> = command
            .items
            .iter()
            .filter_map(|l| l.batch_id.map(Uuid::from))
            .collect();
        batch_ids.sort();
        batch_ids.dedup();

        let mut items = Self::lock_items(&mut tx, &item_ids).await?;
        let mut batches = Self::lock_batches(&mut tx, &batch_ids).await?;

        let mut movements = Vec::with_capacity(command.items.len());
        for line in &command.items {
            let item = items
                .get_mut(&line.item_id)
                .ok_or_else(|| PharmacyError::ItemNotFound(line.item_id.to_string()))?;
            let batch = match line.batch_id {
                Some(batch_id) => Some(
                    batches
                        .get_mut(&batch_id)
                        .ok_or_else(|| PharmacyError::BatchNotFound(batch_id.to_string()))?,
                ),
                None => None,
            };
            movements.push(command.withdraw_line(line, item, batch)?);
        }

        sqlx::query(
            "UPDATE prescriptions SET status = $2, refills_remaining = $3, last_refill_date = $4, \
             dispensed_by = $5, dispensed_at = $6, dispensing_notes = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(*prescription.id.as_uuid())
        .bind(prescription.status.as_str())
        .bind(from_count(prescription.refills_remaining, "refills_remaining")?)
        .bind(prescription.last_refill_date)
        .bind(prescription.dispensed_by.map(Uuid::from))
        .bind(prescription.dispensed_at)
        .bind(&prescription.dispensing_notes)
        .bind(prescription.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let fill = command.fill_record();
        let fill_sql = format!(
            "INSERT INTO prescription_fills ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            FILL_COLUMNS
        );
        sqlx::query(&fill_sql)
            .bind(*fill.id.as_uuid())
            .bind(*fill.prescription_id.as_uuid())
            .bind(fill.fill_type.as_str())
            .bind(encode_json(&fill.items, "items")?)
            .bind(*fill.dispensed_by.as_uuid())
            .bind(&fill.notes)
            .bind(fill.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for item in items.values() {
            Self::write_item_stock(&mut tx, item, command.at).await?;
        }
        for batch in batches.values() {
            sqlx::query("UPDATE inventory_batches SET remaining_quantity = $2 WHERE id = $1")
                .bind(*batch.id.as_uuid())
                .bind(from_count(batch.remaining_quantity, "remaining_quantity")?)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        for movement in &movements {
            Self::insert_movement(&mut tx, movement).await?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(lines = movements.len(), "Dispense committed");

        Ok(DispenseOutcome {
            prescription,
            fill,
            movements,
        })
    }

    #[instrument(skip(self, item), fields(sku = %item.sku))]
    async fn create_item(&self, item: InventoryItem) -> Result<InventoryItem, PortError> {
        let sql = format!(
            "INSERT INTO inventory_items ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            ITEM_COLUMNS, ITEM_COLUMNS
        );
        sqlx::query_as::<_, ItemRow>(&sql)
            .bind(*item.id.as_uuid())
            .bind(&item.name)
            .bind(&item.sku)
            .bind(&item.unit)
            .bind(from_count(item.current_stock, "current_stock")?)
            .bind(from_count(item.reorder_level, "reorder_level")?)
            .bind(item.is_active)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()
    }

    #[instrument(skip(self), fields(item_id = %id))]
    async fn get_item(&self, id: InventoryItemId) -> Result<InventoryItem, PortError> {
        let sql = format!("SELECT {} FROM inventory_items WHERE id = $1", ITEM_COLUMNS);
        sqlx::query_as::<_, ItemRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("InventoryItem", id))?
            .try_into()
    }

    #[instrument(skip(self, batch, movement), fields(item_id = %batch.item_id, quantity = batch.remaining_quantity))]
    async fn receive_stock(
        &self,
        batch: InventoryBatch,
        movement: StockMovement,
    ) -> Result<StockReceipt, PortError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut items = Self::lock_items(&mut tx, &[Uuid::from(batch.item_id)]).await?;
        let mut item = items
            .remove(&batch.item_id)
            .ok_or_else(|| DatabaseError::not_found("InventoryItem", batch.item_id))?;
        item.current_stock = item
            .current_stock
            .checked_add(batch.remaining_quantity)
            .ok_or_else(|| PortError::validation_field("Stock level overflow", "quantity"))?;
        item.updated_at = movement.created_at;

        let batch_sql = format!(
            "INSERT INTO inventory_batches ({}) VALUES ($1, $2, $3, $4, $5, $6)",
            BATCH_COLUMNS
        );
        sqlx::query(&batch_sql)
            .bind(*batch.id.as_uuid())
            .bind(*batch.item_id.as_uuid())
            .bind(&batch.batch_number)
            .bind(batch.expiry_date)
            .bind(from_count(batch.remaining_quantity, "remaining_quantity")?)
            .bind(batch.received_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        Self::write_item_stock(&mut tx, &item, movement.created_at).await?;
        Self::insert_movement(&mut tx, &movement).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(StockReceipt { item, batch, movement })
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn list_movements(&self, item_id: InventoryItemId) -> Result<Vec<StockMovement>, PortError> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE item_id = $1 ORDER BY created_at DESC, id DESC",
            MOVEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, MovementRow>(&sql)
            .bind(*item_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(StockMovement::try_from).collect()
    }
}
