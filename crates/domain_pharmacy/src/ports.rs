//! Pharmacy Domain Ports
//!
//! Dispensing and stock receipt are multi-row writes. The port exposes each
//! as a single operation so that adapters can run it inside one transaction
//! and hold row locks for its duration, while the business rules stay in
//! [`DispenseCommand`] and the inventory value objects.

use async_trait::async_trait;

use core_kernel::{DomainPort, InventoryItemId, PatientId, PortError, PrescriptionId};

use crate::dispense::{DispenseCommand, DispenseOutcome, PrescriptionFill};
use crate::error::PharmacyError;
use crate::inventory::{InventoryBatch, InventoryItem, StockMovement, StockReceipt};
use crate::prescription::{Prescription, PrescriptionStatus};

/// Query parameters for listing prescriptions
#[derive(Debug, Clone, Default)]
pub struct PrescriptionQuery {
    pub patient_id: Option<PatientId>,
    pub status: Option<PrescriptionStatus>,
}

impl PrescriptionQuery {
    pub fn matches(&self, prescription: &Prescription) -> bool {
        self.patient_id.map_or(true, |id| prescription.patient_id == id)
            && self.status.map_or(true, |s| prescription.status == s)
    }
}

/// The port trait for prescriptions and inventory
#[async_trait]
pub trait PharmacyPort: DomainPort {
    async fn create_prescription(&self, prescription: Prescription) -> Result<Prescription, PortError>;

    async fn get_prescription(&self, id: PrescriptionId) -> Result<Prescription, PortError>;

    /// Lists prescriptions, newest first
    async fn find_prescriptions(&self, query: PrescriptionQuery) -> Result<Vec<Prescription>, PortError>;

    /// Lists the fill records of a prescription, oldest first
    async fn list_fills(&self, id: PrescriptionId) -> Result<Vec<PrescriptionFill>, PortError>;

    /// Executes a dispense all-or-nothing
    ///
    /// Implementations lock the prescription, then the inventory rows in
    /// ascending id order, apply [`DispenseCommand::plan_prescription`] and
    /// [`DispenseCommand::withdraw_line`] to the locked values, and commit
    /// only if every step succeeded.
    async fn dispense(&self, command: DispenseCommand) -> Result<DispenseOutcome, PharmacyError>;

    /// Creates an item; a taken SKU is `PortError::Conflict`
    async fn create_item(&self, item: InventoryItem) -> Result<InventoryItem, PortError>;

    async fn get_item(&self, id: InventoryItemId) -> Result<InventoryItem, PortError>;

    /// Stores a new batch, its `IN` movement and the stock increment atomically
    async fn receive_stock(
        &self,
        batch: InventoryBatch,
        movement: StockMovement,
    ) -> Result<StockReceipt, PortError>;

    /// Lists the stock movements of an item, newest first
    async fn list_movements(&self, item_id: InventoryItemId) -> Result<Vec<StockMovement>, PortError>;
}

/// Mock implementation of PharmacyPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::BatchId;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct Store {
        prescriptions: HashMap<PrescriptionId, Prescription>,
        fills: Vec<PrescriptionFill>,
        items: HashMap<InventoryItemId, InventoryItem>,
        batches: HashMap<BatchId, InventoryBatch>,
        movements: Vec<StockMovement>,
    }

    /// In-memory mock implementation of PharmacyPort
    ///
    /// Every write holds the single store lock, and a dispense works on
    /// copies that are written back only when the whole command succeeds.
    #[derive(Debug, Default, Clone)]
    pub struct MockPharmacyPort {
        store: Arc<RwLock<Store>>,
    }

    impl MockPharmacyPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seeds an item with stock already on the shelf
        pub async fn insert_item(&self, item: InventoryItem) {
            self.store.write().await.items.insert(item.id, item);
        }

        pub async fn insert_batch(&self, batch: InventoryBatch) {
            self.store.write().await.batches.insert(batch.id, batch);
        }

        pub async fn fill_count(&self) -> usize {
            self.store.read().await.fills.len()
        }
    }

    impl DomainPort for MockPharmacyPort {}

    #[async_trait]
    impl PharmacyPort for MockPharmacyPort {
        async fn create_prescription(&self, prescription: Prescription) -> Result<Prescription, PortError> {
            self.store
                .write()
                .await
                .prescriptions
                .insert(prescription.id, prescription.clone());
            Ok(prescription)
        }

        async fn get_prescription(&self, id: PrescriptionId) -> Result<Prescription, PortError> {
            self.store
                .read()
                .await
                .prescriptions
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Prescription", id))
        }

        async fn find_prescriptions(&self, query: PrescriptionQuery) -> Result<Vec<Prescription>, PortError> {
            let store = self.store.read().await;
            let mut results: Vec<_> = store
                .prescriptions
                .values()
                .filter(|p| query.matches(p))
                .cloned()
                .collect();
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(results)
        }

        async fn list_fills(&self, id: PrescriptionId) -> Result<Vec<PrescriptionFill>, PortError> {
            let store = self.store.read().await;
            Ok(store
                .fills
                .iter()
                .filter(|f| f.prescription_id == id)
                .cloned()
                .collect())
        }

        async fn dispense(&self, command: DispenseCommand) -> Result<DispenseOutcome, PharmacyError> {
            let mut store = self.store.write().await;

            let current = store
                .prescriptions
                .get(&command.prescription_id)
                .ok_or_else(|| PharmacyError::PrescriptionNotFound(command.prescription_id.to_string()))?;
            let prescription = command.plan_prescription(current)?;

            let mut items: HashMap<InventoryItemId, InventoryItem> = HashMap::new();
            let mut batches: HashMap<BatchId, InventoryBatch> = HashMap::new();
            let mut movements = Vec::with_capacity(command.items.len());
            for line in &command.items {
                if !items.contains_key(&line.item_id) {
                    let item = store
                        .items
                        .get(&line.item_id)
                        .cloned()
                        .ok_or_else(|| PharmacyError::ItemNotFound(line.item_id.to_string()))?;
                    items.insert(line.item_id, item);
                }
                if let Some(batch_id) = line.batch_id {
                    if !batches.contains_key(&batch_id) {
                        let batch = store
                            .batches
                            .get(&batch_id)
                            .cloned()
                            .ok_or_else(|| PharmacyError::BatchNotFound(batch_id.to_string()))?;
                        batches.insert(batch_id, batch);
                    }
                }
                let item = items
                    .get_mut(&line.item_id)
                    .ok_or_else(|| PharmacyError::ItemNotFound(line.item_id.to_string()))?;
                let batch = line.batch_id.and_then(|id| batches.get_mut(&id));
                movements.push(command.withdraw_line(line, item, batch)?);
            }

            let fill = command.fill_record();
            store.prescriptions.insert(prescription.id, prescription.clone());
            store.fills.push(fill.clone());
            store.items.extend(items);
            store.batches.extend(batches);
            store.movements.extend(movements.iter().cloned());

            Ok(DispenseOutcome {
                prescription,
                fill,
                movements,
            })
        }

        async fn create_item(&self, item: InventoryItem) -> Result<InventoryItem, PortError> {
            let mut store = self.store.write().await;
            if store.items.values().any(|i| i.sku == item.sku) {
                return Err(PortError::conflict(format!("SKU {} already exists", item.sku)));
            }
            store.items.insert(item.id, item.clone());
            Ok(item)
        }

        async fn get_item(&self, id: InventoryItemId) -> Result<InventoryItem, PortError> {
            self.store
                .read()
                .await
                .items
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("InventoryItem", id))
        }

        async fn receive_stock(
            &self,
            batch: InventoryBatch,
            movement: StockMovement,
        ) -> Result<StockReceipt, PortError> {
            let mut store = self.store.write().await;
            let item = store
                .items
                .get_mut(&batch.item_id)
                .ok_or_else(|| PortError::not_found("InventoryItem", batch.item_id))?;
            item.current_stock = item
                .current_stock
                .checked_add(batch.remaining_quantity)
                .ok_or_else(|| PortError::validation_field("Stock level overflow", "quantity"))?;
            item.updated_at = movement.created_at;
            let item = item.clone();
            store.batches.insert(batch.id, batch.clone());
            store.movements.push(movement.clone());
            Ok(StockReceipt { item, batch, movement })
        }

        async fn list_movements(&self, item_id: InventoryItemId) -> Result<Vec<StockMovement>, PortError> {
            let store = self.store.read().await;
            let mut results: Vec<_> = store
                .movements
                .iter()
                .filter(|m| m.item_id == item_id)
                .cloned()
                .collect();
            results.reverse();
            Ok(results)
        }
    }
}
