//! Stocked items, batches and the stock movement ledger

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BatchId, InventoryItemId, StockMovementId, UserId};

use crate::error::PharmacyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub name: String,
    /// Stock keeping unit, unique per item
    pub sku: String,
    /// Dispensing unit, e.g. `tablet`
    pub unit: String,
    pub current_stock: u32,
    pub reorder_level: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Takes `quantity` units off the shelf
    pub fn withdraw(&mut self, quantity: u32) -> Result<(), PharmacyError> {
        self.current_stock = self
            .current_stock
            .checked_sub(quantity)
            .ok_or_else(|| PharmacyError::InsufficientStock {
                item: self.name.clone(),
                requested: quantity,
                available: self.current_stock,
            })?;
        Ok(())
    }

    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryBatch {
    pub id: BatchId,
    pub item_id: InventoryItemId,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub remaining_quantity: u32,
    pub received_at: DateTime<Utc>,
}

impl InventoryBatch {
    pub fn withdraw(&mut self, quantity: u32) -> Result<(), PharmacyError> {
        self.remaining_quantity = self
            .remaining_quantity
            .checked_sub(quantity)
            .ok_or_else(|| PharmacyError::InsufficientStock {
                item: format!("batch {}", self.batch_number),
                requested: quantity,
                available: self.remaining_quantity,
            })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }
}

impl std::str::FromStr for MovementType {
    type Err = PharmacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            other => Err(PharmacyError::invalid(format!("Unknown movement type: {}", other))),
        }
    }
}

/// Append-only record of stock entering or leaving the pharmacy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub item_id: InventoryItemId,
    pub batch_id: Option<BatchId>,
    pub movement_type: MovementType,
    pub quantity: u32,
    /// What caused the movement, e.g. `prescription` or `receipt`
    pub reference_type: String,
    pub reference_id: Option<String>,
    pub performed_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub sku: String,
    pub unit: String,
    #[serde(default)]
    pub reorder_level: u32,
}

impl NewInventoryItem {
    pub fn into_item(self) -> Result<InventoryItem, PharmacyError> {
        let name = self.name.trim().to_string();
        let sku = self.sku.trim().to_string();
        if name.is_empty() || sku.is_empty() {
            return Err(PharmacyError::invalid("Item name and SKU are required"));
        }
        let now = Utc::now();
        Ok(InventoryItem {
            id: InventoryItemId::new_v7(),
            name,
            sku,
            unit: self.unit.trim().to_string(),
            current_stock: 0,
            reorder_level: self.reorder_level,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A delivery of stock into a new batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: u32,
}

impl ReceiveStock {
    /// Builds the batch and `IN` movement for this delivery
    pub fn into_receipt(
        self,
        item_id: InventoryItemId,
        performed_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<(InventoryBatch, StockMovement), PharmacyError> {
        if self.quantity == 0 {
            return Err(PharmacyError::invalid("Received quantity must be at least 1"));
        }
        let batch_number = self.batch_number.trim().to_string();
        if batch_number.is_empty() {
            return Err(PharmacyError::invalid("Batch number is required"));
        }
        let batch = InventoryBatch {
            id: BatchId::new_v7(),
            item_id,
            batch_number,
            expiry_date: self.expiry_date,
            remaining_quantity: self.quantity,
            received_at: at,
        };
        let movement = StockMovement {
            id: StockMovementId::new_v7(),
            item_id,
            batch_id: Some(batch.id),
            movement_type: MovementType::In,
            quantity: self.quantity,
            reference_type: "receipt".to_string(),
            reference_id: Some(batch.batch_number.clone()),
            performed_by,
            created_at: at,
        };
        Ok((batch, movement))
    }
}

/// Result of receiving stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReceipt {
    pub item: InventoryItem,
    pub batch: InventoryBatch,
    pub movement: StockMovement,
}
