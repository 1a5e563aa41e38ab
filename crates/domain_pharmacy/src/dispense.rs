//! Dispense requests, fill records and the stock plan they imply

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BatchId, FillId, InventoryItemId, PrescriptionId, StockMovementId, UserId};

use crate::error::PharmacyError;
use crate::inventory::{InventoryBatch, InventoryItem, MovementType, StockMovement};
use crate::prescription::Prescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispenseType {
    #[default]
    Fill,
    Partial,
    Refill,
}

impl DispenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispenseType::Fill => "fill",
            DispenseType::Partial => "partial",
            DispenseType::Refill => "refill",
        }
    }
}

impl std::str::FromStr for DispenseType {
    type Err = PharmacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fill" => Ok(DispenseType::Fill),
            "partial" => Ok(DispenseType::Partial),
            "refill" => Ok(DispenseType::Refill),
            other => Err(PharmacyError::invalid(format!("Unknown dispense type: {}", other))),
        }
    }
}

/// One stock line handed over the counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseItem {
    pub item_id: InventoryItemId,
    pub quantity: u32,
    pub batch_id: Option<BatchId>,
}

/// A dispense as requested by the pharmacist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseRequest {
    #[serde(rename = "type", default)]
    pub dispense_type: DispenseType,
    #[serde(default)]
    pub items: Vec<DispenseItem>,
    pub notes: Option<String>,
}

impl DispenseRequest {
    pub fn validate(&self) -> Result<(), PharmacyError> {
        if let Some(line) = self.items.iter().find(|i| i.quantity == 0) {
            return Err(PharmacyError::invalid(format!(
                "Quantity for item {} must be at least 1",
                line.item_id
            )));
        }
        Ok(())
    }
}

/// Everything an adapter needs to execute a dispense atomically
#[derive(Debug, Clone)]
pub struct DispenseCommand {
    pub prescription_id: PrescriptionId,
    pub dispense_type: DispenseType,
    pub items: Vec<DispenseItem>,
    pub notes: Option<String>,
    pub dispensed_by: UserId,
    pub at: DateTime<Utc>,
}

impl DispenseCommand {
    pub fn new(prescription_id: PrescriptionId, request: DispenseRequest, dispensed_by: UserId) -> Self {
        Self {
            prescription_id,
            dispense_type: request.dispense_type,
            items: request.items,
            notes: request.notes,
            dispensed_by,
            at: Utc::now(),
        }
    }

    /// Applies the state machine to the locked prescription
    pub fn plan_prescription(&self, current: &Prescription) -> Result<Prescription, PharmacyError> {
        current.plan_dispense(self.dispense_type, self.dispensed_by, self.notes.clone(), self.at)
    }

    /// Builds the audit record for this dispense
    pub fn fill_record(&self) -> PrescriptionFill {
        PrescriptionFill {
            id: FillId::new_v7(),
            prescription_id: self.prescription_id,
            fill_type: self.dispense_type,
            items: self.items.clone(),
            dispensed_by: self.dispensed_by,
            notes: self.notes.clone(),
            created_at: self.at,
        }
    }

    /// Withdraws one line from its locked item and batch rows
    ///
    /// Returns the `OUT` movement to append. The batch, when given, must
    /// belong to the item.
    pub fn withdraw_line(
        &self,
        line: &DispenseItem,
        item: &mut InventoryItem,
        batch: Option<&mut InventoryBatch>,
    ) -> Result<StockMovement, PharmacyError> {
        if line.quantity == 0 {
            return Err(PharmacyError::invalid("Dispensed quantity must be at least 1"));
        }
        item.withdraw(line.quantity)?;
        if let Some(batch) = batch {
            if batch.item_id != item.id {
                return Err(PharmacyError::invalid(format!(
                    "Batch {} does not belong to item {}",
                    batch.batch_number, item.name
                )));
            }
            batch.withdraw(line.quantity)?;
        }
        Ok(StockMovement {
            id: StockMovementId::new_v7(),
            item_id: item.id,
            batch_id: line.batch_id,
            movement_type: MovementType::Out,
            quantity: line.quantity,
            reference_type: "prescription".to_string(),
            reference_id: Some(self.prescription_id.as_uuid().to_string()),
            performed_by: self.dispensed_by,
            created_at: self.at,
        })
    }
}

/// Append-only audit record of one dispense event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionFill {
    pub id: FillId,
    pub prescription_id: PrescriptionId,
    pub fill_type: DispenseType,
    pub items: Vec<DispenseItem>,
    pub dispensed_by: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a committed dispense wrote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseOutcome {
    pub prescription: Prescription,
    pub fill: PrescriptionFill,
    pub movements: Vec<StockMovement>,
}
