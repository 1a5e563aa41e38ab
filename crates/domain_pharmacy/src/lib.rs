//! Pharmacy Domain
//!
//! Prescriptions written by clinicians are dispensed by the pharmacy
//! against stocked inventory.
//!
//! # Prescription Lifecycle
//!
//! ```text
//! Active --fill--> Dispensed
//! Active --partial--> Active
//! Active|Dispensed --refill--> Active (refills left) | Dispensed (none left)
//! ```
//!
//! # Dispensing
//!
//! A dispense is one atomic unit: the prescription status change, the
//! append-only fill record, every stock decrement and every `OUT` stock
//! movement commit together or not at all. Adapters serialize concurrent
//! dispenses by locking the prescription and inventory rows they touch.

pub mod prescription;
pub mod dispense;
pub mod inventory;
pub mod service;
pub mod error;
pub mod ports;

pub use prescription::{Prescription, PrescriptionStatus, Medication, NewPrescription};
pub use dispense::{
    DispenseType, DispenseItem, DispenseRequest, DispenseCommand, DispenseOutcome, PrescriptionFill,
};
pub use inventory::{
    InventoryItem, InventoryBatch, StockMovement, MovementType, NewInventoryItem, ReceiveStock,
    StockReceipt,
};
pub use service::PharmacyService;
pub use error::PharmacyError;
pub use ports::{PharmacyPort, PrescriptionQuery};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockPharmacyPort;
