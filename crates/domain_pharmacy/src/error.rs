//! Pharmacy domain errors

use thiserror::Error;

use core_kernel::{AccessDenied, PortError};

/// Errors that can occur in the pharmacy domain
#[derive(Debug, Error)]
pub enum PharmacyError {
    #[error("Prescription not found: {0}")]
    PrescriptionNotFound(String),

    #[error("Inventory item not found: {0}")]
    ItemNotFound(String),

    #[error("Inventory batch not found: {0}")]
    BatchNotFound(String),

    /// The prescription's status does not allow the requested dispense
    #[error("Cannot {action} a prescription that is {status}")]
    InvalidState { action: String, status: String },

    #[error("No refills remaining on prescription {0}")]
    RefillsExhausted(String),

    #[error("Insufficient stock for {item}: requested {requested}, available {available}")]
    InsufficientStock {
        item: String,
        requested: u32,
        available: u32,
    },

    #[error("Duplicate SKU: {0}")]
    DuplicateSku(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl PharmacyError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PharmacyError::InvalidRequest(message.into())
    }
}
