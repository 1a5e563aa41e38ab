//! Patient domain errors

use thiserror::Error;

use core_kernel::{AccessDenied, PortError};

/// Errors that can occur in the patient domain
#[derive(Debug, Error)]
pub enum PatientError {
    /// Patient with the given ID was not found
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// Invalid patient data provided
    #[error("Invalid patient data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl PatientError {
    /// Creates a PatientNotFound error from any ID type
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        PatientError::PatientNotFound(id.to_string())
    }

    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        PatientError::InvalidData(message.into())
    }
}
