//! HMO domain errors

use thiserror::Error;

use core_kernel::{AccessDenied, PortError};

/// Errors that can occur in the HMO domain
#[derive(Debug, Error)]
pub enum HmoError {
    /// Provider with the given ID was not found
    #[error("HMO provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Service package not found: {0}")]
    PackageNotFound(String),

    #[error("Service code not found: {0}")]
    ServiceCodeNotFound(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// A provider or package code is already in use
    #[error("Duplicate code: {0}")]
    DuplicateCode(String),

    /// A tariff's date range overlaps an existing tariff for the same pair
    #[error("Tariff overlaps an existing tariff effective {0}")]
    OverlappingTariff(String),

    /// The provider exists but has been deactivated
    #[error("HMO provider is inactive: {0}")]
    InactiveProvider(String),

    /// Invalid data provided
    #[error("Invalid HMO data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl HmoError {
    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        HmoError::InvalidData(message.into())
    }
}
