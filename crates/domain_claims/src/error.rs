//! Claims domain errors

use thiserror::Error;

use core_kernel::{AccessDenied, PortError};

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Claim not found: {0}")]
    ClaimNotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Invalid claim: {0}")]
    InvalidClaim(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("HMO provider not found: {0}")]
    ProviderNotFound(String),

    #[error("HMO provider is inactive: {0}")]
    InactiveProvider(String),

    /// The caller may not see or act on another user's claim
    #[error("Not permitted to access claim {0}")]
    NotOwner(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl ClaimError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ClaimError::InvalidClaim(message.into())
    }
}
