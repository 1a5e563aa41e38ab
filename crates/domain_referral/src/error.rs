//! Referral domain errors

use thiserror::Error;

use core_kernel::{AccessDenied, PortError};

#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("Referral not found: {0}")]
    ReferralNotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Invalid referral: {0}")]
    InvalidReferral(String),

    /// The caller may not see another doctor's referral
    #[error("Not permitted to access referral {0}")]
    NotOwner(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl ReferralError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ReferralError::InvalidReferral(message.into())
    }
}
