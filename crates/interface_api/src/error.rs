//! API error handling
//!
//! Every domain error converts into [`ApiError`], so handlers propagate
//! with `?`. Responses carry a single `{"error": "<message>"}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::{AccessDenied, PortError};
use domain_claims::ClaimError;
use domain_hmo::HmoError;
use domain_patient::PatientError;
use domain_pharmacy::PharmacyError;
use domain_referral::ReferralError;

use crate::auth::AuthError;

/// Message returned in place of internal errors in production
pub const REDACTED_MESSAGE: &str = "Internal server error";

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(message) = &self {
            error!(error = %message, "Request failed with an internal error");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Validation { message, .. } => ApiError::BadRequest(message),
            PortError::Conflict { message } => ApiError::Conflict(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing => ApiError::Internal(err.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(format!("Validation failed: {}", err))
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::PatientNotFound(_) => ApiError::NotFound(err.to_string()),
            PatientError::InvalidData(_) => ApiError::BadRequest(err.to_string()),
            PatientError::AccessDenied(denied) => denied.into(),
            PatientError::Port(port) => port.into(),
        }
    }
}

impl From<HmoError> for ApiError {
    fn from(err: HmoError) -> Self {
        match err {
            HmoError::ProviderNotFound(_)
            | HmoError::PackageNotFound(_)
            | HmoError::ServiceCodeNotFound(_)
            | HmoError::PatientNotFound(_) => ApiError::NotFound(err.to_string()),
            HmoError::DuplicateCode(_) | HmoError::OverlappingTariff(_) => ApiError::Conflict(err.to_string()),
            HmoError::InactiveProvider(_) | HmoError::InvalidData(_) => ApiError::BadRequest(err.to_string()),
            HmoError::AccessDenied(denied) => denied.into(),
            HmoError::Port(port) => port.into(),
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::ClaimNotFound(_)
            | ClaimError::PatientNotFound(_)
            | ClaimError::ProviderNotFound(_) => ApiError::NotFound(err.to_string()),
            ClaimError::InvalidStatusTransition { .. }
            | ClaimError::InvalidClaim(_)
            | ClaimError::InactiveProvider(_) => ApiError::BadRequest(err.to_string()),
            ClaimError::NotOwner(_) => ApiError::Forbidden(err.to_string()),
            ClaimError::AccessDenied(denied) => denied.into(),
            ClaimError::Port(port) => port.into(),
        }
    }
}

impl From<PharmacyError> for ApiError {
    fn from(err: PharmacyError) -> Self {
        match err {
            PharmacyError::PrescriptionNotFound(_)
            | PharmacyError::ItemNotFound(_)
            | PharmacyError::BatchNotFound(_) => ApiError::NotFound(err.to_string()),
            PharmacyError::InvalidState { .. }
            | PharmacyError::RefillsExhausted(_)
            | PharmacyError::InsufficientStock { .. }
            | PharmacyError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            PharmacyError::DuplicateSku(_) => ApiError::Conflict(err.to_string()),
            PharmacyError::AccessDenied(denied) => denied.into(),
            PharmacyError::Port(port) => port.into(),
        }
    }
}

impl From<ReferralError> for ApiError {
    fn from(err: ReferralError) -> Self {
        match err {
            ReferralError::ReferralNotFound(_) => ApiError::NotFound(err.to_string()),
            ReferralError::InvalidStatusTransition { .. } | ReferralError::InvalidReferral(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ReferralError::NotOwner(_) => ApiError::Forbidden(err.to_string()),
            ReferralError::AccessDenied(denied) => denied.into(),
            ReferralError::Port(port) => port.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Role;

    #[test]
    fn test_port_errors_map_to_statuses() {
        assert_eq!(ApiError::from(PortError::not_found("Patient", "1")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(PortError::conflict("dup")).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(PortError::validation("bad")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(PortError::connection("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_access_denied_is_forbidden() {
        let denied = AccessDenied {
            role: Role::Nurse,
            action: "dispense prescriptions".to_string(),
        };
        let err = ApiError::from(PharmacyError::from(denied));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "nurse is not permitted to dispense prescriptions");
    }

    #[test]
    fn test_insufficient_stock_is_bad_request() {
        let err = ApiError::from(PharmacyError::InsufficientStock {
            item: "Amoxicillin".to_string(),
            requested: 10,
            available: 3,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_claim_owner_check_is_forbidden() {
        assert_eq!(ApiError::from(ClaimError::NotOwner("CLM-1".to_string())).status(), StatusCode::FORBIDDEN);
    }
}
