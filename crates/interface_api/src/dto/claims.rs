//! Claims DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use core_kernel::{HmoProviderId, PatientId};
use domain_claims::{ClaimQuery, ClaimStatus};

/// `GET /api/claims` filters
#[derive(Debug, Default, Deserialize)]
pub struct ClaimListParams {
    pub status: Option<ClaimStatus>,
    pub patient_id: Option<PatientId>,
    pub hmo_provider_id: Option<HmoProviderId>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl From<ClaimListParams> for ClaimQuery {
    fn from(params: ClaimListParams) -> Self {
        ClaimQuery {
            status: params.status,
            patient_id: params.patient_id,
            hmo_provider_id: params.hmo_provider_id,
            from_date: params.from_date,
            to_date: params.to_date,
            created_by: None,
        }
    }
}

/// Optional override of the payable amount on approval
#[derive(Debug, Default, Deserialize)]
pub struct ApproveClaimRequest {
    pub approved_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectClaimRequest {
    #[validate(length(min = 1, max = 2000, message = "rejection_reason is required"))]
    pub rejection_reason: String,
}
