//! Referral DTOs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use core_kernel::PatientId;
use domain_referral::{ReferralQuery, ReferralStatus};

/// `GET /api/referrals?status=&patient_id=`
#[derive(Debug, Default, Deserialize)]
pub struct ReferralListParams {
    pub status: Option<ReferralStatus>,
    pub patient_id: Option<PatientId>,
}

impl From<ReferralListParams> for ReferralQuery {
    fn from(params: ReferralListParams) -> Self {
        ReferralQuery {
            status: params.status,
            patient_id: params.patient_id,
            referring_provider_id: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AcceptReferralRequest {
    pub appointment_date: Option<DateTime<Utc>>,
}

/// Body of the complete and cancel transitions
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReferralFeedbackRequest {
    #[validate(length(max = 4000))]
    pub feedback: Option<String>,
}
