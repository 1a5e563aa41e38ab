//! Pharmacy DTOs

use serde::Deserialize;

use core_kernel::PatientId;
use domain_pharmacy::{PrescriptionQuery, PrescriptionStatus};

/// `GET /api/prescriptions?patient_id=&status=`
#[derive(Debug, Default, Deserialize)]
pub struct PrescriptionListParams {
    pub patient_id: Option<PatientId>,
    pub status: Option<PrescriptionStatus>,
}

impl From<PrescriptionListParams> for PrescriptionQuery {
    fn from(params: PrescriptionListParams) -> Self {
        PrescriptionQuery {
            patient_id: params.patient_id,
            status: params.status,
        }
    }
}
