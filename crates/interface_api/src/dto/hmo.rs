//! HMO catalogue and coverage DTOs

use serde::Deserialize;

use core_kernel::{HmoProviderId, PatientId, ServiceCodeId};
use domain_hmo::TariffQuery;

/// `GET /api/hmo/providers?active_only=`
#[derive(Debug, Default, Deserialize)]
pub struct ProviderListParams {
    #[serde(default)]
    pub active_only: bool,
}

/// `GET /api/hmo/tariffs?hmo_provider_id=&service_code_id=`
#[derive(Debug, Default, Deserialize)]
pub struct TariffListParams {
    pub hmo_provider_id: Option<HmoProviderId>,
    pub service_code_id: Option<ServiceCodeId>,
}

impl From<TariffListParams> for TariffQuery {
    fn from(params: TariffListParams) -> Self {
        TariffQuery {
            hmo_provider_id: params.hmo_provider_id,
            service_code_id: params.service_code_id,
            effective_on: None,
        }
    }
}

/// `POST /api/hmo/check-coverage`
#[derive(Debug, Deserialize)]
pub struct CheckCoverageRequest {
    pub patient_id: PatientId,
    pub service_code_id: ServiceCodeId,
}
