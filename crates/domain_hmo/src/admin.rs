//! Catalogue administration and patient enrollment

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{
    HmoProviderId, PatientId, PortError, Principal, Role, ServicePackageId,
};
use domain_patient::{HmoEnrollment, Patient, PatientPort};

use crate::error::HmoError;
use crate::package::{NewServicePackage, ServicePackage};
use crate::ports::{HmoPort, TariffQuery};
use crate::provider::{HmoProvider, HmoProviderUpdate, NewHmoProvider};
use crate::service_code::{NewServiceCode, NhisServiceCode};
use crate::tariff::{HmoTariff, NewTariff};

const CATALOGUE_ROLES: &[Role] = &[Role::Admin];
const ENROLLMENT_ROLES: &[Role] = &[Role::Admin, Role::Receptionist];

/// Request to link a patient to an HMO; all fields empty clears the linkage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollPatient {
    pub hmo_provider_id: Option<HmoProviderId>,
    pub hmo_package_id: Option<ServicePackageId>,
    pub policy_start_date: Option<NaiveDate>,
    pub policy_end_date: Option<NaiveDate>,
    pub nhis_number: Option<String>,
}

impl From<EnrollPatient> for HmoEnrollment {
    fn from(request: EnrollPatient) -> Self {
        HmoEnrollment {
            hmo_provider_id: request.hmo_provider_id,
            hmo_package_id: request.hmo_package_id,
            policy_start_date: request.policy_start_date,
            policy_end_date: request.policy_end_date,
            nhis_number: request
                .nhis_number
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }
}

fn duplicate_or(e: PortError) -> HmoError {
    match e {
        PortError::Conflict { message } => HmoError::DuplicateCode(message),
        other => other.into(),
    }
}

/// Application service for the HMO catalogue
#[derive(Clone)]
pub struct HmoAdminService {
    hmo: Arc<dyn HmoPort>,
    patients: Arc<dyn PatientPort>,
}

impl HmoAdminService {
    pub fn new(hmo: Arc<dyn HmoPort>, patients: Arc<dyn PatientPort>) -> Self {
        Self { hmo, patients }
    }

    async fn provider(&self, id: HmoProviderId) -> Result<HmoProvider, HmoError> {
        self.hmo.get_provider(id).await.map_err(|e| {
            if e.is_not_found() {
                HmoError::ProviderNotFound(id.to_string())
            } else {
                e.into()
            }
        })
    }

    // ========================================================================
    // Providers
    // ========================================================================

    #[instrument(skip(self, request), fields(user = %principal.id, code = %request.code))]
    pub async fn create_provider(
        &self,
        principal: &Principal,
        request: NewHmoProvider,
    ) -> Result<HmoProvider, HmoError> {
        principal.require_any(CATALOGUE_ROLES, "manage HMO providers")?;
        let provider = self
            .hmo
            .create_provider(request.into_provider()?)
            .await
            .map_err(duplicate_or)?;
        info!(provider_id = %provider.id, code = %provider.code, "HMO provider created");
        Ok(provider)
    }

    #[instrument(skip(self, update), fields(user = %principal.id))]
    pub async fn update_provider(
        &self,
        principal: &Principal,
        id: HmoProviderId,
        update: HmoProviderUpdate,
    ) -> Result<HmoProvider, HmoError> {
        principal.require_any(CATALOGUE_ROLES, "manage HMO providers")?;
        let mut provider = self.provider(id).await?;
        provider.apply(update)?;
        Ok(self.hmo.update_provider(provider).await?)
    }

    /// Soft-deletes a provider; claim history keeps referencing it
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn deactivate_provider(
        &self,
        principal: &Principal,
        id: HmoProviderId,
    ) -> Result<HmoProvider, HmoError> {
        principal.require_any(CATALOGUE_ROLES, "manage HMO providers")?;
        let mut provider = self.provider(id).await?;
        provider.apply(HmoProviderUpdate {
            is_active: Some(false),
            ..Default::default()
        })?;
        let provider = self.hmo.update_provider(provider).await?;
        info!(provider_id = %provider.id, "HMO provider deactivated");
        Ok(provider)
    }

    pub async fn get_provider(
        &self,
        _principal: &Principal,
        id: HmoProviderId,
    ) -> Result<HmoProvider, HmoError> {
        self.provider(id).await
    }

    pub async fn list_providers(
        &self,
        _principal: &Principal,
        active_only: bool,
    ) -> Result<Vec<HmoProvider>, HmoError> {
        Ok(self.hmo.list_providers(active_only).await?)
    }

    // ========================================================================
    // Packages
    // ========================================================================

    #[instrument(skip(self, request), fields(user = %principal.id, code = %request.code))]
    pub async fn create_package(
        &self,
        principal: &Principal,
        provider_id: HmoProviderId,
        request: NewServicePackage,
    ) -> Result<ServicePackage, HmoError> {
        principal.require_any(CATALOGUE_ROLES, "manage service packages")?;
        self.provider(provider_id).await?;
        let package = self
            .hmo
            .create_package(request.into_package(provider_id)?)
            .await
            .map_err(duplicate_or)?;
        info!(package_id = %package.id, provider_id = %provider_id, "Service package created");
        Ok(package)
    }

    pub async fn list_packages(
        &self,
        _principal: &Principal,
        provider_id: HmoProviderId,
    ) -> Result<Vec<ServicePackage>, HmoError> {
        self.provider(provider_id).await?;
        Ok(self.hmo.list_packages(provider_id).await?)
    }

    // ========================================================================
    // NHIS service codes
    // ========================================================================

    #[instrument(skip(self, request), fields(user = %principal.id, code = %request.code))]
    pub async fn create_service_code(
        &self,
        principal: &Principal,
        request: NewServiceCode,
    ) -> Result<NhisServiceCode, HmoError> {
        principal.require_any(CATALOGUE_ROLES, "manage service codes")?;
        Ok(self
            .hmo
            .create_service_code(request.into_service_code()?)
            .await
            .map_err(duplicate_or)?)
    }

    pub async fn list_service_codes(&self, _principal: &Principal) -> Result<Vec<NhisServiceCode>, HmoError> {
        Ok(self.hmo.list_service_codes().await?)
    }

    // ========================================================================
    // Tariffs
    // ========================================================================

    /// Adds a tariff, refusing ranges that overlap an existing tariff for the pair
    #[instrument(skip(self, request), fields(user = %principal.id))]
    pub async fn create_tariff(
        &self,
        principal: &Principal,
        request: NewTariff,
    ) -> Result<HmoTariff, HmoError> {
        principal.require_any(CATALOGUE_ROLES, "manage tariffs")?;
        let tariff = request.into_tariff()?;
        self.provider(tariff.hmo_provider_id).await?;
        self.hmo.get_service_code(tariff.service_code_id).await.map_err(|e| {
            if e.is_not_found() {
                HmoError::ServiceCodeNotFound(tariff.service_code_id.to_string())
            } else {
                e.into()
            }
        })?;

        let existing = self
            .hmo
            .find_tariffs(TariffQuery::for_pair(tariff.hmo_provider_id, tariff.service_code_id))
            .await?;
        if let Some(clash) = existing
            .iter()
            .find(|t| t.effective_range().overlaps(&tariff.effective_range()))
        {
            warn!(existing = %clash.id, "Refusing overlapping tariff");
            return Err(HmoError::OverlappingTariff(describe_range(clash)));
        }

        let tariff = self.hmo.create_tariff(tariff).await.map_err(|e| match e {
            PortError::Conflict { message } => HmoError::OverlappingTariff(message),
            other => other.into(),
        })?;
        info!(tariff_id = %tariff.id, "Tariff created");
        Ok(tariff)
    }

    pub async fn list_tariffs(
        &self,
        _principal: &Principal,
        query: TariffQuery,
    ) -> Result<Vec<HmoTariff>, HmoError> {
        Ok(self.hmo.find_tariffs(query).await?)
    }

    // ========================================================================
    // Enrollment
    // ========================================================================

    /// Links a patient to a provider and package, or clears the linkage
    #[instrument(skip(self, request), fields(user = %principal.id))]
    pub async fn enroll_patient(
        &self,
        principal: &Principal,
        patient_id: PatientId,
        request: EnrollPatient,
    ) -> Result<Patient, HmoError> {
        principal.require_any(ENROLLMENT_ROLES, "enroll patients")?;
        let enrollment = HmoEnrollment::from(request);
        enrollment
            .validate()
            .map_err(|e| HmoError::invalid(e.to_string()))?;

        if let Some(provider_id) = enrollment.hmo_provider_id {
            let provider = self.provider(provider_id).await?;
            if !provider.is_active {
                return Err(HmoError::InactiveProvider(provider.name));
            }
            if let Some(package_id) = enrollment.hmo_package_id {
                let package = self.hmo.get_package(package_id).await.map_err(|e| {
                    if e.is_not_found() {
                        HmoError::PackageNotFound(package_id.to_string())
                    } else {
                        e.into()
                    }
                })?;
                if package.hmo_provider_id != provider_id {
                    return Err(HmoError::invalid(format!(
                        "Package {} does not belong to provider {}",
                        package.code, provider.code
                    )));
                }
            }
        }

        let patient = self
            .patients
            .update_enrollment(patient_id, enrollment)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    HmoError::PatientNotFound(patient_id.to_string())
                } else {
                    e.into()
                }
            })?;
        info!(patient_id = %patient.id, enrolled = patient.enrollment.is_enrolled(), "Patient HMO enrollment updated");
        Ok(patient)
    }
}

fn describe_range(tariff: &HmoTariff) -> String {
    match tariff.effective_to {
        Some(to) => format!("{} to {}", tariff.effective_from, to),
        None => format!("from {}", tariff.effective_from),
    }
}
