//! Coverage and eligibility resolution
//!
//! Both operations are pure reads. "Today" is the hospital's local date,
//! taken from the configured [`Timezone`].

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use core_kernel::{Money, PatientId, Principal, ServiceCodeId, TariffId, Timezone};
use domain_patient::{HmoEnrollment, Patient, PatientPort};

use crate::error::HmoError;
use crate::package::{PackageVerdict, ServicePackage};
use crate::ports::{HmoPort, TariffQuery};
use crate::provider::HmoProvider;
use crate::tariff::select_effective;

/// Where a patient's policy stands on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    NotEnrolled,
    NotActive,
    Expired,
    Active,
}

impl PolicyStatus {
    /// Classifies an enrollment against `today`
    ///
    /// Both policy dates are inclusive: a policy ending today is still active.
    pub fn of(enrollment: &HmoEnrollment, today: NaiveDate) -> Self {
        if !enrollment.is_enrolled() {
            return PolicyStatus::NotEnrolled;
        }
        if enrollment.policy_start_date.map_or(false, |start| start > today) {
            return PolicyStatus::NotActive;
        }
        if enrollment.policy_end_date.map_or(false, |end| end < today) {
            return PolicyStatus::Expired;
        }
        PolicyStatus::Active
    }
}

/// Answer to "is this service covered for this patient?"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageDecision {
    pub covered: bool,
    /// Why the service is not covered
    pub reason: Option<String>,
    pub tariff_id: Option<TariffId>,
    pub tariff_amount: Option<Money>,
    pub copay_amount: Option<Money>,
    pub copay_percentage: Option<Decimal>,
    /// The patient's out-of-pocket share for one unit
    pub patient_pays: Option<Money>,
}

impl CoverageDecision {
    fn not_covered(reason: impl Into<String>) -> Self {
        Self {
            covered: false,
            reason: Some(reason.into()),
            tariff_id: None,
            tariff_amount: None,
            copay_amount: None,
            copay_percentage: None,
            patient_pays: None,
        }
    }
}

/// A patient's eligibility for HMO billing today
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub is_eligible: bool,
    pub hmo_provider: Option<HmoProvider>,
    pub package: Option<ServicePackage>,
    pub policy_status: PolicyStatus,
    /// The package's annual limit; utilisation is not deducted
    pub coverage_remaining: Option<Money>,
    pub message: String,
}

/// Resolves coverage and eligibility for patients
#[derive(Clone)]
pub struct CoverageResolver {
    patients: Arc<dyn PatientPort>,
    hmo: Arc<dyn HmoPort>,
    timezone: Timezone,
}

impl CoverageResolver {
    pub fn new(patients: Arc<dyn PatientPort>, hmo: Arc<dyn HmoPort>, timezone: Timezone) -> Self {
        Self { patients, hmo, timezone }
    }

    async fn load_patient(&self, id: PatientId) -> Result<Patient, HmoError> {
        self.patients.get_patient(id).await.map_err(|e| {
            if e.is_not_found() {
                HmoError::PatientNotFound(id.to_string())
            } else {
                e.into()
            }
        })
    }

    /// Looks up a row the patient references, treating a dangling reference as absent
    async fn optional<T>(
        lookup: impl std::future::Future<Output = Result<T, core_kernel::PortError>>,
    ) -> Result<Option<T>, HmoError> {
        match lookup.await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Decides whether `service_code_id` is covered for the patient today
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn check_coverage(
        &self,
        principal: &Principal,
        patient_id: PatientId,
        service_code_id: ServiceCodeId,
    ) -> Result<CoverageDecision, HmoError> {
        let patient = self.load_patient(patient_id).await?;
        let provider_id = match patient.enrollment.hmo_provider_id {
            Some(id) => id,
            None => {
                return Ok(CoverageDecision::not_covered(
                    "Patient is not enrolled with an HMO",
                ))
            }
        };

        let today = self.timezone.today();
        let tariffs = self
            .hmo
            .find_tariffs(TariffQuery::for_pair(provider_id, service_code_id).on(today))
            .await?;
        let tariff = match select_effective(&tariffs, today) {
            Some(t) => t.clone(),
            None => {
                return Ok(CoverageDecision::not_covered(
                    "No active tariff for this service under the patient's HMO",
                ))
            }
        };

        if let Some(package_id) = patient.enrollment.hmo_package_id {
            if let Some(package) = Self::optional(self.hmo.get_package(package_id)).await? {
                let code = self.hmo.get_service_code(service_code_id).await.map_err(|e| {
                    if e.is_not_found() {
                        HmoError::ServiceCodeNotFound(service_code_id.to_string())
                    } else {
                        e.into()
                    }
                })?;
                if package.covers(&code.code) != PackageVerdict::Covered {
                    debug!(package = %package.code, service = %code.code, "Service excluded by package");
                    return Ok(CoverageDecision::not_covered(format!(
                        "Service {} is excluded by package {}",
                        code.code, package.name
                    )));
                }
            }
        }

        Ok(CoverageDecision {
            covered: true,
            reason: None,
            tariff_id: Some(tariff.id),
            tariff_amount: Some(tariff.tariff_amount),
            copay_amount: tariff.copay_amount,
            copay_percentage: tariff.copay_percentage,
            patient_pays: Some(tariff.patient_pays()),
        })
    }

    /// Reports whether the patient's policy is in force today
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn check_eligibility(
        &self,
        principal: &Principal,
        patient_id: PatientId,
    ) -> Result<EligibilityReport, HmoError> {
        let patient = self.load_patient(patient_id).await?;
        let enrollment = &patient.enrollment;

        let provider = match enrollment.hmo_provider_id {
            Some(id) => Self::optional(self.hmo.get_provider(id)).await?,
            None => None,
        };
        let provider = match provider {
            Some(p) => p,
            None => {
                return Ok(EligibilityReport {
                    is_eligible: false,
                    hmo_provider: None,
                    package: None,
                    policy_status: PolicyStatus::NotEnrolled,
                    coverage_remaining: None,
                    message: "Patient is not enrolled with an HMO".to_string(),
                })
            }
        };
        let package = match enrollment.hmo_package_id {
            Some(id) => Self::optional(self.hmo.get_package(id)).await?,
            None => None,
        };

        let policy_status = PolicyStatus::of(enrollment, self.timezone.today());
        let package_active = package.as_ref().map_or(true, |p| p.is_active);
        let is_eligible = policy_status == PolicyStatus::Active && provider.is_active && package_active;

        let message = match policy_status {
            PolicyStatus::NotEnrolled => "Patient is not enrolled with an HMO".to_string(),
            PolicyStatus::NotActive => format!(
                "Policy is not yet active; it starts on {}",
                enrollment.policy_start_date.map(|d| d.to_string()).unwrap_or_default()
            ),
            PolicyStatus::Expired => format!(
                "Policy expired on {}",
                enrollment.policy_end_date.map(|d| d.to_string()).unwrap_or_default()
            ),
            PolicyStatus::Active if !provider.is_active => {
                format!("HMO provider {} is inactive", provider.name)
            }
            PolicyStatus::Active if !package_active => "Service package is inactive".to_string(),
            PolicyStatus::Active => "Patient is eligible for HMO coverage".to_string(),
        };

        Ok(EligibilityReport {
            is_eligible,
            coverage_remaining: package.as_ref().and_then(|p| p.annual_limit),
            hmo_provider: Some(provider),
            package,
            policy_status,
            message,
        })
    }
}
