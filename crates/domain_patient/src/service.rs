//! Patient registration service

use std::sync::Arc;

use tracing::{info, instrument};

use core_kernel::{PatientId, Principal, Role, Timezone};

use crate::error::PatientError;
use crate::patient::{Patient, RegisterPatient};
use crate::ports::{PatientPort, PatientQuery};

/// Roles allowed to register patients
const REGISTRATION_ROLES: &[Role] = &[Role::Receptionist, Role::Nurse, Role::Doctor];

/// Default page size for patient searches
const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Application service for patient registration and lookup
#[derive(Clone)]
pub struct PatientService {
    patients: Arc<dyn PatientPort>,
    timezone: Timezone,
}

impl PatientService {
    pub fn new(patients: Arc<dyn PatientPort>, timezone: Timezone) -> Self {
        Self { patients, timezone }
    }

    /// Registers a new patient and assigns an MRN
    #[instrument(skip(self, request), fields(user = %principal.id))]
    pub async fn register(
        &self,
        principal: &Principal,
        request: RegisterPatient,
    ) -> Result<Patient, PatientError> {
        principal.require_any(REGISTRATION_ROLES, "register patients")?;
        request.check(self.timezone.today())?;

        let patient = self
            .patients
            .create_patient(Patient::register(request, principal.id))
            .await?;

        info!(patient_id = %patient.id, mrn = %patient.mrn, "Patient registered");
        Ok(patient)
    }

    /// Loads a single patient
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn get(&self, principal: &Principal, id: PatientId) -> Result<Patient, PatientError> {
        self.patients.get_patient(id).await.map_err(|e| {
            if e.is_not_found() {
                PatientError::not_found(id)
            } else {
                e.into()
            }
        })
    }

    /// Searches patients by name or MRN fragment
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn search(
        &self,
        principal: &Principal,
        term: Option<String>,
    ) -> Result<Vec<Patient>, PatientError> {
        let query = PatientQuery {
            search: term.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            limit: Some(DEFAULT_SEARCH_LIMIT),
            offset: None,
        };
        Ok(self.patients.find_patients(query).await?)
    }
}
