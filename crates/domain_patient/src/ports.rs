//! Patient Domain Ports
//!
//! The `PatientPort` trait defines what the patient domain needs from its
//! datastore. The PostgreSQL adapter lives in `infra_db`; the in-memory
//! [`mock::MockPatientPort`] backs unit and API tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_patient::ports::PatientPort;
//! use std::sync::Arc;
//!
//! pub struct CoverageResolver {
//!     patients: Arc<dyn PatientPort>,
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, PatientId, PortError};

use crate::patient::{HmoEnrollment, Patient};

/// Query parameters for finding patients
#[derive(Debug, Clone, Default)]
pub struct PatientQuery {
    /// Case-insensitive substring matched against names and MRN
    pub search: Option<String>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl PatientQuery {
    /// Creates a query matching a name or MRN fragment
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Default::default()
        }
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// The port trait for patient records
#[async_trait]
pub trait PatientPort: DomainPort {
    /// Retrieves a patient by ID, or `PortError::NotFound`
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError>;

    /// Finds patients matching the query, most recently registered first
    async fn find_patients(&self, query: PatientQuery) -> Result<Vec<Patient>, PortError>;

    /// Inserts a new patient
    ///
    /// Fails with `PortError::Conflict` if the MRN is already taken.
    async fn create_patient(&self, patient: Patient) -> Result<Patient, PortError>;

    /// Replaces the patient's HMO linkage and returns the updated record
    async fn update_enrollment(
        &self,
        id: PatientId,
        enrollment: HmoEnrollment,
    ) -> Result<Patient, PortError>;
}

/// Mock implementation of PatientPort for testing
///
/// Stores patients in memory; useful for unit testing without a database.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use chrono::Utc;

    /// In-memory mock implementation of PatientPort
    #[derive(Debug, Default, Clone)]
    pub struct MockPatientPort {
        patients: Arc<RwLock<HashMap<PatientId, Patient>>>,
    }

    impl MockPatientPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with patients for testing
        pub async fn with_patients(patients: Vec<Patient>) -> Self {
            let port = Self::new();
            for patient in patients {
                port.patients.write().await.insert(patient.id, patient);
            }
            port
        }

        /// Inserts or replaces a patient directly
        pub async fn insert(&self, patient: Patient) {
            self.patients.write().await.insert(patient.id, patient);
        }
    }

    impl DomainPort for MockPatientPort {}

    #[async_trait]
    impl PatientPort for MockPatientPort {
        async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError> {
            self.patients
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Patient", id))
        }

        async fn find_patients(&self, query: PatientQuery) -> Result<Vec<Patient>, PortError> {
            let patients = self.patients.read().await;
            let mut results: Vec<_> = patients
                .values()
                .filter(|p| match query.search {
                    Some(ref term) => p.matches_search(term),
                    None => true,
                })
                .cloned()
                .collect();
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let offset = query.offset.unwrap_or(0) as usize;
            let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
            Ok(results.into_iter().skip(offset).take(limit).collect())
        }

        async fn create_patient(&self, patient: Patient) -> Result<Patient, PortError> {
            let mut patients = self.patients.write().await;
            if patients.values().any(|p| p.mrn == patient.mrn) {
                return Err(PortError::conflict(format!("MRN {} already exists", patient.mrn)));
            }
            patients.insert(patient.id, patient.clone());
            Ok(patient)
        }

        async fn update_enrollment(
            &self,
            id: PatientId,
            enrollment: HmoEnrollment,
        ) -> Result<Patient, PortError> {
            let mut patients = self.patients.write().await;
            let patient = patients
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Patient", id))?;
            patient.enrollment = enrollment;
            patient.updated_at = Utc::now();
            Ok(patient.clone())
        }
    }
}
