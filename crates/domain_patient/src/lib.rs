//! Patient Registration Domain
//!
//! Patients are registered once, receive a generated medical record number
//! (MRN) and may be linked to an HMO provider and service package. The
//! linkage is what the coverage resolver reads when deciding whether a
//! service is covered.
//!
//! Enrollment itself is validated by `domain_hmo`, which owns the provider
//! and package catalogue; this crate only stores and returns the linkage.

pub mod patient;
pub mod error;
pub mod ports;
pub mod service;

pub use patient::{
    Patient, Gender, EmergencyContact, HmoEnrollment, RegisterPatient, generate_mrn,
};
pub use error::PatientError;
pub use ports::{PatientPort, PatientQuery};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockPatientPort;
pub use service::PatientService;
