//! Patient records and HMO enrollment linkage

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{generate_reference, HmoProviderId, PatientId, ServicePackageId, UserId};

use crate::error::PatientError;

/// Prefix of generated medical record numbers
pub const MRN_PREFIX: &str = "MRN";

/// Generates a medical record number such as `MRN-MB3K9Q2L-7Q4ZD`
pub fn generate_mrn() -> String {
    generate_reference(MRN_PREFIX)
}

/// Patient gender as recorded at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(PatientError::invalid(format!("Unknown gender: {}", other))),
        }
    }
}

/// Person to contact in an emergency
///
/// Stored as a JSON document alongside the patient row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmergencyContact {
    #[validate(length(min = 1, message = "Emergency contact name is required"))]
    pub name: String,
    pub relationship: Option<String>,
    #[validate(length(min = 1, message = "Emergency contact phone is required"))]
    pub phone: String,
}

/// A patient's link to an HMO provider and service package
///
/// All fields are optional: an empty enrollment means the patient pays out
/// of pocket. Policy dates bound the period during which the HMO honours
/// claims for this patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmoEnrollment {
    pub hmo_provider_id: Option<HmoProviderId>,
    pub hmo_package_id: Option<ServicePackageId>,
    pub policy_start_date: Option<NaiveDate>,
    pub policy_end_date: Option<NaiveDate>,
    pub nhis_number: Option<String>,
}

impl HmoEnrollment {
    /// Returns true if the patient is linked to an HMO provider
    pub fn is_enrolled(&self) -> bool {
        self.hmo_provider_id.is_some()
    }

    /// Returns true if every field is empty
    pub fn is_cleared(&self) -> bool {
        *self == HmoEnrollment::default()
    }

    /// Checks the internal consistency of the linkage
    ///
    /// A package or policy dates without a provider make no sense, and the
    /// policy may not end before it starts.
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.hmo_provider_id.is_none()
            && (self.hmo_package_id.is_some()
                || self.policy_start_date.is_some()
                || self.policy_end_date.is_some())
        {
            return Err(PatientError::invalid(
                "An HMO package or policy dates require an HMO provider",
            ));
        }
        if let (Some(start), Some(end)) = (self.policy_start_date, self.policy_end_date) {
            if end < start {
                return Err(PatientError::invalid(format!(
                    "Policy end date {} is before start date {}",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

/// A registered patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    /// Medical record number, unique across the hospital
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(flatten)]
    pub enrollment: HmoEnrollment,
    pub registered_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Builds a new patient record from a registration request
    pub fn register(request: RegisterPatient, registered_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: PatientId::new_v7(),
            mrn: generate_mrn(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            date_of_birth: request.date_of_birth,
            gender: request.gender,
            phone: request.phone,
            email: request.email,
            address: request.address,
            emergency_contact: request.emergency_contact,
            enrollment: HmoEnrollment::default(),
            registered_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive substring match on name or MRN
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.first_name.to_lowercase().contains(&term)
            || self.last_name.to_lowercase().contains(&term)
            || self.mrn.to_lowercase().contains(&term)
    }
}

/// Data captured at the registration desk
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterPatient {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(nested)]
    pub emergency_contact: Option<EmergencyContact>,
}

impl RegisterPatient {
    /// Validates field constraints and business rules
    pub fn check(&self, today: NaiveDate) -> Result<(), PatientError> {
        self.validate()
            .map_err(|e| PatientError::invalid(e.to_string()))?;
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(PatientError::invalid("First and last name are required"));
        }
        if let Some(dob) = self.date_of_birth {
            if dob > today {
                return Err(PatientError::invalid("Date of birth cannot be in the future"));
            }
        }
        Ok(())
    }
}
