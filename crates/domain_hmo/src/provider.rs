//! HMO providers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::HmoProviderId;

use crate::error::HmoError;

/// The kind of scheme a provider operates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    Hmo,
    Nhis,
    Private,
    Corporate,
}

impl CoverageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageType::Hmo => "hmo",
            CoverageType::Nhis => "nhis",
            CoverageType::Private => "private",
            CoverageType::Corporate => "corporate",
        }
    }
}

impl std::str::FromStr for CoverageType {
    type Err = HmoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hmo" => Ok(CoverageType::Hmo),
            "nhis" => Ok(CoverageType::Nhis),
            "private" => Ok(CoverageType::Private),
            "corporate" => Ok(CoverageType::Corporate),
            other => Err(HmoError::invalid(format!("Unknown coverage type: {}", other))),
        }
    }
}

/// An insurer the hospital has a contract with
///
/// Providers are never deleted; deactivation preserves the claim history
/// that references them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmoProvider {
    pub id: HmoProviderId,
    pub name: String,
    /// Short unique code, e.g. `AXA1`
    pub code: String,
    pub nhia_accreditation_number: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub coverage_type: CoverageType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to register a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHmoProvider {
    pub name: String,
    pub code: String,
    pub nhia_accreditation_number: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub coverage_type: CoverageType,
}

impl NewHmoProvider {
    pub fn into_provider(self) -> Result<HmoProvider, HmoError> {
        let name = self.name.trim().to_string();
        let code = self.code.trim().to_string();
        if name.is_empty() || code.is_empty() {
            return Err(HmoError::invalid("Provider name and code are required"));
        }
        let now = Utc::now();
        Ok(HmoProvider {
            id: HmoProviderId::new_v7(),
            name,
            code,
            nhia_accreditation_number: self.nhia_accreditation_number,
            contact_person: self.contact_person,
            phone: self.phone,
            email: self.email,
            address: self.address,
            coverage_type: self.coverage_type,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a provider; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HmoProviderUpdate {
    pub name: Option<String>,
    pub nhia_accreditation_number: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub coverage_type: Option<CoverageType>,
    pub is_active: Option<bool>,
}

impl HmoProvider {
    /// Applies a partial update in place
    pub fn apply(&mut self, update: HmoProviderUpdate) -> Result<(), HmoError> {
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(HmoError::invalid("Provider name cannot be empty"));
            }
            self.name = name;
        }
        if update.nhia_accreditation_number.is_some() {
            self.nhia_accreditation_number = update.nhia_accreditation_number;
        }
        if update.contact_person.is_some() {
            self.contact_person = update.contact_person;
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if update.email.is_some() {
            self.email = update.email;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        if let Some(coverage_type) = update.coverage_type {
            self.coverage_type = coverage_type;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}
