//! Service packages sold by HMO providers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{HmoProviderId, Money, Rate, ServicePackageId};

use crate::error::HmoError;

/// A plan offered by a provider
///
/// An empty `services_covered` list means the package covers every service
/// that is not listed in `exclusions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePackage {
    pub id: ServicePackageId,
    pub hmo_provider_id: HmoProviderId,
    pub name: String,
    pub code: String,
    /// Annual benefit ceiling; `None` is unlimited
    pub annual_limit: Option<Money>,
    pub copay_percentage: Decimal,
    pub services_covered: Vec<String>,
    pub exclusions: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of asking a package about one service code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageVerdict {
    Covered,
    Excluded,
    NotListed,
}

impl ServicePackage {
    /// Decides whether the package pays for `service_code`
    ///
    /// Exclusions take precedence over the covered list. Codes are compared
    /// case-insensitively.
    pub fn covers(&self, service_code: &str) -> PackageVerdict {
        let matches = |c: &String| c.eq_ignore_ascii_case(service_code);
        if self.exclusions.iter().any(matches) {
            PackageVerdict::Excluded
        } else if self.services_covered.is_empty() || self.services_covered.iter().any(matches) {
            PackageVerdict::Covered
        } else {
            PackageVerdict::NotListed
        }
    }
}

/// Data required to add a package to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServicePackage {
    pub name: String,
    pub code: String,
    pub annual_limit: Option<Decimal>,
    pub copay_percentage: Decimal,
    #[serde(default)]
    pub services_covered: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl NewServicePackage {
    pub fn into_package(self, hmo_provider_id: HmoProviderId) -> Result<ServicePackage, HmoError> {
        let name = self.name.trim().to_string();
        let code = self.code.trim().to_string();
        if name.is_empty() || code.is_empty() {
            return Err(HmoError::invalid("Package name and code are required"));
        }
        Rate::try_from_percentage(self.copay_percentage)
            .map_err(|e| HmoError::invalid(e.to_string()))?;
        if let Some(limit) = self.annual_limit {
            if limit.is_sign_negative() {
                return Err(HmoError::invalid("Annual limit cannot be negative"));
            }
            Money::check_scale(limit).map_err(|e| HmoError::invalid(e.to_string()))?;
        }
        Money::check_scale(self.copay_percentage).map_err(|e| HmoError::invalid(e.to_string()))?;
        Ok(ServicePackage {
            id: ServicePackageId::new_v7(),
            hmo_provider_id,
            name,
            code,
            annual_limit: self.annual_limit.map(Money::ngn),
            copay_percentage: self.copay_percentage,
            services_covered: normalize_codes(self.services_covered),
            exclusions: normalize_codes(self.exclusions),
            is_active: true,
            created_at: Utc::now(),
        })
    }
}

fn normalize_codes(codes: Vec<String>) -> Vec<String> {
    codes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
