//! The NHIS catalogue of billable services

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Money, ServiceCodeId};

use crate::error::HmoError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhisServiceCode {
    pub id: ServiceCodeId,
    /// Catalogue code, e.g. `CON-001`
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    /// Reference price before provider negotiation
    pub base_tariff: Money,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceCode {
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    pub base_tariff: Decimal,
}

impl NewServiceCode {
    pub fn into_service_code(self) -> Result<NhisServiceCode, HmoError> {
        let code = self.code.trim().to_string();
        if code.is_empty() || self.description.trim().is_empty() {
            return Err(HmoError::invalid("Service code and description are required"));
        }
        if self.base_tariff.is_sign_negative() {
            return Err(HmoError::invalid("Base tariff cannot be negative"));
        }
        Money::check_scale(self.base_tariff).map_err(|e| HmoError::invalid(e.to_string()))?;
        Ok(NhisServiceCode {
            id: ServiceCodeId::new_v7(),
            code,
            description: self.description.trim().to_string(),
            category: self.category,
            base_tariff: Money::ngn(self.base_tariff),
            is_active: true,
        })
    }
}
