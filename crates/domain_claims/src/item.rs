//! Claim line items and derived totals

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimItemId, Currency, HmoClaimId, Money, ServiceCodeId, UserId};

use crate::error::ClaimError;

/// One billed service on a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub id: ClaimItemId,
    pub claim_id: HmoClaimId,
    pub service_code_id: ServiceCodeId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    /// Patient's share of this line
    pub copay: Money,
    pub diagnosis_code: Option<String>,
    /// Clinician who rendered the service
    pub provider_id: Option<UserId>,
}

/// A line item as submitted by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaimItem {
    pub service_code_id: ServiceCodeId,
    pub quantity: Option<u32>,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub copay: Option<Decimal>,
    pub diagnosis_code: Option<String>,
    pub provider_id: Option<UserId>,
}

impl NewClaimItem {
    /// Validates the line and binds it to `claim_id`
    pub fn into_item(self, claim_id: HmoClaimId) -> Result<ClaimItem, ClaimError> {
        let quantity = self.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(ClaimError::invalid("Item quantity must be at least 1"));
        }
        if self.unit_price.is_sign_negative() || self.total_price.is_sign_negative() {
            return Err(ClaimError::invalid("Item prices cannot be negative"));
        }
        let copay = self.copay.unwrap_or_default();
        for amount in [self.unit_price, self.total_price, copay] {
            Money::check_scale(amount).map_err(|e| ClaimError::invalid(e.to_string()))?;
        }
        if copay.is_sign_negative() || copay > self.total_price {
            return Err(ClaimError::invalid(
                "Item copay must be between zero and the item total",
            ));
        }
        Ok(ClaimItem {
            id: ClaimItemId::new_v7(),
            claim_id,
            service_code_id: self.service_code_id,
            quantity,
            unit_price: Money::ngn(self.unit_price),
            total_price: Money::ngn(self.total_price),
            copay: Money::ngn(copay),
            diagnosis_code: self.diagnosis_code,
            provider_id: self.provider_id,
        })
    }
}

/// Totals derived from a claim's items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimTotals {
    pub total_amount: Money,
    pub copay_amount: Money,
    pub claim_amount: Money,
}

impl ClaimTotals {
    pub fn of(items: &[ClaimItem]) -> Result<Self, ClaimError> {
        let currency = items
            .first()
            .map(|i| i.total_price.currency())
            .unwrap_or(Currency::NGN);
        let total_amount = Money::sum(currency, items.iter().map(|i| &i.total_price))
            .map_err(|e| ClaimError::invalid(e.to_string()))?;
        let copay_amount = Money::sum(currency, items.iter().map(|i| &i.copay))
            .map_err(|e| ClaimError::invalid(e.to_string()))?;
        let claim_amount = total_amount
            .checked_sub(&copay_amount)
            .map_err(|e| ClaimError::invalid(e.to_string()))?;
        Ok(Self {
            total_amount,
            copay_amount,
            claim_amount,
        })
    }
}
