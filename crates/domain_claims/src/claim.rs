//! Claim aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{generate_reference, HmoClaimId, HmoProviderId, Money, PatientId, UserId};

use crate::error::ClaimError;
use crate::item::{ClaimItem, ClaimTotals, NewClaimItem};

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Created, not yet sent to the HMO
    Pending,
    /// Sent to the HMO for adjudication
    Submitted,
    /// Accepted for payment
    Approved,
    /// Refused by the HMO; terminal
    Rejected,
    /// Reimbursement received; terminal
    Paid,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::Paid => "paid",
        }
    }

    /// Checks if transition is valid
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (*self, target),
            (Pending, Submitted) |
            (Submitted, Approved) |
            (Submitted, Rejected) |
            (Approved, Paid)
        )
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClaimStatus::Pending),
            "submitted" => Ok(ClaimStatus::Submitted),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            "paid" => Ok(ClaimStatus::Paid),
            other => Err(ClaimError::invalid(format!("Unknown claim status: {}", other))),
        }
    }
}

/// Generates a claim number such as `CLM-MB3K9Q2L-7Q4ZD`
pub fn generate_claim_number() -> String {
    generate_reference("CLM")
}

/// A reimbursement claim filed with an HMO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmoClaim {
    pub id: HmoClaimId,
    pub claim_number: String,
    pub patient_id: PatientId,
    pub hmo_provider_id: HmoProviderId,
    pub claim_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    /// Sum of item totals
    pub total_amount: Money,
    /// Sum of item copays
    pub copay_amount: Money,
    /// `total_amount - copay_amount`
    pub claim_amount: Money,
    /// Amount the approver agreed to pay, when it differs from `claim_amount`
    pub approved_amount: Option<Money>,
    pub status: ClaimStatus,
    pub submission_date: Option<DateTime<Utc>>,
    pub approval_date: Option<DateTime<Utc>>,
    pub payment_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A claim together with its line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDetail {
    #[serde(flatten)]
    pub claim: HmoClaim,
    pub items: Vec<ClaimItem>,
}

/// A requested status change
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimTransition {
    Submit,
    Approve { approved_amount: Option<Decimal> },
    Reject { reason: String },
    MarkPaid,
}

impl ClaimTransition {
    pub fn target(&self) -> ClaimStatus {
        match self {
            ClaimTransition::Submit => ClaimStatus::Submitted,
            ClaimTransition::Approve { .. } => ClaimStatus::Approved,
            ClaimTransition::Reject { .. } => ClaimStatus::Rejected,
            ClaimTransition::MarkPaid => ClaimStatus::Paid,
        }
    }
}

impl HmoClaim {
    /// The amount the HMO is expected to reimburse
    pub fn payable_amount(&self) -> Money {
        self.approved_amount.unwrap_or(self.claim_amount)
    }

    /// Returns a copy of the claim with `transition` applied
    ///
    /// The original is left untouched so the caller can persist the result
    /// conditionally on the status it was planned from.
    pub fn apply(&self, transition: ClaimTransition, at: DateTime<Utc>) -> Result<HmoClaim, ClaimError> {
        let target = transition.target();
        if !self.status.can_transition_to(target) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }

        let mut next = self.clone();
        match transition {
            ClaimTransition::Submit => next.submission_date = Some(at),
            ClaimTransition::Approve { approved_amount } => {
                if let Some(amount) = approved_amount {
                    Money::check_scale(amount).map_err(|e| ClaimError::invalid(e.to_string()))?;
                    if amount.is_sign_negative() || amount > self.total_amount.amount() {
                        return Err(ClaimError::invalid(
                            "Approved amount must be between zero and the claim total",
                        ));
                    }
                    next.approved_amount = Some(Money::new(amount, self.total_amount.currency()));
                }
                next.approval_date = Some(at);
            }
            ClaimTransition::Reject { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(ClaimError::invalid("Rejection reason is required"));
                }
                next.rejection_reason = Some(reason.to_string());
            }
            ClaimTransition::MarkPaid => next.payment_date = Some(at),
        }
        next.status = target;
        next.updated_at = at;
        Ok(next)
    }
}

/// A claim as filed by staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub patient_id: PatientId,
    pub hmo_provider_id: HmoProviderId,
    pub claim_date: Option<NaiveDate>,
    pub service_date: Option<NaiveDate>,
    pub items: Vec<NewClaimItem>,
}

impl NewClaim {
    /// Validates the request and derives totals
    ///
    /// `today` is used when no claim date is given.
    pub fn build(self, created_by: UserId, today: NaiveDate) -> Result<ClaimDetail, ClaimError> {
        if self.items.is_empty() {
            return Err(ClaimError::invalid("A claim requires at least one item"));
        }
        let id = HmoClaimId::new_v7();
        let items = self
            .items
            .into_iter()
            .map(|i| i.into_item(id))
            .collect::<Result<Vec<_>, _>>()?;
        let totals = ClaimTotals::of(&items)?;
        let now = Utc::now();

        Ok(ClaimDetail {
            claim: HmoClaim {
                id,
                claim_number: generate_claim_number(),
                patient_id: self.patient_id,
                hmo_provider_id: self.hmo_provider_id,
                claim_date: self.claim_date.unwrap_or(today),
                service_date: self.service_date,
                total_amount: totals.total_amount,
                copay_amount: totals.copay_amount,
                claim_amount: totals.claim_amount,
                approved_amount: None,
                status: ClaimStatus::Pending,
                submission_date: None,
                approval_date: None,
                payment_date: None,
                rejection_reason: None,
                created_by,
                created_at: now,
                updated_at: now,
            },
            items,
        })
    }
}
