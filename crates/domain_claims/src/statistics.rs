//! Claim reporting figures, recomputed on every request

use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};

use crate::claim::{ClaimStatus, HmoClaim};

/// Counts per status and payable sums for open and settled claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimStatistics {
    pub total_claims: u64,
    pub pending_count: u64,
    pub submitted_count: u64,
    pub approved_count: u64,
    pub rejected_count: u64,
    pub paid_count: u64,
    pub pending_amount: Money,
    pub approved_amount: Money,
    pub paid_amount: Money,
}

impl Default for ClaimStatistics {
    fn default() -> Self {
        Self {
            total_claims: 0,
            pending_count: 0,
            submitted_count: 0,
            approved_count: 0,
            rejected_count: 0,
            paid_count: 0,
            pending_amount: Money::zero(Currency::NGN),
            approved_amount: Money::zero(Currency::NGN),
            paid_amount: Money::zero(Currency::NGN),
        }
    }
}

impl ClaimStatistics {
    /// Folds one claim into the figures
    pub fn record(&mut self, status: ClaimStatus, payable: Money) {
        self.total_claims += 1;
        match status {
            ClaimStatus::Pending => {
                self.pending_count += 1;
                self.pending_amount = Money::ngn(self.pending_amount.amount() + payable.amount());
            }
            ClaimStatus::Submitted => self.submitted_count += 1,
            ClaimStatus::Approved => {
                self.approved_count += 1;
                self.approved_amount = Money::ngn(self.approved_amount.amount() + payable.amount());
            }
            ClaimStatus::Rejected => self.rejected_count += 1,
            ClaimStatus::Paid => {
                self.paid_count += 1;
                self.paid_amount = Money::ngn(self.paid_amount.amount() + payable.amount());
            }
        }
    }

    pub fn from_claims<'a>(claims: impl IntoIterator<Item = &'a HmoClaim>) -> Self {
        claims.into_iter().fold(Self::default(), |mut stats, claim| {
            stats.record(claim.status, claim.payable_amount());
            stats
        })
    }
}
