//! Claims Domain Ports
//!
//! The `ClaimsPort` trait is what the claims lifecycle needs from the
//! datastore. Two operations carry concurrency guarantees that every
//! adapter must honour:
//!
//! - [`ClaimsPort::insert_claim`] writes the claim and all of its items
//!   atomically, and reports a taken claim number as `PortError::Conflict`
//! - [`ClaimsPort::update_status`] is a compare-and-set on the status column

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{DomainPort, HmoClaimId, HmoProviderId, PatientId, PortError, UserId};

use crate::claim::{ClaimDetail, ClaimStatus, HmoClaim};
use crate::statistics::ClaimStatistics;

/// Query parameters for listing claims
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
    pub status: Option<ClaimStatus>,
    pub patient_id: Option<PatientId>,
    pub hmo_provider_id: Option<HmoProviderId>,
    /// Inclusive lower bound on `claim_date`
    pub from_date: Option<NaiveDate>,
    /// Inclusive upper bound on `claim_date`
    pub to_date: Option<NaiveDate>,
    /// Restricts results to claims filed by this user
    pub created_by: Option<UserId>,
}

impl ClaimQuery {
    pub fn matches(&self, claim: &HmoClaim) -> bool {
        self.status.map_or(true, |s| claim.status == s)
            && self.patient_id.map_or(true, |id| claim.patient_id == id)
            && self.hmo_provider_id.map_or(true, |id| claim.hmo_provider_id == id)
            && self.from_date.map_or(true, |d| claim.claim_date >= d)
            && self.to_date.map_or(true, |d| claim.claim_date <= d)
            && self.created_by.map_or(true, |u| claim.created_by == u)
    }
}

/// The port trait for claim storage
#[async_trait]
pub trait ClaimsPort: DomainPort {
    /// Persists a claim and its items in one transaction
    async fn insert_claim(&self, detail: ClaimDetail) -> Result<ClaimDetail, PortError>;

    /// Loads a claim with its items
    async fn get_claim(&self, id: HmoClaimId) -> Result<ClaimDetail, PortError>;

    /// Lists claims, newest first
    async fn find_claims(&self, query: ClaimQuery) -> Result<Vec<HmoClaim>, PortError>;

    /// Writes a transitioned claim if its stored status is still `expected`
    ///
    /// Fails with `PortError::Conflict` if another writer moved the claim first.
    async fn update_status(
        &self,
        claim: HmoClaim,
        expected: ClaimStatus,
    ) -> Result<HmoClaim, PortError>;

    /// Aggregates claims, optionally restricted to one creator
    async fn statistics(&self, created_by: Option<UserId>) -> Result<ClaimStatistics, PortError>;
}

/// Mock implementation of ClaimsPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of ClaimsPort
    #[derive(Debug, Default, Clone)]
    pub struct MockClaimsPort {
        claims: Arc<RwLock<HashMap<HmoClaimId, ClaimDetail>>>,
        /// Number of upcoming inserts that report a taken claim number
        forced_conflicts: Arc<RwLock<u32>>,
    }

    impl MockClaimsPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes the next `n` inserts fail with a claim number conflict
        pub async fn fail_next_inserts_with_conflict(&self, n: u32) {
            *self.forced_conflicts.write().await = n;
        }

        pub async fn len(&self) -> usize {
            self.claims.read().await.len()
        }
    }

    impl DomainPort for MockClaimsPort {}

    #[async_trait]
    impl ClaimsPort for MockClaimsPort {
        async fn insert_claim(&self, detail: ClaimDetail) -> Result<ClaimDetail, PortError> {
            {
                let mut pending = self.forced_conflicts.write().await;
                if *pending > 0 {
                    *pending -= 1;
                    return Err(PortError::conflict(format!(
                        "Claim number {} already exists",
                        detail.claim.claim_number
                    )));
                }
            }
            let mut claims = self.claims.write().await;
            if claims
                .values()
                .any(|c| c.claim.claim_number == detail.claim.claim_number)
            {
                return Err(PortError::conflict(format!(
                    "Claim number {} already exists",
                    detail.claim.claim_number
                )));
            }
            claims.insert(detail.claim.id, detail.clone());
            Ok(detail)
        }

        async fn get_claim(&self, id: HmoClaimId) -> Result<ClaimDetail, PortError> {
            self.claims
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("HmoClaim", id))
        }

        async fn find_claims(&self, query: ClaimQuery) -> Result<Vec<HmoClaim>, PortError> {
            let claims = self.claims.read().await;
            let mut results: Vec<_> = claims
                .values()
                .map(|d| &d.claim)
                .filter(|c| query.matches(c))
                .cloned()
                .collect();
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(results)
        }

        async fn update_status(
            &self,
            claim: HmoClaim,
            expected: ClaimStatus,
        ) -> Result<HmoClaim, PortError> {
            let mut claims = self.claims.write().await;
            let stored = claims
                .get_mut(&claim.id)
                .ok_or_else(|| PortError::not_found("HmoClaim", claim.id))?;
            if stored.claim.status != expected {
                return Err(PortError::conflict(format!(
                    "Claim {} changed status concurrently",
                    claim.claim_number
                )));
            }
            stored.claim = claim.clone();
            Ok(claim)
        }

        async fn statistics(&self, created_by: Option<UserId>) -> Result<ClaimStatistics, PortError> {
            let claims = self.claims.read().await;
            Ok(ClaimStatistics::from_claims(
                claims
                    .values()
                    .map(|d| &d.claim)
                    .filter(|c| created_by.map_or(true, |u| c.created_by == u)),
            ))
        }
    }
}
