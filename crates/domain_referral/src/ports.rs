//! Referral Domain Ports

use async_trait::async_trait;

use core_kernel::{DomainPort, PatientId, PortError, ReferralId, UserId};

use crate::referral::{Referral, ReferralStatus};

/// Query parameters for listing referrals
#[derive(Debug, Clone, Default)]
pub struct ReferralQuery {
    pub status: Option<ReferralStatus>,
    pub patient_id: Option<PatientId>,
    /// Restricts results to referrals written by this user
    pub referring_provider_id: Option<UserId>,
}

impl ReferralQuery {
    pub fn matches(&self, referral: &Referral) -> bool {
        self.status.map_or(true, |s| referral.status == s)
            && self.patient_id.map_or(true, |id| referral.patient_id == id)
            && self
                .referring_provider_id
                .map_or(true, |u| referral.referring_provider_id == u)
    }
}

/// The port trait for referral storage
#[async_trait]
pub trait ReferralPort: DomainPort {
    /// Persists a referral; a taken referral code is `PortError::Conflict`
    async fn insert_referral(&self, referral: Referral) -> Result<Referral, PortError>;

    async fn get_referral(&self, id: ReferralId) -> Result<Referral, PortError>;

    async fn find_by_code(&self, code: &str) -> Result<Referral, PortError>;

    /// Lists referrals, newest first
    async fn find_referrals(&self, query: ReferralQuery) -> Result<Vec<Referral>, PortError>;

    /// Writes a transitioned referral if its stored status is still `expected`
    async fn update_status(
        &self,
        referral: Referral,
        expected: ReferralStatus,
    ) -> Result<Referral, PortError>;
}

/// Mock implementation of ReferralPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of ReferralPort
    #[derive(Debug, Default, Clone)]
    pub struct MockReferralPort {
        referrals: Arc<RwLock<HashMap<ReferralId, Referral>>>,
    }

    impl MockReferralPort {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for MockReferralPort {}

    #[async_trait]
    impl ReferralPort for MockReferralPort {
        async fn insert_referral(&self, referral: Referral) -> Result<Referral, PortError> {
            let mut referrals = self.referrals.write().await;
            if referrals.values().any(|r| r.referral_code == referral.referral_code) {
                return Err(PortError::conflict(format!(
                    "Referral code {} already exists",
                    referral.referral_code
                )));
            }
            referrals.insert(referral.id, referral.clone());
            Ok(referral)
        }

        async fn get_referral(&self, id: ReferralId) -> Result<Referral, PortError> {
            self.referrals
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Referral", id))
        }

        async fn find_by_code(&self, code: &str) -> Result<Referral, PortError> {
            self.referrals
                .read()
                .await
                .values()
                .find(|r| r.referral_code == code)
                .cloned()
                .ok_or_else(|| PortError::not_found("Referral", code))
        }

        async fn find_referrals(&self, query: ReferralQuery) -> Result<Vec<Referral>, PortError> {
            let referrals = self.referrals.read().await;
            let mut results: Vec<_> = referrals.values().filter(|r| query.matches(r)).cloned().collect();
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(results)
        }

        async fn update_status(
            &self,
            referral: Referral,
            expected: ReferralStatus,
        ) -> Result<Referral, PortError> {
            let mut referrals = self.referrals.write().await;
            let stored = referrals
                .get_mut(&referral.id)
                .ok_or_else(|| PortError::not_found("Referral", referral.id))?;
            if stored.status != expected {
                return Err(PortError::conflict(format!(
                    "Referral {} changed status concurrently",
                    referral.referral_code
                )));
            }
            *stored = referral.clone();
            Ok(referral)
        }
    }
}
