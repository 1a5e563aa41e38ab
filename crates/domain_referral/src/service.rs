//! Referral application service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use core_kernel::{Principal, ReferralId, Role};

use crate::error::ReferralError;
use crate::ports::{ReferralPort, ReferralQuery};
use crate::referral::{NewReferral, Referral, ReferralTransition, ReferralVerification};

const REFERRING_ROLES: &[Role] = &[Role::Doctor];

/// Application service for the referral workflow
#[derive(Clone)]
pub struct ReferralService {
    port: Arc<dyn ReferralPort>,
}

impl ReferralService {
    pub fn new(port: Arc<dyn ReferralPort>) -> Self {
        Self { port }
    }

    /// Writes a referral in `pending` status with the caller as referrer
    #[instrument(skip(self, request), fields(user = %principal.id))]
    pub async fn create(&self, principal: &Principal, request: NewReferral) -> Result<Referral, ReferralError> {
        principal.require_any(REFERRING_ROLES, "create referrals")?;
        let referral = request.into_referral(principal.id)?;
        let created = self.port.insert_referral(referral).await?;
        info!(
            referral_id = %created.id,
            referral_code = %created.referral_code,
            urgency = created.urgency.as_str(),
            "Referral created"
        );
        Ok(created)
    }

    async fn load(&self, principal: &Principal, id: ReferralId) -> Result<Referral, ReferralError> {
        let referral = self.port.get_referral(id).await.map_err(|e| {
            if e.is_not_found() {
                ReferralError::ReferralNotFound(id.to_string())
            } else {
                e.into()
            }
        })?;
        match principal.ownership_scope() {
            Some(user) if user != referral.referring_provider_id => {
                warn!(referral_id = %id, "Referral access denied to non-owner");
                Err(ReferralError::NotOwner(id.to_string()))
            }
            _ => Ok(referral),
        }
    }

    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn get(&self, principal: &Principal, id: ReferralId) -> Result<Referral, ReferralError> {
        self.load(principal, id).await
    }

    /// Lists referrals; non-admins only see the referrals they wrote
    #[instrument(skip(self, query), fields(user = %principal.id))]
    pub async fn list(&self, principal: &Principal, mut query: ReferralQuery) -> Result<Vec<Referral>, ReferralError> {
        query.referring_provider_id = principal.ownership_scope();
        Ok(self.port.find_referrals(query).await?)
    }

    async fn transition(
        &self,
        principal: &Principal,
        id: ReferralId,
        transition: ReferralTransition,
    ) -> Result<Referral, ReferralError> {
        principal.require_any(REFERRING_ROLES, "update referrals")?;
        let referral = self.load(principal, id).await?;
        let from = referral.status;
        let updated = referral.apply(transition, Utc::now())?;
        let updated = self.port.update_status(updated, from).await?;
        info!(
            referral_id = %updated.id,
            from = %from,
            to = %updated.status,
            user = %principal.id,
            "Referral status changed"
        );
        Ok(updated)
    }

    /// pending -> accepted
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn accept(
        &self,
        principal: &Principal,
        id: ReferralId,
        appointment_date: Option<DateTime<Utc>>,
    ) -> Result<Referral, ReferralError> {
        self.transition(principal, id, ReferralTransition::Accept { appointment_date })
            .await
    }

    /// accepted -> completed
    #[instrument(skip(self, feedback), fields(user = %principal.id))]
    pub async fn complete(
        &self,
        principal: &Principal,
        id: ReferralId,
        feedback: Option<String>,
    ) -> Result<Referral, ReferralError> {
        self.transition(principal, id, ReferralTransition::Complete { feedback })
            .await
    }

    /// pending|accepted -> cancelled
    #[instrument(skip(self, feedback), fields(user = %principal.id))]
    pub async fn cancel(
        &self,
        principal: &Principal,
        id: ReferralId,
        feedback: Option<String>,
    ) -> Result<Referral, ReferralError> {
        self.transition(principal, id, ReferralTransition::Cancel { feedback })
            .await
    }

    /// Looks a referral up by its code; needs no caller
    #[instrument(skip(self))]
    pub async fn verify(&self, code: &str) -> Result<ReferralVerification, ReferralError> {
        match self.port.find_by_code(code.trim()).await {
            Ok(referral) => Ok(ReferralVerification::of(referral)),
            Err(e) if e.is_not_found() => Ok(ReferralVerification::unknown()),
            Err(e) => Err(e.into()),
        }
    }
}
