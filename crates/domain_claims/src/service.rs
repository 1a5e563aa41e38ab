//! Claims application service

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use core_kernel::{HmoClaimId, PortError, Principal, Role, Timezone};
use domain_hmo::HmoPort;
use domain_patient::PatientPort;

use crate::claim::{generate_claim_number, ClaimDetail, ClaimTransition, HmoClaim, NewClaim};
use crate::error::ClaimError;
use crate::ports::{ClaimQuery, ClaimsPort};
use crate::statistics::ClaimStatistics;

/// Attempts at inserting a claim before a claim number collision is surfaced
const MAX_CLAIM_NUMBER_ATTEMPTS: usize = 3;

const ADJUDICATION_ROLES: &[Role] = &[Role::Admin];
const PAYMENT_ROLES: &[Role] = &[Role::Admin, Role::Cashier];

/// Application service for the claims lifecycle
#[derive(Clone)]
pub struct ClaimsService {
    claims: Arc<dyn ClaimsPort>,
    hmo: Arc<dyn HmoPort>,
    patients: Arc<dyn PatientPort>,
    timezone: Timezone,
}

impl ClaimsService {
    pub fn new(
        claims: Arc<dyn ClaimsPort>,
        hmo: Arc<dyn HmoPort>,
        patients: Arc<dyn PatientPort>,
        timezone: Timezone,
    ) -> Self {
        Self {
            claims,
            hmo,
            patients,
            timezone,
        }
    }

    /// Files a new claim in `pending` status
    ///
    /// The claim and its items are written atomically. A claim number that
    /// is already taken is regenerated and the insert retried.
    #[instrument(skip(self, request), fields(user = %principal.id, patient_id = %request.patient_id))]
    pub async fn create(&self, principal: &Principal, request: NewClaim) -> Result<ClaimDetail, ClaimError> {
        self.patients.get_patient(request.patient_id).await.map_err(|e| {
            if e.is_not_found() {
                ClaimError::PatientNotFound(request.patient_id.to_string())
            } else {
                e.into()
            }
        })?;
        let provider = self.hmo.get_provider(request.hmo_provider_id).await.map_err(|e| {
            if e.is_not_found() {
                ClaimError::ProviderNotFound(request.hmo_provider_id.to_string())
            } else {
                e.into()
            }
        })?;
        if !provider.is_active {
            return Err(ClaimError::InactiveProvider(provider.name));
        }

        let mut detail = request.build(principal.id, self.timezone.today())?;
        let mut attempt = 1;
        loop {
            match self.claims.insert_claim(detail.clone()).await {
                Ok(created) => {
                    info!(
                        claim_id = %created.claim.id,
                        claim_number = %created.claim.claim_number,
                        claim_amount = %created.claim.claim_amount,
                        "Claim created"
                    );
                    return Ok(created);
                }
                Err(PortError::Conflict { message }) if attempt < MAX_CLAIM_NUMBER_ATTEMPTS => {
                    warn!(attempt, %message, "Claim number collision, retrying");
                    detail.claim.claim_number = generate_claim_number();
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn load(&self, id: HmoClaimId) -> Result<ClaimDetail, ClaimError> {
        self.claims.get_claim(id).await.map_err(|e| {
            if e.is_not_found() {
                ClaimError::ClaimNotFound(id.to_string())
            } else {
                e.into()
            }
        })
    }

    fn ensure_visible(principal: &Principal, claim: &HmoClaim) -> Result<(), ClaimError> {
        match principal.ownership_scope() {
            Some(user) if user != claim.created_by => {
                warn!(claim_id = %claim.id, "Claim access denied to non-owner");
                Err(ClaimError::NotOwner(claim.id.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Loads a claim with its items; non-admins may only read their own
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn get(&self, principal: &Principal, id: HmoClaimId) -> Result<ClaimDetail, ClaimError> {
        let detail = self.load(id).await?;
        Self::ensure_visible(principal, &detail.claim)?;
        Ok(detail)
    }

    /// Lists claims; non-admins only see the claims they filed
    #[instrument(skip(self, query), fields(user = %principal.id))]
    pub async fn list(&self, principal: &Principal, mut query: ClaimQuery) -> Result<Vec<HmoClaim>, ClaimError> {
        query.created_by = principal.ownership_scope();
        Ok(self.claims.find_claims(query).await?)
    }

    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn statistics(&self, principal: &Principal) -> Result<ClaimStatistics, ClaimError> {
        Ok(self.claims.statistics(principal.ownership_scope()).await?)
    }

    async fn transition(
        &self,
        principal: &Principal,
        claim: HmoClaim,
        transition: ClaimTransition,
    ) -> Result<HmoClaim, ClaimError> {
        let from = claim.status;
        let updated = claim.apply(transition, Utc::now())?;
        let updated = self.claims.update_status(updated, from).await?;
        info!(
            claim_id = %updated.id,
            from = %from,
            to = %updated.status,
            user = %principal.id,
            "Claim status changed"
        );
        Ok(updated)
    }

    /// pending -> submitted; only the filer or an admin may submit
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn submit(&self, principal: &Principal, id: HmoClaimId) -> Result<HmoClaim, ClaimError> {
        let claim = self.load(id).await?.claim;
        Self::ensure_visible(principal, &claim)?;
        self.transition(principal, claim, ClaimTransition::Submit).await
    }

    /// submitted -> approved, optionally recording a reduced payable amount
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn approve(
        &self,
        principal: &Principal,
        id: HmoClaimId,
        approved_amount: Option<Decimal>,
    ) -> Result<HmoClaim, ClaimError> {
        principal.require_any(ADJUDICATION_ROLES, "approve claims")?;
        let claim = self.load(id).await?.claim;
        self.transition(principal, claim, ClaimTransition::Approve { approved_amount })
            .await
    }

    /// submitted -> rejected
    #[instrument(skip(self, reason), fields(user = %principal.id))]
    pub async fn reject(
        &self,
        principal: &Principal,
        id: HmoClaimId,
        reason: String,
    ) -> Result<HmoClaim, ClaimError> {
        principal.require_any(ADJUDICATION_ROLES, "reject claims")?;
        let claim = self.load(id).await?.claim;
        self.transition(principal, claim, ClaimTransition::Reject { reason })
            .await
    }

    /// approved -> paid
    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn mark_paid(&self, principal: &Principal, id: HmoClaimId) -> Result<HmoClaim, ClaimError> {
        principal.require_any(PAYMENT_ROLES, "mark claims paid")?;
        let claim = self.load(id).await?.claim;
        self.transition(principal, claim, ClaimTransition::MarkPaid).await
    }
}
