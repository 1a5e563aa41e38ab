//! Claims handlers

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{HmoClaimId, Principal};
use domain_claims::{ClaimDetail, ClaimStatistics, HmoClaim, NewClaim};

use crate::dto::claims::{ApproveClaimRequest, ClaimListParams, RejectClaimRequest};
use crate::dto::{AppJson, AppPath, AppQuery, OptionalJson};
use crate::{error::ApiError, AppState};

/// Files a claim in `pending` status
pub async fn create_claim(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<NewClaim>,
) -> Result<(StatusCode, Json<ClaimDetail>), ApiError> {
    let detail = state.claims.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Lists claims visible to the caller
pub async fn list_claims(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(params): AppQuery<ClaimListParams>,
) -> Result<Json<Vec<HmoClaim>>, ApiError> {
    Ok(Json(state.claims.list(&principal, params.into()).await?))
}

pub async fn claim_statistics(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ClaimStatistics>, ApiError> {
    Ok(Json(state.claims.statistics(&principal).await?))
}

/// Gets a claim with its items
pub async fn get_claim(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ClaimDetail>, ApiError> {
    Ok(Json(state.claims.get(&principal, HmoClaimId::from(id)).await?))
}

pub async fn submit_claim(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<HmoClaim>, ApiError> {
    Ok(Json(state.claims.submit(&principal, HmoClaimId::from(id)).await?))
}

/// Approves a submitted claim; the body may be omitted
pub async fn approve_claim(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    OptionalJson(body): OptionalJson<ApproveClaimRequest>,
) -> Result<Json<HmoClaim>, ApiError> {
    let request = body.unwrap_or_default();
    let claim = state
        .claims
        .approve(&principal, HmoClaimId::from(id), request.approved_amount)
        .await?;
    Ok(Json(claim))
}

pub async fn reject_claim(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<RejectClaimRequest>,
) -> Result<Json<HmoClaim>, ApiError> {
    request.validate()?;
    let claim = state
        .claims
        .reject(&principal, HmoClaimId::from(id), request.rejection_reason)
        .await?;
    Ok(Json(claim))
}

pub async fn mark_claim_paid(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<HmoClaim>, ApiError> {
    Ok(Json(state.claims.mark_paid(&principal, HmoClaimId::from(id)).await?))
}
