//! Referral handlers

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Principal, ReferralId};
use domain_referral::{NewReferral, Referral, ReferralVerification};

use crate::dto::referrals::{AcceptReferralRequest, ReferralFeedbackRequest, ReferralListParams};
use crate::dto::{AppJson, AppPath, AppQuery, OptionalJson};
use crate::{error::ApiError, AppState};

pub async fn create_referral(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<NewReferral>,
) -> Result<(StatusCode, Json<Referral>), ApiError> {
    let referral = state.referrals.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

pub async fn list_referrals(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(params): AppQuery<ReferralListParams>,
) -> Result<Json<Vec<Referral>>, ApiError> {
    Ok(Json(state.referrals.list(&principal, params.into()).await?))
}

pub async fn get_referral(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Referral>, ApiError> {
    Ok(Json(state.referrals.get(&principal, ReferralId::from(id)).await?))
}

pub async fn accept_referral(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    OptionalJson(body): OptionalJson<AcceptReferralRequest>,
) -> Result<Json<Referral>, ApiError> {
    let request = body.unwrap_or_default();
    let referral = state
        .referrals
        .accept(&principal, ReferralId::from(id), request.appointment_date)
        .await?;
    Ok(Json(referral))
}

pub async fn complete_referral(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    OptionalJson(body): OptionalJson<ReferralFeedbackRequest>,
) -> Result<Json<Referral>, ApiError> {
    let request = body.unwrap_or_default();
    request.validate()?;
    let referral = state
        .referrals
        .complete(&principal, ReferralId::from(id), request.feedback)
        .await?;
    Ok(Json(referral))
}

pub async fn cancel_referral(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    OptionalJson(body): OptionalJson<ReferralFeedbackRequest>,
) -> Result<Json<Referral>, ApiError> {
    let request = body.unwrap_or_default();
    request.validate()?;
    let referral = state
        .referrals
        .cancel(&principal, ReferralId::from(id), request.feedback)
        .await?;
    Ok(Json(referral))
}

/// Public lookup used by receiving facilities; no token required
pub async fn verify_referral(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
) -> Result<Json<ReferralVerification>, ApiError> {
    Ok(Json(state.referrals.verify(&code).await?))
}
