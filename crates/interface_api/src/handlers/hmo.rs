//! HMO catalogue, eligibility and coverage handlers

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{HmoProviderId, PatientId, Principal};
use domain_hmo::{
    CoverageDecision, EligibilityReport, HmoProvider, HmoProviderUpdate, HmoTariff, NewHmoProvider,
    NewServiceCode, NewServicePackage, NewTariff, NhisServiceCode, ServicePackage,
};

use crate::dto::hmo::{CheckCoverageRequest, ProviderListParams, TariffListParams};
use crate::dto::{AppJson, AppPath, AppQuery};
use crate::{error::ApiError, AppState};

// ============================================================================
// Providers
// ============================================================================

pub async fn create_provider(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<NewHmoProvider>,
) -> Result<(StatusCode, Json<HmoProvider>), ApiError> {
    let provider = state.hmo_admin.create_provider(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn list_providers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(params): AppQuery<ProviderListParams>,
) -> Result<Json<Vec<HmoProvider>>, ApiError> {
    Ok(Json(state.hmo_admin.list_providers(&principal, params.active_only).await?))
}

pub async fn get_provider(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<HmoProvider>, ApiError> {
    Ok(Json(state.hmo_admin.get_provider(&principal, HmoProviderId::from(id)).await?))
}

pub async fn update_provider(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(update): AppJson<HmoProviderUpdate>,
) -> Result<Json<HmoProvider>, ApiError> {
    let provider = state
        .hmo_admin
        .update_provider(&principal, HmoProviderId::from(id), update)
        .await?;
    Ok(Json(provider))
}

/// Deactivates a provider; providers are never hard-deleted
pub async fn deactivate_provider(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<HmoProvider>, ApiError> {
    let provider = state
        .hmo_admin
        .deactivate_provider(&principal, HmoProviderId::from(id))
        .await?;
    Ok(Json(provider))
}

// ============================================================================
// Packages, service codes and tariffs
// ============================================================================

pub async fn create_package(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(provider_id): AppPath<Uuid>,
    AppJson(request): AppJson<NewServicePackage>,
) -> Result<(StatusCode, Json<ServicePackage>), ApiError> {
    let package = state
        .hmo_admin
        .create_package(&principal, HmoProviderId::from(provider_id), request)
        .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

pub async fn list_packages(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(provider_id): AppPath<Uuid>,
) -> Result<Json<Vec<ServicePackage>>, ApiError> {
    let packages = state
        .hmo_admin
        .list_packages(&principal, HmoProviderId::from(provider_id))
        .await?;
    Ok(Json(packages))
}

pub async fn create_service_code(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<NewServiceCode>,
) -> Result<(StatusCode, Json<NhisServiceCode>), ApiError> {
    let code = state.hmo_admin.create_service_code(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(code)))
}

pub async fn list_service_codes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<NhisServiceCode>>, ApiError> {
    Ok(Json(state.hmo_admin.list_service_codes(&principal).await?))
}

pub async fn create_tariff(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<NewTariff>,
) -> Result<(StatusCode, Json<HmoTariff>), ApiError> {
    let tariff = state.hmo_admin.create_tariff(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(tariff)))
}

pub async fn list_tariffs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(params): AppQuery<TariffListParams>,
) -> Result<Json<Vec<HmoTariff>>, ApiError> {
    Ok(Json(state.hmo_admin.list_tariffs(&principal, params.into()).await?))
}

// ============================================================================
// Eligibility and coverage
// ============================================================================

pub async fn check_eligibility(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(patient_id): AppPath<Uuid>,
) -> Result<Json<EligibilityReport>, ApiError> {
    let report = state
        .coverage
        .check_eligibility(&principal, PatientId::from(patient_id))
        .await?;
    Ok(Json(report))
}

pub async fn check_coverage(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<CheckCoverageRequest>,
) -> Result<Json<CoverageDecision>, ApiError> {
    let decision = state
        .coverage
        .check_coverage(&principal, request.patient_id, request.service_code_id)
        .await?;
    Ok(Json(decision))
}
