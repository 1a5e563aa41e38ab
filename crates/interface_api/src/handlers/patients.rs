//! Patient handlers

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{PatientId, Principal};
use domain_hmo::EnrollPatient;
use domain_patient::{Patient, RegisterPatient};

use crate::dto::{patients::SearchPatientsParams, AppJson, AppPath, AppQuery};
use crate::{error::ApiError, AppState};

/// Registers a patient
pub async fn register_patient(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<RegisterPatient>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let patient = state.patients.register(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// Searches patients by name or MRN
pub async fn search_patients(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(params): AppQuery<SearchPatientsParams>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.patients.search(&principal, params.search).await?))
}

/// Gets a patient by ID
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.get(&principal, PatientId::from(id)).await?))
}

/// Links a patient to an HMO, or clears the linkage
pub async fn enroll_patient(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<EnrollPatient>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state
        .hmo_admin
        .enroll_patient(&principal, PatientId::from(id), request)
        .await?;
    Ok(Json(patient))
}
