//! Prescription, dispensing and inventory handlers

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{InventoryItemId, Principal, PrescriptionId};
use domain_pharmacy::{
    DispenseOutcome, DispenseRequest, InventoryItem, NewInventoryItem, NewPrescription, Prescription,
    PrescriptionFill, ReceiveStock, StockMovement, StockReceipt,
};

use crate::dto::{pharmacy::PrescriptionListParams, AppJson, AppPath, AppQuery};
use crate::{error::ApiError, AppState};

pub async fn create_prescription(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<NewPrescription>,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    let prescription = state.pharmacy.create_prescription(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

pub async fn list_prescriptions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(params): AppQuery<PrescriptionListParams>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    Ok(Json(state.pharmacy.list_prescriptions(&principal, params.into()).await?))
}

pub async fn get_prescription(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Prescription>, ApiError> {
    Ok(Json(state.pharmacy.get_prescription(&principal, PrescriptionId::from(id)).await?))
}

/// Fill history of a prescription, oldest first
pub async fn list_fills(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Vec<PrescriptionFill>>, ApiError> {
    Ok(Json(state.pharmacy.list_fills(&principal, PrescriptionId::from(id)).await?))
}

/// Dispenses a fill, partial fill or refill
pub async fn dispense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<DispenseRequest>,
) -> Result<Json<DispenseOutcome>, ApiError> {
    let outcome = state
        .pharmacy
        .dispense(&principal, PrescriptionId::from(id), request)
        .await?;
    Ok(Json(outcome))
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(request): AppJson<NewInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let item = state.pharmacy.create_item(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<InventoryItem>, ApiError> {
    Ok(Json(state.pharmacy.get_item(&principal, InventoryItemId::from(id)).await?))
}

/// Receives a delivery into a new batch
pub async fn receive_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ReceiveStock>,
) -> Result<(StatusCode, Json<StockReceipt>), ApiError> {
    let receipt = state
        .pharmacy
        .receive_stock(&principal, InventoryItemId::from(id), request)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_movements(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    Ok(Json(state.pharmacy.list_movements(&principal, InventoryItemId::from(id)).await?))
}
