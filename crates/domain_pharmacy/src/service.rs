//! Pharmacy application service

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use core_kernel::{InventoryItemId, PrescriptionId, Principal, Role};

use crate::dispense::{DispenseCommand, DispenseOutcome, DispenseRequest, PrescriptionFill};
use crate::error::PharmacyError;
use crate::inventory::{InventoryItem, NewInventoryItem, ReceiveStock, StockMovement, StockReceipt};
use crate::ports::{PharmacyPort, PrescriptionQuery};
use crate::prescription::{NewPrescription, Prescription};

const PRESCRIBER_ROLES: &[Role] = &[Role::Doctor];
const DISPENSER_ROLES: &[Role] = &[Role::Pharmacist];

/// Application service for prescriptions, dispensing and stock
#[derive(Clone)]
pub struct PharmacyService {
    port: Arc<dyn PharmacyPort>,
}

impl PharmacyService {
    pub fn new(port: Arc<dyn PharmacyPort>) -> Self {
        Self { port }
    }

    #[instrument(skip(self, request), fields(user = %principal.id, patient_id = %request.patient_id))]
    pub async fn create_prescription(
        &self,
        principal: &Principal,
        request: NewPrescription,
    ) -> Result<Prescription, PharmacyError> {
        principal.require_any(PRESCRIBER_ROLES, "write prescriptions")?;
        let prescription = request.into_prescription(principal.id)?;
        let created = self.port.create_prescription(prescription).await?;
        info!(prescription_id = %created.id, refills = created.refills_remaining, "Prescription created");
        Ok(created)
    }

    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn get_prescription(
        &self,
        principal: &Principal,
        id: PrescriptionId,
    ) -> Result<Prescription, PharmacyError> {
        self.port.get_prescription(id).await.map_err(|e| {
            if e.is_not_found() {
                PharmacyError::PrescriptionNotFound(id.to_string())
            } else {
                e.into()
            }
        })
    }

    #[instrument(skip(self, query), fields(user = %principal.id))]
    pub async fn list_prescriptions(
        &self,
        principal: &Principal,
        query: PrescriptionQuery,
    ) -> Result<Vec<Prescription>, PharmacyError> {
        Ok(self.port.find_prescriptions(query).await?)
    }

    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn list_fills(
        &self,
        principal: &Principal,
        id: PrescriptionId,
    ) -> Result<Vec<PrescriptionFill>, PharmacyError> {
        self.get_prescription(principal, id).await?;
        Ok(self.port.list_fills(id).await?)
    }

    /// Dispenses against a prescription in one atomic unit
    #[instrument(skip(self, request), fields(user = %principal.id, kind = request.dispense_type.as_str()))]
    pub async fn dispense(
        &self,
        principal: &Principal,
        id: PrescriptionId,
        request: DispenseRequest,
    ) -> Result<DispenseOutcome, PharmacyError> {
        principal.require_any(DISPENSER_ROLES, "dispense medication")?;
        request.validate()?;
        let command = DispenseCommand::new(id, request, principal.id);
        match self.port.dispense(command).await {
            Ok(outcome) => {
                info!(
                    prescription_id = %id,
                    fill_id = %outcome.fill.id,
                    status = %outcome.prescription.status,
                    refills_remaining = outcome.prescription.refills_remaining,
                    lines = outcome.movements.len(),
                    "Prescription dispensed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(prescription_id = %id, error = %e, "Dispense refused");
                Err(e)
            }
        }
    }

    #[instrument(skip(self, request), fields(user = %principal.id, sku = %request.sku))]
    pub async fn create_item(
        &self,
        principal: &Principal,
        request: NewInventoryItem,
    ) -> Result<InventoryItem, PharmacyError> {
        principal.require_any(DISPENSER_ROLES, "manage inventory")?;
        let item = request.into_item()?;
        let sku = item.sku.clone();
        let created = self.port.create_item(item).await.map_err(|e| {
            if e.is_conflict() {
                PharmacyError::DuplicateSku(sku)
            } else {
                e.into()
            }
        })?;
        info!(item_id = %created.id, "Inventory item created");
        Ok(created)
    }

    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn get_item(
        &self,
        principal: &Principal,
        id: InventoryItemId,
    ) -> Result<InventoryItem, PharmacyError> {
        self.port.get_item(id).await.map_err(|e| {
            if e.is_not_found() {
                PharmacyError::ItemNotFound(id.to_string())
            } else {
                e.into()
            }
        })
    }

    /// Receives a delivery into a new batch and raises the item's stock
    #[instrument(skip(self, request), fields(user = %principal.id, quantity = request.quantity))]
    pub async fn receive_stock(
        &self,
        principal: &Principal,
        item_id: InventoryItemId,
        request: ReceiveStock,
    ) -> Result<StockReceipt, PharmacyError> {
        principal.require_any(DISPENSER_ROLES, "receive stock")?;
        let item = self.get_item(principal, item_id).await?;
        let (batch, movement) = request.into_receipt(item.id, principal.id, Utc::now())?;
        let receipt = self.port.receive_stock(batch, movement).await?;
        info!(
            item_id = %item_id,
            batch_id = %receipt.batch.id,
            current_stock = receipt.item.current_stock,
            "Stock received"
        );
        Ok(receipt)
    }

    #[instrument(skip(self), fields(user = %principal.id))]
    pub async fn list_movements(
        &self,
        principal: &Principal,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockMovement>, PharmacyError> {
        self.get_item(principal, item_id).await?;
        Ok(self.port.list_movements(item_id).await?)
    }
}
