//! Prescriptions and their dispensing state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{PatientId, PrescriptionId, UserId};

use crate::dispense::DispenseType;
use crate::error::PharmacyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Dispensed,
    Cancelled,
    Expired,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Dispensed => "dispensed",
            PrescriptionStatus::Cancelled => "cancelled",
            PrescriptionStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrescriptionStatus {
    type Err = PharmacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PrescriptionStatus::Active),
            "dispensed" => Ok(PrescriptionStatus::Dispensed),
            "cancelled" => Ok(PrescriptionStatus::Cancelled),
            "expired" => Ok(PrescriptionStatus::Expired),
            other => Err(PharmacyError::invalid(format!("Unknown prescription status: {}", other))),
        }
    }
}

/// One drug on a prescription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub quantity: Option<u32>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub patient_id: PatientId,
    pub prescribed_by: UserId,
    pub medications: Vec<Medication>,
    pub status: PrescriptionStatus,
    pub refills_remaining: u32,
    pub last_refill_date: Option<DateTime<Utc>>,
    pub dispensed_by: Option<UserId>,
    pub dispensed_at: Option<DateTime<Utc>>,
    pub dispensing_notes: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// Returns the prescription as it will be after a dispense of `kind`
    ///
    /// Fill and partial require an active prescription. A refill may follow
    /// a completed fill but consumes one of the remaining refills; the
    /// prescription closes when the last refill is taken.
    pub fn plan_dispense(
        &self,
        kind: DispenseType,
        dispensed_by: UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Prescription, PharmacyError> {
        let mut next = self.clone();
        match kind {
            DispenseType::Fill | DispenseType::Partial => {
                if self.status != PrescriptionStatus::Active {
                    return Err(PharmacyError::InvalidState {
                        action: kind.as_str().to_string(),
                        status: self.status.to_string(),
                    });
                }
                next.status = match kind {
                    DispenseType::Partial => PrescriptionStatus::Active,
                    _ => PrescriptionStatus::Dispensed,
                };
            }
            DispenseType::Refill => {
                if !matches!(self.status, PrescriptionStatus::Active | PrescriptionStatus::Dispensed) {
                    return Err(PharmacyError::InvalidState {
                        action: kind.as_str().to_string(),
                        status: self.status.to_string(),
                    });
                }
                if self.refills_remaining == 0 {
                    return Err(PharmacyError::RefillsExhausted(self.id.to_string()));
                }
                next.refills_remaining = self.refills_remaining - 1;
                next.last_refill_date = Some(at);
                next.status = if next.refills_remaining > 0 {
                    PrescriptionStatus::Active
                } else {
                    PrescriptionStatus::Dispensed
                };
            }
        }
        next.dispensed_by = Some(dispensed_by);
        next.dispensed_at = Some(at);
        next.dispensing_notes = notes;
        next.updated_at = at;
        Ok(next)
    }
}

/// A prescription as written by the clinician
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub patient_id: PatientId,
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub refills_remaining: u32,
    pub notes: Option<String>,
}

impl NewPrescription {
    pub fn into_prescription(self, prescribed_by: UserId) -> Result<Prescription, PharmacyError> {
        if self.medications.is_empty() {
            return Err(PharmacyError::invalid("A prescription requires at least one medication"));
        }
        if let Some(m) = self.medications.iter().find(|m| m.name.trim().is_empty()) {
            return Err(PharmacyError::invalid(format!(
                "Medication name is required (dosage {})",
                m.dosage
            )));
        }
        let now = Utc::now();
        Ok(Prescription {
            id: PrescriptionId::new_v7(),
            patient_id: self.patient_id,
            prescribed_by,
            medications: self.medications,
            status: PrescriptionStatus::Active,
            refills_remaining: self.refills_remaining,
            last_refill_date: None,
            dispensed_by: None,
            dispensed_at: None,
            dispensing_notes: None,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        })
    }
}
