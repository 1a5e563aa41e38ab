//! Test Data Builders
//!
//! Builders for the request payloads the services accept. Tests set only the
//! fields they care about and take defaults for everything else.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{HmoProviderId, InventoryItemId, PatientId, ServiceCodeId};
use domain_claims::{NewClaim, NewClaimItem};
use domain_hmo::{CoverageType, EnrollPatient, NewHmoProvider, NewTariff};
use domain_patient::{Gender, RegisterPatient};
use domain_pharmacy::{DispenseItem, DispenseRequest, DispenseType, Medication, NewPrescription};
use domain_referral::{NewReferral, Urgency};

use crate::fixtures::{DateFixtures, IdFixtures};

/// Builder for a patient registration
pub struct TestPatientBuilder {
    first_name: String,
    last_name: String,
    date_of_birth: Option<NaiveDate>,
    gender: Option<Gender>,
    phone: Option<String>,
    email: Option<String>,
}

impl Default for TestPatientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPatientBuilder {
    pub fn new() -> Self {
        Self {
            first_name: "Adaeze".to_string(),
            last_name: "Okafor".to_string(),
            date_of_birth: Some(DateFixtures::date_of_birth()),
            gender: Some(Gender::Female),
            phone: Some("08031234567".to_string()),
            email: None,
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_date_of_birth(mut self, date: NaiveDate) -> Self {
        self.date_of_birth = Some(date);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn build(self) -> RegisterPatient {
        RegisterPatient {
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            phone: self.phone,
            email: self.email,
            address: None,
            emergency_contact: None,
        }
    }
}

/// Builder for an HMO provider
pub struct TestProviderBuilder {
    name: String,
    code: String,
    coverage_type: CoverageType,
}

impl Default for TestProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProviderBuilder {
    pub fn new() -> Self {
        Self {
            name: "Hygeia HMO".to_string(),
            code: "HYG".to_string(),
            coverage_type: CoverageType::Hmo,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_coverage_type(mut self, coverage_type: CoverageType) -> Self {
        self.coverage_type = coverage_type;
        self
    }

    pub fn build(self) -> NewHmoProvider {
        NewHmoProvider {
            name: self.name,
            code: self.code,
            nhia_accreditation_number: None,
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            coverage_type: self.coverage_type,
        }
    }
}

/// Builder for an enrollment covering the fixture policy year
pub struct TestEnrollmentBuilder {
    request: EnrollPatient,
}

impl TestEnrollmentBuilder {
    pub fn new(provider_id: HmoProviderId) -> Self {
        Self {
            request: EnrollPatient {
                hmo_provider_id: Some(provider_id),
                hmo_package_id: None,
                policy_start_date: Some(DateFixtures::policy_start()),
                policy_end_date: Some(DateFixtures::policy_end()),
                nhis_number: Some("NHIS-0001".to_string()),
            },
        }
    }

    pub fn with_policy(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.request.policy_start_date = start;
        self.request.policy_end_date = end;
        self
    }

    pub fn build(self) -> EnrollPatient {
        self.request
    }
}

/// Builder for a tariff
pub struct TestTariffBuilder {
    tariff: NewTariff,
}

impl TestTariffBuilder {
    pub fn new(provider_id: HmoProviderId, service_code_id: ServiceCodeId) -> Self {
        Self {
            tariff: NewTariff {
                hmo_provider_id: provider_id,
                service_code_id,
                tariff_amount: dec!(5000),
                copay_amount: None,
                copay_percentage: None,
                effective_from: DateFixtures::policy_start(),
                effective_to: None,
            },
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.tariff.tariff_amount = amount;
        self
    }

    pub fn with_copay_amount(mut self, amount: Decimal) -> Self {
        self.tariff.copay_amount = Some(amount);
        self
    }

    pub fn with_copay_percentage(mut self, percentage: Decimal) -> Self {
        self.tariff.copay_percentage = Some(percentage);
        self
    }

    pub fn effective(mut self, from: NaiveDate, to: Option<NaiveDate>) -> Self {
        self.tariff.effective_from = from;
        self.tariff.effective_to = to;
        self
    }

    pub fn build(self) -> NewTariff {
        self.tariff
    }
}

/// Builder for a claim; starts with no items
pub struct TestClaimBuilder {
    patient_id: PatientId,
    provider_id: HmoProviderId,
    items: Vec<NewClaimItem>,
}

impl TestClaimBuilder {
    pub fn new(provider_id: HmoProviderId) -> Self {
        Self {
            patient_id: IdFixtures::patient_id(),
            provider_id,
            items: Vec::new(),
        }
    }

    pub fn for_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    /// Adds a single-unit line for a fresh service code
    pub fn with_item(self, total: Decimal, copay: Decimal) -> Self {
        self.with_item_for(ServiceCodeId::new(), total, copay)
    }

    /// Adds a single-unit line for `service_code_id`
    pub fn with_item_for(mut self, service_code_id: ServiceCodeId, total: Decimal, copay: Decimal) -> Self {
        self.items.push(NewClaimItem {
            service_code_id,
            quantity: Some(1),
            unit_price: total,
            total_price: total,
            copay: Some(copay),
            diagnosis_code: None,
            provider_id: None,
        });
        self
    }

    pub fn build(self) -> NewClaim {
        NewClaim {
            patient_id: self.patient_id,
            hmo_provider_id: self.provider_id,
            claim_date: None,
            service_date: None,
            items: self.items,
        }
    }
}

/// Builder for a prescription with one medication
pub struct TestPrescriptionBuilder {
    patient_id: PatientId,
    refills_remaining: u32,
}

impl Default for TestPrescriptionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPrescriptionBuilder {
    pub fn new() -> Self {
        Self {
            patient_id: IdFixtures::patient_id(),
            refills_remaining: 0,
        }
    }

    pub fn for_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    pub fn with_refills(mut self, refills: u32) -> Self {
        self.refills_remaining = refills;
        self
    }

    pub fn build(self) -> NewPrescription {
        NewPrescription {
            patient_id: self.patient_id,
            medications: vec![Medication {
                name: "Amoxicillin".to_string(),
                dosage: "500mg".to_string(),
                frequency: "three times daily".to_string(),
                duration: Some("7 days".to_string()),
                quantity: Some(21),
                instructions: None,
            }],
            refills_remaining: self.refills_remaining,
            notes: None,
        }
    }
}

/// Builds a dispense request of the given type
pub fn dispense_request(dispense_type: DispenseType, lines: &[(InventoryItemId, u32)]) -> DispenseRequest {
    DispenseRequest {
        dispense_type,
        items: lines
            .iter()
            .map(|(item_id, quantity)| DispenseItem {
                item_id: *item_id,
                quantity: *quantity,
                batch_id: None,
            })
            .collect(),
        notes: None,
    }
}

/// Builds a routine referral for `patient_id`
pub fn referral_request(patient_id: PatientId) -> NewReferral {
    NewReferral {
        patient_id: Some(patient_id),
        destination_facility: "Lagos University Teaching Hospital".to_string(),
        specialist: None,
        specialty: Some("Cardiology".to_string()),
        reason_for_referral: "Specialist review".to_string(),
        clinical_summary: None,
        urgency: Urgency::Routine,
        hmo_provider_id: None,
        pre_authorization_code: None,
    }
}
