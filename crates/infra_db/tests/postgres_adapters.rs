//! PostgreSQL adapter tests
//!
//! Each test starts its own container, so they are ignored unless a Docker
//! daemon is available: `cargo test -p infra_db -- --ignored`.

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{InventoryItemId, PortError, Principal, Timezone};
use domain_claims::{ClaimError, ClaimStatus, ClaimsPort, ClaimsService};
use domain_hmo::{HmoAdminService, HmoPort, HmoProvider, NewServiceCode, NhisServiceCode};
use domain_patient::{Patient, PatientService};
use domain_pharmacy::{
    DispenseType, NewInventoryItem, PharmacyError, PharmacyService, ReceiveStock,
};
use domain_referral::{ReferralService, ReferralStatus};
use infra_db::{
    PostgresClaimsAdapter, PostgresHmoAdapter, PostgresPatientAdapter, PostgresPharmacyAdapter,
    PostgresReferralAdapter,
};
use sqlx::PgPool;
use test_utils::{
    assert_claim_totals_consistent, assert_stock_matches_movements, db_test, dispense_request,
    referral_request, DateFixtures, StaffFixtures, TestClaimBuilder, TestEnrollmentBuilder,
    TestPatientBuilder, TestPrescriptionBuilder, TestProviderBuilder, TestTariffBuilder,
};

/// Services wired to the PostgreSQL adapters
struct Hospital {
    patients: PatientService,
    hmo: HmoAdminService,
    hmo_port: Arc<PostgresHmoAdapter>,
    claims: ClaimsService,
    claims_port: Arc<PostgresClaimsAdapter>,
    pharmacy: PharmacyService,
    referrals: ReferralService,
}

impl Hospital {
    fn new(pool: &PgPool) -> Self {
        let tz = Timezone::default();
        let patient_port = Arc::new(PostgresPatientAdapter::new(pool.clone()));
        let hmo_port = Arc::new(PostgresHmoAdapter::new(pool.clone()));
        let claims_port = Arc::new(PostgresClaimsAdapter::new(pool.clone()));
        Self {
            patients: PatientService::new(patient_port.clone(), tz),
            hmo: HmoAdminService::new(hmo_port.clone(), patient_port.clone()),
            hmo_port: hmo_port.clone(),
            claims: ClaimsService::new(claims_port.clone(), hmo_port, patient_port, tz),
            claims_port,
            pharmacy: PharmacyService::new(Arc::new(PostgresPharmacyAdapter::new(pool.clone()))),
            referrals: ReferralService::new(Arc::new(PostgresReferralAdapter::new(pool.clone()))),
        }
    }

    async fn patient(&self) -> Patient {
        self.patients
            .register(&StaffFixtures::receptionist(), TestPatientBuilder::new().build())
            .await
            .unwrap()
    }

    async fn provider(&self, code: &str) -> HmoProvider {
        self.hmo
            .create_provider(&StaffFixtures::admin(), TestProviderBuilder::new().with_code(code).build())
            .await
            .unwrap()
    }

    async fn service_code(&self, code: &str) -> NhisServiceCode {
        self.hmo
            .create_service_code(
                &StaffFixtures::admin(),
                NewServiceCode {
                    code: code.to_string(),
                    description: "General consultation".to_string(),
                    category: Some("consultation".to_string()),
                    base_tariff: dec!(5000),
                },
            )
            .await
            .unwrap()
    }

    async fn stocked_item(&self, pharmacist: &Principal, sku: &str, quantity: u32) -> InventoryItemId {
        let item = self
            .pharmacy
            .create_item(
                pharmacist,
                NewInventoryItem {
                    name: "Paracetamol 500mg".to_string(),
                    sku: sku.to_string(),
                    unit: "tablet".to_string(),
                    reorder_level: 10,
                },
            )
            .await
            .unwrap();
        self.pharmacy
            .receive_stock(
                pharmacist,
                item.id,
                ReceiveStock {
                    batch_number: "BATCH-1".to_string(),
                    expiry_date: None,
                    quantity,
                },
            )
            .await
            .unwrap();
        item.id
    }
}

mod patients_and_coverage {
    use super::*;

    db_test!(test_enrollment_round_trips, |pool| {
        let hospital = Hospital::new(&pool);
        let patient = hospital.patient().await;
        let provider = hospital.provider("HYG").await;

        let enrolled = hospital
            .hmo
            .enroll_patient(
                &StaffFixtures::receptionist(),
                patient.id,
                TestEnrollmentBuilder::new(provider.id).build(),
            )
            .await
            .unwrap();
        assert_eq!(enrolled.enrollment.hmo_provider_id, Some(provider.id));
        assert_eq!(enrolled.enrollment.policy_end_date, Some(DateFixtures::policy_end()));

        let found = hospital
            .patients
            .search(&StaffFixtures::nurse(), Some(patient.mrn.to_lowercase()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, patient.id);
    });

    db_test!(test_search_treats_wildcards_literally, |pool| {
        let hospital = Hospital::new(&pool);
        hospital.patient().await;

        for term in ["%", "_"] {
            let found = hospital
                .patients
                .search(&StaffFixtures::nurse(), Some(term.to_string()))
                .await
                .unwrap();
            assert!(found.is_empty(), "{} matched as a wildcard", term);
        }
    });

    db_test!(test_duplicate_provider_code_is_conflict, |pool| {
        let hospital = Hospital::new(&pool);
        hospital.provider("AXA").await;
        let err = hospital
            .hmo
            .create_provider(&StaffFixtures::admin(), TestProviderBuilder::new().with_code("AXA").build())
            .await
            .unwrap_err();
        assert!(matches!(err, domain_hmo::HmoError::DuplicateCode(_)));
    });

    db_test!(test_overlapping_tariff_is_rejected_by_the_store, |pool| {
        let hospital = Hospital::new(&pool);
        let provider = hospital.provider("HYG").await;
        let code = hospital.service_code("CONS-01").await;

        let first = TestTariffBuilder::new(provider.id, code.id)
            .effective(DateFixtures::policy_start(), Some(DateFixtures::policy_end()))
            .build()
            .into_tariff()
            .unwrap();
        hospital.hmo_port.create_tariff(first).await.unwrap();

        // Bypass the service's own check to reach the exclusion constraint
        let overlapping = TestTariffBuilder::new(provider.id, code.id)
            .effective(DateFixtures::today(), None)
            .build()
            .into_tariff()
            .unwrap();
        let err = hospital.hmo_port.create_tariff(overlapping).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));

        let adjacent = TestTariffBuilder::new(provider.id, code.id)
            .effective(DateFixtures::after_policy(), None)
            .with_amount(dec!(5500))
            .build()
            .into_tariff()
            .unwrap();
        assert!(hospital.hmo_port.create_tariff(adjacent).await.is_ok());
    });
}

mod claims {
    use super::*;

    db_test!(test_claim_persists_items_and_totals, |pool| {
        let hospital = Hospital::new(&pool);
        let patient = hospital.patient().await;
        let provider = hospital.provider("HYG").await;
        let code = hospital.service_code("CONS-01").await;
        let nurse = StaffFixtures::nurse();

        let request = TestClaimBuilder::new(provider.id)
            .for_patient(patient.id)
            .with_item_for(code.id, dec!(5000), dec!(500))
            .with_item_for(code.id, dec!(1200), dec!(0))
            .build();
        let created = hospital.claims.create(&nurse, request).await.unwrap();

        let loaded = hospital.claims.get(&nurse, created.claim.id).await.unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.claim.claim_amount.amount(), dec!(5700));
        assert_claim_totals_consistent(&loaded);
    });

    db_test!(test_stale_status_update_is_conflict, |pool| {
        let hospital = Hospital::new(&pool);
        let patient = hospital.patient().await;
        let provider = hospital.provider("HYG").await;
        let code = hospital.service_code("CONS-01").await;
        let admin = StaffFixtures::admin();

        let created = hospital
            .claims
            .create(
                &admin,
                TestClaimBuilder::new(provider.id)
                    .for_patient(patient.id)
                    .with_item_for(code.id, dec!(5000), dec!(0))
                    .build(),
            )
            .await
            .unwrap();
        let submitted = hospital.claims.submit(&admin, created.claim.id).await.unwrap();
        assert_eq!(submitted.status, ClaimStatus::Submitted);

        // A writer that still believes the claim is pending loses
        let stale = created
            .claim
            .apply(domain_claims::ClaimTransition::Submit, chrono::Utc::now())
            .unwrap();
        let err = hospital
            .claims_port
            .update_status(stale, ClaimStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));

        hospital.claims.approve(&admin, created.claim.id, None).await.unwrap();
        let err = hospital
            .claims
            .reject(&admin, created.claim.id, "late".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidStatusTransition { .. }));

        let stats = hospital.claims.statistics(&admin).await.unwrap();
        assert_eq!(stats.approved_count, 1);
        assert_eq!(stats.approved_amount.amount(), dec!(5000));
    });
}

mod pharmacy {
    use super::*;

    db_test!(test_dispense_updates_stock_and_prescription, |pool| {
        let hospital = Hospital::new(&pool);
        let patient = hospital.patient().await;
        let doctor = StaffFixtures::doctor();
        let pharmacist = StaffFixtures::pharmacist();
        let item_id = hospital.stocked_item(&pharmacist, "PCM-500", 10).await;

        let prescription = hospital
            .pharmacy
            .create_prescription(&doctor, TestPrescriptionBuilder::new().for_patient(patient.id).with_refills(1).build())
            .await
            .unwrap();
        hospital
            .pharmacy
            .dispense(&pharmacist, prescription.id, dispense_request(DispenseType::Fill, &[(item_id, 4)]))
            .await
            .unwrap();
        let outcome = hospital
            .pharmacy
            .dispense(&pharmacist, prescription.id, dispense_request(DispenseType::Refill, &[(item_id, 4)]))
            .await
            .unwrap();
        assert_eq!(outcome.prescription.refills_remaining, 0);

        let item = hospital.pharmacy.get_item(&pharmacist, item_id).await.unwrap();
        assert_eq!(item.current_stock, 2);
        let movements = hospital.pharmacy.list_movements(&pharmacist, item_id).await.unwrap();
        assert_eq!(movements.len(), 3);
        assert_stock_matches_movements(item.current_stock, &movements);

        let fills = hospital.pharmacy.list_fills(&pharmacist, prescription.id).await.unwrap();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].fill_type, DispenseType::Fill);
    });

    db_test!(test_failed_dispense_changes_nothing, |pool| {
        let hospital = Hospital::new(&pool);
        let patient = hospital.patient().await;
        let pharmacist = StaffFixtures::pharmacist();
        let plenty = hospital.stocked_item(&pharmacist, "AMX-500", 50).await;
        let scarce = hospital.stocked_item(&pharmacist, "IBU-400", 2).await;

        let prescription = hospital
            .pharmacy
            .create_prescription(&StaffFixtures::doctor(), TestPrescriptionBuilder::new().for_patient(patient.id).build())
            .await
            .unwrap();
        let err = hospital
            .pharmacy
            .dispense(
                &pharmacist,
                prescription.id,
                dispense_request(DispenseType::Fill, &[(plenty, 10), (scarce, 3)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PharmacyError::InsufficientStock { .. }));

        let item = hospital.pharmacy.get_item(&pharmacist, plenty).await.unwrap();
        assert_eq!(item.current_stock, 50);
        let movements = hospital.pharmacy.list_movements(&pharmacist, plenty).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert!(hospital.pharmacy.list_fills(&pharmacist, prescription.id).await.unwrap().is_empty());
    });

    db_test!(test_concurrent_dispenses_never_oversell, |pool| {
        let hospital = Hospital::new(&pool);
        let patient = hospital.patient().await;
        let doctor = StaffFixtures::doctor();
        let pharmacist = StaffFixtures::pharmacist();
        let item_id = hospital.stocked_item(&pharmacist, "PCM-500", 5).await;

        let mut prescriptions = Vec::new();
        for _ in 0..2 {
            let p = hospital
                .pharmacy
                .create_prescription(&doctor, TestPrescriptionBuilder::new().for_patient(patient.id).build())
                .await
                .unwrap();
            prescriptions.push(p.id);
        }

        let (a, b) = tokio::join!(
            hospital.pharmacy.dispense(&pharmacist, prescriptions[0], dispense_request(DispenseType::Fill, &[(item_id, 3)])),
            hospital.pharmacy.dispense(&pharmacist, prescriptions[1], dispense_request(DispenseType::Fill, &[(item_id, 3)])),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

        let item = hospital.pharmacy.get_item(&pharmacist, item_id).await.unwrap();
        assert_eq!(item.current_stock, 2);
    });
}

mod referrals {
    use super::*;

    db_test!(test_referral_verification_by_code, |pool| {
        let hospital = Hospital::new(&pool);
        let patient = hospital.patient().await;
        let doctor = StaffFixtures::doctor();

        let referral = hospital
            .referrals
            .create(&doctor, referral_request(patient.id))
            .await
            .unwrap();
        let verification = hospital.referrals.verify(&referral.referral_code).await.unwrap();
        assert!(verification.valid);

        let cancelled = hospital
            .referrals
            .cancel(&doctor, referral.id, Some("Patient declined".to_string()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReferralStatus::Cancelled);

        let verification = hospital.referrals.verify(&referral.referral_code).await.unwrap();
        assert!(!verification.valid);
        assert!(!hospital.referrals.verify("REF-UNKNOWN-00000").await.unwrap().valid);
    });
}
