//! Tests for the HMO catalogue, coverage resolution and eligibility

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal_macros::dec;

use core_kernel::{Principal, Role, ServiceCodeId, Timezone, UserId};
use domain_hmo::{
    CoverageResolver, CoverageType, EnrollPatient, HmoAdminService, HmoError, HmoProvider,
    MockHmoPort, NewHmoProvider, NewServiceCode, NewServicePackage, NewTariff, NhisServiceCode,
    PolicyStatus, ServicePackage,
};
use domain_patient::{MockPatientPort, Patient, RegisterPatient};

struct Harness {
    admin: HmoAdminService,
    resolver: CoverageResolver,
    patients: MockPatientPort,
    timezone: Timezone,
}

fn admin() -> Principal {
    Principal::new(UserId::new(), Role::Admin)
}

fn harness() -> Harness {
    let hmo = Arc::new(MockHmoPort::new());
    let patients = MockPatientPort::new();
    let timezone = Timezone::default();
    Harness {
        admin: HmoAdminService::new(hmo.clone(), Arc::new(patients.clone())),
        resolver: CoverageResolver::new(Arc::new(patients.clone()), hmo, timezone),
        patients,
        timezone,
    }
}

impl Harness {
    fn today(&self) -> NaiveDate {
        self.timezone.today()
    }

    async fn patient(&self) -> Patient {
        let patient = Patient::register(
            RegisterPatient {
                first_name: "Ngozi".to_string(),
                last_name: "Eze".to_string(),
                date_of_birth: None,
                gender: None,
                phone: None,
                email: None,
                address: None,
                emergency_contact: None,
            },
            UserId::new(),
        );
        self.patients.insert(patient.clone()).await;
        patient
    }

    async fn provider(&self, code: &str) -> HmoProvider {
        self.admin
            .create_provider(
                &admin(),
                NewHmoProvider {
                    name: "AXA Mansard".to_string(),
                    code: code.to_string(),
                    nhia_accreditation_number: Some("NHIA/HMO/0042".to_string()),
                    contact_person: None,
                    phone: None,
                    email: None,
                    address: None,
                    coverage_type: CoverageType::Hmo,
                },
            )
            .await
            .unwrap()
    }

    async fn package(&self, provider: &HmoProvider, code: &str, exclusions: Vec<String>) -> ServicePackage {
        self.admin
            .create_package(
                &admin(),
                provider.id,
                NewServicePackage {
                    name: "Gold".to_string(),
                    code: code.to_string(),
                    annual_limit: Some(dec!(1000000)),
                    copay_percentage: dec!(10),
                    services_covered: vec![],
                    exclusions,
                },
            )
            .await
            .unwrap()
    }

    async fn service_code(&self, code: &str) -> NhisServiceCode {
        self.admin
            .create_service_code(
                &admin(),
                NewServiceCode {
                    code: code.to_string(),
                    description: "General consultation".to_string(),
                    category: Some("consultation".to_string()),
                    base_tariff: dec!(4000),
                },
            )
            .await
            .unwrap()
    }

    async fn enroll(&self, patient: &Patient, provider: &HmoProvider, package: Option<&ServicePackage>, start: NaiveDate, end: Option<NaiveDate>) {
        self.admin
            .enroll_patient(
                &admin(),
                patient.id,
                EnrollPatient {
                    hmo_provider_id: Some(provider.id),
                    hmo_package_id: package.map(|p| p.id),
                    policy_start_date: Some(start),
                    policy_end_date: end,
                    nhis_number: Some("NHIS-778812".to_string()),
                },
            )
            .await
            .unwrap();
    }
}

fn tariff_request(provider: &HmoProvider, code: &NhisServiceCode, from: NaiveDate, to: Option<NaiveDate>) -> NewTariff {
    NewTariff {
        hmo_provider_id: provider.id,
        service_code_id: code.id,
        tariff_amount: dec!(5000),
        copay_amount: None,
        copay_percentage: Some(dec!(10)),
        effective_from: from,
        effective_to: to,
    }
}

mod coverage {
    use super::*;

    #[tokio::test]
    async fn test_gold_package_covers_consultation() {
        let h = harness();
        let yesterday = h.today().checked_sub_days(Days::new(1)).unwrap();

        let axa = h.provider("AXA1").await;
        let gold = h.package(&axa, "GOLD", vec![]).await;
        let consult = h.service_code("CON-001").await;
        h.admin
            .create_tariff(&admin(), tariff_request(&axa, &consult, yesterday, None))
            .await
            .unwrap();
        let patient = h.patient().await;
        h.enroll(&patient, &axa, Some(&gold), yesterday, None).await;

        let decision = h
            .resolver
            .check_coverage(&admin(), patient.id, consult.id)
            .await
            .unwrap();

        assert!(decision.covered);
        assert_eq!(decision.tariff_amount.unwrap().amount(), dec!(5000));
        assert_eq!(decision.copay_percentage, Some(dec!(10)));
        assert_eq!(decision.patient_pays.unwrap().amount(), dec!(500));
    }

    #[tokio::test]
    async fn test_patient_without_hmo_is_not_covered() {
        let h = harness();
        let patient = h.patient().await;
        let nurse = Principal::new(UserId::new(), Role::Nurse);

        let decision = h
            .resolver
            .check_coverage(&nurse, patient.id, ServiceCodeId::new())
            .await
            .unwrap();

        assert!(!decision.covered);
        assert!(decision.reason.unwrap().contains("not enrolled"));
    }

    #[tokio::test]
    async fn test_no_tariff_is_not_covered() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let consult = h.service_code("CON-001").await;
        let patient = h.patient().await;
        h.enroll(&patient, &axa, None, h.today(), None).await;

        let decision = h
            .resolver
            .check_coverage(&admin(), patient.id, consult.id)
            .await
            .unwrap();
        assert!(!decision.covered);
    }

    #[tokio::test]
    async fn test_future_tariff_is_not_yet_in_force() {
        let h = harness();
        let tomorrow = h.today().checked_add_days(Days::new(1)).unwrap();
        let axa = h.provider("AXA1").await;
        let consult = h.service_code("CON-001").await;
        h.admin
            .create_tariff(&admin(), tariff_request(&axa, &consult, tomorrow, None))
            .await
            .unwrap();
        let patient = h.patient().await;
        h.enroll(&patient, &axa, None, h.today(), None).await;

        let decision = h.resolver.check_coverage(&admin(), patient.id, consult.id).await.unwrap();
        assert!(!decision.covered);
    }

    #[tokio::test]
    async fn test_package_exclusion_blocks_coverage() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let consult = h.service_code("CON-001").await;
        let basic = h.package(&axa, "BASIC", vec!["CON-001".to_string()]).await;
        h.admin
            .create_tariff(&admin(), tariff_request(&axa, &consult, h.today(), None))
            .await
            .unwrap();
        let patient = h.patient().await;
        h.enroll(&patient, &axa, Some(&basic), h.today(), None).await;

        let decision = h.resolver.check_coverage(&admin(), patient.id, consult.id).await.unwrap();
        assert!(!decision.covered);
        assert!(decision.reason.unwrap().contains("excluded"));
    }

    #[tokio::test]
    async fn test_unknown_patient_is_not_found() {
        let h = harness();
        let result = h
            .resolver
            .check_coverage(&admin(), core_kernel::PatientId::new(), ServiceCodeId::new())
            .await;
        assert!(matches!(result, Err(HmoError::PatientNotFound(_))));
    }
}

mod eligibility {
    use super::*;

    #[tokio::test]
    async fn test_expired_policy_is_not_eligible() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let gold = h.package(&axa, "GOLD", vec![]).await;
        let patient = h.patient().await;
        let start = h.today().checked_sub_days(Days::new(400)).unwrap();
        let end = h.today().checked_sub_days(Days::new(30)).unwrap();
        h.enroll(&patient, &axa, Some(&gold), start, Some(end)).await;

        let report = h.resolver.check_eligibility(&admin(), patient.id).await.unwrap();
        assert_eq!(report.policy_status, PolicyStatus::Expired);
        assert!(!report.is_eligible);
        assert!(report.hmo_provider.is_some());
    }

    #[tokio::test]
    async fn test_active_policy_reports_annual_limit() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let gold = h.package(&axa, "GOLD", vec![]).await;
        let patient = h.patient().await;
        h.enroll(&patient, &axa, Some(&gold), h.today(), None).await;

        let report = h.resolver.check_eligibility(&admin(), patient.id).await.unwrap();
        assert!(report.is_eligible);
        assert_eq!(report.policy_status, PolicyStatus::Active);
        assert_eq!(report.coverage_remaining.unwrap().amount(), dec!(1000000));
    }

    #[tokio::test]
    async fn test_deactivated_provider_is_not_eligible() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let patient = h.patient().await;
        h.enroll(&patient, &axa, None, h.today(), None).await;
        h.admin.deactivate_provider(&admin(), axa.id).await.unwrap();

        let report = h.resolver.check_eligibility(&admin(), patient.id).await.unwrap();
        assert_eq!(report.policy_status, PolicyStatus::Active);
        assert!(!report.is_eligible);
    }

    #[tokio::test]
    async fn test_unenrolled_patient() {
        let h = harness();
        let patient = h.patient().await;
        let report = h.resolver.check_eligibility(&admin(), patient.id).await.unwrap();
        assert_eq!(report.policy_status, PolicyStatus::NotEnrolled);
        assert!(!report.is_eligible);
    }
}

mod administration {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_provider_code_conflicts() {
        let h = harness();
        h.provider("AXA1").await;
        let result = h
            .admin
            .create_provider(
                &admin(),
                NewHmoProvider {
                    name: "Another".to_string(),
                    code: "AXA1".to_string(),
                    nhia_accreditation_number: None,
                    contact_person: None,
                    phone: None,
                    email: None,
                    address: None,
                    coverage_type: CoverageType::Nhis,
                },
            )
            .await;
        assert!(matches!(result, Err(HmoError::DuplicateCode(_))));
    }

    #[tokio::test]
    async fn test_overlapping_tariff_is_refused() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let consult = h.service_code("CON-001").await;
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        h.admin
            .create_tariff(&admin(), tariff_request(&axa, &consult, start, None))
            .await
            .unwrap();

        let later = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let result = h
            .admin
            .create_tariff(&admin(), tariff_request(&axa, &consult, later, None))
            .await;
        assert!(matches!(result, Err(HmoError::OverlappingTariff(_))));
    }

    #[tokio::test]
    async fn test_doctor_cannot_create_provider() {
        let h = harness();
        let doctor = Principal::new(UserId::new(), Role::Doctor);
        let result = h
            .admin
            .create_provider(
                &doctor,
                NewHmoProvider {
                    name: "Hygeia".to_string(),
                    code: "HYG".to_string(),
                    nhia_accreditation_number: None,
                    contact_person: None,
                    phone: None,
                    email: None,
                    address: None,
                    coverage_type: CoverageType::Hmo,
                },
            )
            .await;
        assert!(matches!(result, Err(HmoError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_package_from_other_provider_is_rejected_at_enrollment() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let other = h.provider("HYG").await;
        let gold = h.package(&other, "GOLD", vec![]).await;
        let patient = h.patient().await;

        let result = h
            .admin
            .enroll_patient(
                &admin(),
                patient.id,
                EnrollPatient {
                    hmo_provider_id: Some(axa.id),
                    hmo_package_id: Some(gold.id),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(HmoError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_clearing_enrollment_is_allowed() {
        let h = harness();
        let axa = h.provider("AXA1").await;
        let patient = h.patient().await;
        h.enroll(&patient, &axa, None, h.today(), None).await;

        let receptionist = Principal::new(UserId::new(), Role::Receptionist);
        let cleared = h
            .admin
            .enroll_patient(&receptionist, patient.id, EnrollPatient::default())
            .await
            .unwrap();
        assert!(!cleared.enrollment.is_enrolled());
    }
}

mod properties {
    use super::*;
    use core_kernel::{EffectiveRange, HmoProviderId, Money, TariffId};
    use domain_hmo::{select_effective, HmoTariff};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use test_utils::{date_strategy, effective_range_strategy, ngn_amount_strategy, percentage_strategy};

    fn tariff(range: &EffectiveRange, amount: Decimal, copay_percentage: Option<Decimal>) -> HmoTariff {
        HmoTariff {
            id: TariffId::new(),
            hmo_provider_id: HmoProviderId::new(),
            service_code_id: ServiceCodeId::new(),
            tariff_amount: Money::ngn(amount),
            copay_amount: None,
            copay_percentage,
            effective_from: range.from,
            effective_to: range.to,
            created_at: chrono::Utc::now(),
        }
    }

    proptest! {
        #[test]
        fn selected_tariff_contains_date_and_has_latest_start(
            ranges in prop::collection::vec(effective_range_strategy(), 1..8),
            date in date_strategy(),
        ) {
            let rows: Vec<HmoTariff> = ranges.iter().map(|r| tariff(r, dec!(1000), None)).collect();

            match select_effective(&rows, date) {
                Some(picked) => {
                    prop_assert!(picked.is_effective_on(date));
                    for row in rows.iter().filter(|r| r.is_effective_on(date)) {
                        prop_assert!(row.effective_from <= picked.effective_from);
                    }
                }
                None => prop_assert!(rows.iter().all(|r| !r.is_effective_on(date))),
            }
        }

        #[test]
        fn percentage_copay_never_exceeds_tariff(
            range in effective_range_strategy(),
            amount in ngn_amount_strategy(),
            pct in percentage_strategy(),
        ) {
            let pays = tariff(&range, amount, Some(pct)).patient_pays();
            prop_assert!(!pays.is_negative());
            prop_assert!(pays.amount() <= amount);
        }
    }
}
