//! Tests for patient registration, lookup and search

use std::sync::Arc;

use chrono::NaiveDate;

use core_kernel::{PatientId, Principal, Role, Timezone, UserId};
use domain_patient::{
    EmergencyContact, Gender, MockPatientPort, PatientError, PatientService, RegisterPatient,
};

fn principal(role: Role) -> Principal {
    Principal::new(UserId::new(), role)
}

fn registration(first: &str, last: &str) -> RegisterPatient {
    RegisterPatient {
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12),
        gender: Some(Gender::Female),
        phone: Some("+2348030000000".to_string()),
        email: Some("ada@example.com".to_string()),
        address: None,
        emergency_contact: Some(EmergencyContact {
            name: "Chidi Okafor".to_string(),
            relationship: Some("brother".to_string()),
            phone: "+2348031111111".to_string(),
        }),
    }
}

fn service() -> PatientService {
    PatientService::new(Arc::new(MockPatientPort::new()), Timezone::default())
}

mod registration {
    use super::*;

    #[tokio::test]
    async fn test_register_assigns_mrn_and_empty_enrollment() {
        let svc = service();
        let patient = svc
            .register(&principal(Role::Receptionist), registration("Ada", "Okafor"))
            .await
            .unwrap();

        assert!(patient.mrn.starts_with("MRN-"));
        assert!(!patient.enrollment.is_enrolled());
        assert_eq!(patient.full_name(), "Ada Okafor");
        assert_eq!(patient.emergency_contact.unwrap().name, "Chidi Okafor");
    }

    #[tokio::test]
    async fn test_pharmacist_cannot_register() {
        let result = service()
            .register(&principal(Role::Pharmacist), registration("Ada", "Okafor"))
            .await;
        assert!(matches!(result, Err(PatientError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let result = service()
            .register(&principal(Role::Admin), registration("  ", "Okafor"))
            .await;
        assert!(matches!(result, Err(PatientError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let mut request = registration("Ada", "Okafor");
        request.email = Some("not-an-email".to_string());
        let result = service().register(&principal(Role::Nurse), request).await;
        assert!(matches!(result, Err(PatientError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_future_birth_date_is_rejected() {
        let mut request = registration("Ada", "Okafor");
        request.date_of_birth = NaiveDate::from_ymd_opt(2999, 1, 1);
        let result = service().register(&principal(Role::Doctor), request).await;
        assert!(matches!(result, Err(PatientError::InvalidData(_))));
    }
}

mod lookup {
    use super::*;

    #[tokio::test]
    async fn test_get_unknown_patient_is_not_found() {
        let result = service()
            .get(&principal(Role::Nurse), PatientId::new())
            .await;
        assert!(matches!(result, Err(PatientError::PatientNotFound(_))));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_on_name_and_mrn() {
        let svc = service();
        let staff = principal(Role::Receptionist);
        let ada = svc.register(&staff, registration("Ada", "Okafor")).await.unwrap();
        svc.register(&staff, registration("Bola", "Adeyemi")).await.unwrap();

        let by_name = svc.search(&staff, Some("okaf".to_string())).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, ada.id);

        let by_mrn = svc
            .search(&staff, Some(ada.mrn.to_lowercase()))
            .await
            .unwrap();
        assert_eq!(by_mrn.len(), 1);

        let everyone = svc.search(&staff, Some("   ".to_string())).await.unwrap();
        assert_eq!(everyone.len(), 2);
    }
}
