//! End-to-end tests of the HTTP router against in-memory ports

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable, Role, Timezone, UserId};
use domain_claims::MockClaimsPort;
use domain_hmo::MockHmoPort;
use domain_patient::MockPatientPort;
use domain_pharmacy::MockPharmacyPort;
use domain_referral::MockReferralPort;
use interface_api::auth::create_token;
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState, Ports};

const SECRET: &str = "api-test-secret";

struct StaticHealth(AdapterHealth);

#[async_trait]
impl HealthCheckable for StaticHealth {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "static".to_string(),
            status: self.0,
            latency_ms: 0,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }
}

struct TestApp {
    router: Router,
}

/// A signed-in member of staff
struct Staff {
    token: String,
}

impl Staff {
    fn new(role: Role) -> Self {
        Self {
            token: create_token(UserId::new(), role, SECRET, 3600).unwrap(),
        }
    }
}

fn app_with_health(health: AdapterHealth) -> TestApp {
    let config = ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..ApiConfig::default()
    };
    let ports = Ports {
        patients: Arc::new(MockPatientPort::new()),
        hmo: Arc::new(MockHmoPort::new()),
        claims: Arc::new(MockClaimsPort::new()),
        pharmacy: Arc::new(MockPharmacyPort::new()),
        referrals: Arc::new(MockReferralPort::new()),
        datastore: Arc::new(StaticHealth(health)),
    };
    TestApp {
        router: create_router(AppState::new(config, Timezone::default(), ports)),
    }
}

fn app() -> TestApp {
    app_with_health(AdapterHealth::Healthy)
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, staff: Option<&Staff>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(staff) = staff {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", staff.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    /// Sends a body verbatim with the given content type
    async fn send_raw(&self, method: Method, uri: &str, staff: &Staff, content_type: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", staff.token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str, staff: &Staff) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(staff), None).await
    }

    async fn post(&self, uri: &str, staff: &Staff, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(staff), Some(body)).await
    }

    async fn put(&self, uri: &str, staff: &Staff, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(staff), body).await
    }
}

fn amount(value: &Value) -> Decimal {
    value["amount"].as_str().unwrap().parse().unwrap()
}

async fn register_patient(app: &TestApp, last_name: &str) -> String {
    let (status, patient) = app
        .post(
            "/api/patients",
            &Staff::new(Role::Receptionist),
            json!({ "first_name": "Ada", "last_name": last_name }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    patient["id"].as_str().unwrap().to_string()
}

async fn create_provider(app: &TestApp, admin: &Staff, code: &str) -> Value {
    let (status, provider) = app
        .post(
            "/api/hmo/providers",
            admin,
            json!({ "name": "Hygeia HMO", "code": code, "coverage_type": "hmo" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    provider
}

mod public_routes {
    use super::*;

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let (status, body) = app().send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_reflects_datastore() {
        let (status, body) = app().send(Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["datastore"]["status"], "healthy");

        let (status, _) = app_with_health(AdapterHealth::Unhealthy)
            .send(Method::GET, "/health/ready", None, None)
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_referral_code_verifies_as_invalid() {
        let (status, body) = app()
            .send(Method::GET, "/api/referrals/verify/REF-NOPE-00000", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert!(body["referral"].is_null());
    }
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (status, body) = app().send(Method::GET, "/api/claims", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_unauthorized() {
        let forged = Staff {
            token: create_token(UserId::new(), Role::Admin, "not-the-secret", 3600).unwrap(),
        };
        let (status, _) = app().get("/api/claims", &forged).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_check_is_forbidden() {
        let app = app();
        let nurse = Staff::new(Role::Nurse);
        let (status, body) = app
            .post("/api/hmo/providers", &nurse, json!({ "name": "X", "code": "X", "coverage_type": "hmo" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("nurse"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let (status, body) = app.post("/api/hmo/providers", &admin, json!({ "name": 42 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

mod patients_and_coverage {
    use super::*;

    #[tokio::test]
    async fn test_register_enroll_and_check_eligibility() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let receptionist = Staff::new(Role::Receptionist);
        let provider = create_provider(&app, &admin, "HYG").await;

        let (status, patient) = app
            .post(
                "/api/patients",
                &receptionist,
                json!({ "first_name": "Ada", "last_name": "Obi", "phone": "08030000000" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(patient["mrn"].as_str().unwrap().starts_with("MRN-"));
        let patient_id = patient["id"].as_str().unwrap().to_string();

        let (status, enrolled) = app
            .put(
                &format!("/api/patients/{}/hmo", patient_id),
                &receptionist,
                Some(json!({
                    "hmo_provider_id": provider["id"],
                    "policy_start_date": "2020-01-01",
                    "policy_end_date": "2099-12-31",
                    "nhis_number": "NHIS-123"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(enrolled["hmo_provider_id"], provider["id"]);

        let (status, report) = app
            .get(&format!("/api/hmo/eligibility/{}", patient_id), &receptionist)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["is_eligible"], true);

        let (status, found) = app.get("/api/patients?search=obi", &receptionist).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1);
    }

    async fn create_service_code(app: &TestApp, admin: &Staff, code: &str) -> String {
        let (status, created) = app
            .post(
                "/api/hmo/service-codes",
                admin,
                json!({ "code": code, "description": format!("Service {}", code), "base_tariff": "6000" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        created["id"].as_str().unwrap().to_string()
    }

    async fn create_tariff(app: &TestApp, admin: &Staff, provider: &Value, service_code_id: &str) {
        let (status, _) = app
            .post(
                "/api/hmo/tariffs",
                admin,
                json!({
                    "hmo_provider_id": provider["id"],
                    "service_code_id": service_code_id,
                    "tariff_amount": "5000",
                    "copay_percentage": "10",
                    "effective_from": "2020-01-01"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_coverage_follows_enrollment_tariffs_and_exclusions() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let receptionist = Staff::new(Role::Receptionist);
        let provider = create_provider(&app, &admin, "HYG").await;
        let provider_id = provider["id"].as_str().unwrap();

        let (status, package) = app
            .post(
                &format!("/api/hmo/providers/{}/packages", provider_id),
                &admin,
                json!({
                    "name": "Gold",
                    "code": "GOLD",
                    "annual_limit": "500000",
                    "copay_percentage": "10",
                    "exclusions": ["LAB-099"]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let consultation = create_service_code(&app, &admin, "CONS-001").await;
        let excluded = create_service_code(&app, &admin, "LAB-099").await;
        let untariffed = create_service_code(&app, &admin, "RAD-010").await;
        create_tariff(&app, &admin, &provider, &consultation).await;
        create_tariff(&app, &admin, &provider, &excluded).await;

        let patient_id = register_patient(&app, "Eze").await;
        let check = |service_code_id: &str| {
            json!({ "patient_id": patient_id, "service_code_id": service_code_id })
        };

        let (status, decision) = app.post("/api/hmo/check-coverage", &receptionist, check(&consultation)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decision["covered"], false);
        assert_eq!(decision["reason"], "Patient is not enrolled with an HMO");

        let (status, _) = app
            .put(
                &format!("/api/patients/{}/hmo", patient_id),
                &receptionist,
                Some(json!({
                    "hmo_provider_id": provider_id,
                    "hmo_package_id": package["id"],
                    "policy_start_date": "2020-01-01",
                    "policy_end_date": "2099-12-31"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, decision) = app.post("/api/hmo/check-coverage", &receptionist, check(&consultation)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decision["covered"], true);
        assert!(decision["reason"].is_null());
        assert_eq!(decision["tariff_amount"]["currency"], "NGN");
        assert_eq!(amount(&decision["tariff_amount"]), dec!(5000));
        assert_eq!(decision["copay_percentage"].as_str().unwrap().parse::<Decimal>().unwrap(), dec!(10));
        assert_eq!(amount(&decision["patient_pays"]), dec!(500));

        let (_, decision) = app.post("/api/hmo/check-coverage", &receptionist, check(&excluded)).await;
        assert_eq!(decision["covered"], false);
        assert!(decision["reason"].as_str().unwrap().contains("excluded by package"));

        let (_, decision) = app.post("/api/hmo/check-coverage", &receptionist, check(&untariffed)).await;
        assert_eq!(decision["covered"], false);
        assert!(decision["reason"].as_str().unwrap().starts_with("No active tariff"));

        let (status, report) = app
            .get(&format!("/api/hmo/eligibility/{}", patient_id), &receptionist)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["is_eligible"], true);
        assert_eq!(report["policy_status"], "active");
        assert_eq!(report["package"]["code"], "GOLD");
        assert_eq!(amount(&report["coverage_remaining"]), dec!(500000));
    }

    #[tokio::test]
    async fn test_claim_for_unknown_patient_is_not_found() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let provider = create_provider(&app, &admin, "HYG").await;
        let (status, body) = app
            .post(
                "/api/claims",
                &admin,
                json!({
                    "patient_id": uuid::Uuid::new_v4(),
                    "hmo_provider_id": provider["id"],
                    "items": [{ "service_code_id": uuid::Uuid::new_v4(), "unit_price": "5000", "total_price": "5000" }]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Patient not found"));
    }

    #[tokio::test]
    async fn test_unknown_patient_is_not_found() {
        let app = app();
        let nurse = Staff::new(Role::Nurse);
        let (status, body) = app
            .get(&format!("/api/patients/{}", uuid::Uuid::new_v4()), &nurse)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Patient not found"));
    }

    #[tokio::test]
    async fn test_duplicate_provider_code_conflicts() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        create_provider(&app, &admin, "AXA").await;
        let (status, _) = app
            .post(
                "/api/hmo/providers",
                &admin,
                json!({ "name": "Other", "code": "AXA", "coverage_type": "hmo" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

mod claims {
    use super::*;

    async fn file_claim(app: &TestApp, staff: &Staff, provider: &Value) -> Value {
        let patient_id = register_patient(app, "Okafor").await;
        let (status, claim) = app
            .post(
                "/api/claims",
                staff,
                json!({
                    "patient_id": patient_id,
                    "hmo_provider_id": provider["id"],
                    "items": [
                        { "service_code_id": uuid::Uuid::new_v4(), "unit_price": "5000", "total_price": "5000", "copay": "500" },
                        { "service_code_id": uuid::Uuid::new_v4(), "unit_price": "1200", "total_price": "1200" }
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        claim
    }

    #[tokio::test]
    async fn test_claim_lifecycle_over_http() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let nurse = Staff::new(Role::Nurse);
        let cashier = Staff::new(Role::Cashier);
        let provider = create_provider(&app, &admin, "HYG").await;

        let claim = file_claim(&app, &nurse, &provider).await;
        assert_eq!(claim["status"], "pending");
        assert_eq!(amount(&claim["total_amount"]), dec!(6200));
        assert_eq!(amount(&claim["claim_amount"]), dec!(5700));
        assert_eq!(claim["items"].as_array().unwrap().len(), 2);
        let uri = format!("/api/claims/{}", claim["id"].as_str().unwrap());

        let (status, _) = app.put(&format!("{}/approve", uri), &admin, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "pending claims cannot be approved");

        let (status, submitted) = app.put(&format!("{}/submit", uri), &nurse, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(submitted["status"], "submitted");

        let (status, _) = app.put(&format!("{}/approve", uri), &nurse, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, approved) = app
            .put(&format!("{}/approve", uri), &admin, Some(json!({ "approved_amount": "5000" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(amount(&approved["approved_amount"]), dec!(5000));

        let (status, paid) = app.put(&format!("{}/paid", uri), &cashier, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(paid["status"], "paid");

        let (status, stats) = app.get("/api/claims/statistics", &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["paid_count"], 1);
        assert_eq!(amount(&stats["paid_amount"]), dec!(5000));
    }

    #[tokio::test]
    async fn test_claims_are_scoped_to_their_creator() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let author = Staff::new(Role::Nurse);
        let other = Staff::new(Role::Nurse);
        let provider = create_provider(&app, &admin, "HYG").await;
        let claim = file_claim(&app, &author, &provider).await;
        let uri = format!("/api/claims/{}", claim["id"].as_str().unwrap());

        let (status, _) = app.get(&uri, &other).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, listed) = app.get("/api/claims", &other).await;
        assert!(listed.as_array().unwrap().is_empty());

        let (_, listed) = app.get("/api/claims?status=pending", &author).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (_, listed) = app.get("/api/claims", &admin).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let provider = create_provider(&app, &admin, "HYG").await;
        let claim = file_claim(&app, &admin, &provider).await;
        let uri = format!("/api/claims/{}", claim["id"].as_str().unwrap());
        app.put(&format!("{}/submit", uri), &admin, None).await;

        let (status, _) = app
            .put(&format!("{}/reject", uri), &admin, Some(json!({ "rejection_reason": "" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, rejected) = app
            .put(
                &format!("{}/reject", uri),
                &admin,
                Some(json!({ "rejection_reason": "Service not covered" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rejected["status"], "rejected");
        assert_eq!(rejected["rejection_reason"], "Service not covered");
    }
}

mod optional_bodies {
    use super::*;

    async fn submitted_claim(app: &TestApp, admin: &Staff) -> String {
        let provider = create_provider(app, admin, "HYG").await;
        let patient_id = register_patient(app, "Bello").await;
        let (status, claim) = app
            .post(
                "/api/claims",
                admin,
                json!({
                    "patient_id": patient_id,
                    "hmo_provider_id": provider["id"],
                    "items": [{ "service_code_id": uuid::Uuid::new_v4(), "unit_price": "5000", "total_price": "5000" }]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/claims/{}", claim["id"].as_str().unwrap());
        let (status, _) = app.put(&format!("{}/submit", uri), admin, None).await;
        assert_eq!(status, StatusCode::OK);
        uri
    }

    #[tokio::test]
    async fn test_malformed_approval_body_is_rejected() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let uri = submitted_claim(&app, &admin).await;

        let (status, body) = app
            .put(
                &format!("{}/approve", uri),
                &admin,
                Some(json!({ "approved_amount": "four thousand" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = app
            .send_raw(Method::PUT, &format!("{}/approve", uri), &admin, "text/plain", "approved_amount=4000")
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("application/json"));

        let (_, claim) = app.get(&uri, &admin).await;
        assert_eq!(claim["status"], "submitted");
        assert!(claim["approved_amount"].is_null());
    }

    #[tokio::test]
    async fn test_approval_without_body_pays_claim_amount() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let uri = submitted_claim(&app, &admin).await;

        let (status, approved) = app.put(&format!("{}/approve", uri), &admin, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "approved");
        assert!(approved["approved_amount"].is_null());
    }

    #[tokio::test]
    async fn test_approval_finer_than_storage_scale_is_rejected() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        let uri = submitted_claim(&app, &admin).await;

        let (status, _) = app
            .put(&format!("{}/approve", uri), &admin, Some(json!({ "approved_amount": "100.000001" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_referral_feedback_is_rejected() {
        let app = app();
        let doctor = Staff::new(Role::Doctor);
        let patient_id = register_patient(&app, "Musa").await;
        let (status, referral) = app
            .post(
                "/api/referrals",
                &doctor,
                json!({ "patient_id": patient_id, "destination_facility": "LUTH", "reason_for_referral": "Cardiology review" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/referrals/{}", referral["id"].as_str().unwrap());

        let (status, body) = app
            .put(&format!("{}/cancel", uri), &doctor, Some(json!({ "feedback": 7 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, cancelled) = app.put(&format!("{}/cancel", uri), &doctor, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");
    }
}

mod request_rejections {
    use super::*;

    #[tokio::test]
    async fn test_malformed_path_id_is_json_bad_request() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        for uri in ["/api/claims/not-a-uuid", "/api/patients/42", "/api/inventory/items/x/movements"] {
            let (status, body) = app.get(uri, &admin).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].is_string(), "{} did not return a JSON error", uri);
        }
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_bad_request() {
        let app = app();
        let admin = Staff::new(Role::Admin);
        for uri in ["/api/claims?status=lost", "/api/claims?from_date=yesterday", "/api/hmo/tariffs?hmo_provider_id=1"] {
            let (status, body) = app.get(uri, &admin).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].is_string(), "{} did not return a JSON error", uri);
        }
    }
}

mod pharmacy {
    use super::*;

    async fn stocked_item(app: &TestApp, pharmacist: &Staff, quantity: u32) -> String {
        let (status, item) = app
            .post(
                "/api/inventory/items",
                pharmacist,
                json!({ "name": "Amoxicillin 500mg", "sku": "AMX-500", "unit": "capsule" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let item_id = item["id"].as_str().unwrap().to_string();

        let (status, receipt) = app
            .post(
                &format!("/api/inventory/items/{}/receive", item_id),
                pharmacist,
                json!({ "batch_number": "B-001", "quantity": quantity }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["item"]["current_stock"], quantity);
        item_id
    }

    async fn prescribe(app: &TestApp, doctor: &Staff, refills: u32) -> String {
        let (status, prescription) = app
            .post(
                "/api/prescriptions",
                doctor,
                json!({
                    "patient_id": uuid::Uuid::new_v4(),
                    "medications": [{ "name": "Amoxicillin", "dosage": "500mg", "frequency": "tds" }],
                    "refills_remaining": refills
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(prescription["status"], "active");
        prescription["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_dispense_decrements_stock_and_records_movement() {
        let app = app();
        let doctor = Staff::new(Role::Doctor);
        let pharmacist = Staff::new(Role::Pharmacist);
        let item_id = stocked_item(&app, &pharmacist, 10).await;
        let prescription_id = prescribe(&app, &doctor, 0).await;

        let (status, outcome) = app
            .post(
                &format!("/api/prescriptions/{}/dispense", prescription_id),
                &pharmacist,
                json!({ "type": "fill", "items": [{ "item_id": item_id, "quantity": 4 }] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["prescription"]["status"], "dispensed");

        let (_, item) = app.get(&format!("/api/inventory/items/{}", item_id), &pharmacist).await;
        assert_eq!(item["current_stock"], 6);

        let (_, movements) = app
            .get(&format!("/api/inventory/items/{}/movements", item_id), &pharmacist)
            .await;
        let movements = movements.as_array().unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0]["movement_type"], "OUT");
        assert_eq!(movements[0]["quantity"], 4);

        let (_, fills) = app
            .get(&format!("/api/prescriptions/{}/fills", prescription_id), &pharmacist)
            .await;
        assert_eq!(fills.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_bad_request_and_changes_nothing() {
        let app = app();
        let doctor = Staff::new(Role::Doctor);
        let pharmacist = Staff::new(Role::Pharmacist);
        let item_id = stocked_item(&app, &pharmacist, 3).await;
        let prescription_id = prescribe(&app, &doctor, 0).await;

        let (status, body) = app
            .post(
                &format!("/api/prescriptions/{}/dispense", prescription_id),
                &pharmacist,
                json!({ "items": [{ "item_id": item_id, "quantity": 5 }] }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Insufficient stock"));

        let (_, item) = app.get(&format!("/api/inventory/items/{}", item_id), &pharmacist).await;
        assert_eq!(item["current_stock"], 3);
        let (_, prescription) = app
            .get(&format!("/api/prescriptions/{}", prescription_id), &pharmacist)
            .await;
        assert_eq!(prescription["status"], "active");
    }

    #[tokio::test]
    async fn test_only_pharmacists_dispense() {
        let app = app();
        let doctor = Staff::new(Role::Doctor);
        let prescription_id = prescribe(&app, &doctor, 0).await;

        let (status, _) = app
            .post(
                &format!("/api/prescriptions/{}/dispense", prescription_id),
                &doctor,
                json!({ "type": "fill" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

mod referrals {
    use super::*;

    #[tokio::test]
    async fn test_referral_lifecycle_and_public_verification() {
        let app = app();
        let doctor = Staff::new(Role::Doctor);
        let other_doctor = Staff::new(Role::Doctor);

        let (status, referral) = app
            .post(
                "/api/referrals",
                &doctor,
                json!({
                    "patient_id": uuid::Uuid::new_v4(),
                    "destination_facility": "Lagos University Teaching Hospital",
                    "reason_for_referral": "Cardiology review",
                    "urgency": "urgent"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(referral["status"], "pending");
        let code = referral["referral_code"].as_str().unwrap().to_string();
        let uri = format!("/api/referrals/{}", referral["id"].as_str().unwrap());

        let (status, verification) = app
            .send(Method::GET, &format!("/api/referrals/verify/{}", code), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verification["valid"], true);

        let (status, _) = app.put(&format!("{}/accept", uri), &other_doctor, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, accepted) = app
            .put(
                &format!("{}/accept", uri),
                &doctor,
                Some(json!({ "appointment_date": "2026-11-02T09:00:00Z" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["status"], "accepted");

        let (status, completed) = app
            .put(&format!("{}/complete", uri), &doctor, Some(json!({ "feedback": "Seen" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["status"], "completed");

        let (status, _) = app.put(&format!("{}/cancel", uri), &doctor, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, verification) = app
            .send(Method::GET, &format!("/api/referrals/verify/{}", code), None, None)
            .await;
        assert_eq!(verification["valid"], false);
        assert_eq!(verification["referral"]["status"], "completed");
    }

    #[tokio::test]
    async fn test_nurses_cannot_refer() {
        let app = app();
        let nurse = Staff::new(Role::Nurse);
        let (status, _) = app
            .post(
                "/api/referrals",
                &nurse,
                json!({ "patient_id": uuid::Uuid::new_v4(), "destination_facility": "X", "reason_for_referral": "Y" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

mod redaction {
    use axum::response::IntoResponse;
    use interface_api::error::{ApiError, REDACTED_MESSAGE};
    use interface_api::middleware::redact_internal_errors;

    use super::*;

    #[tokio::test]
    async fn test_internal_errors_are_redacted() {
        let response = ApiError::Internal("connection refused at 10.0.0.5".to_string()).into_response();
        let response = redact_internal_errors(response).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], REDACTED_MESSAGE);
    }

    #[tokio::test]
    async fn test_client_errors_pass_through() {
        let response = ApiError::NotFound("Claim not found: x".to_string()).into_response();
        let response = redact_internal_errors(response).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
