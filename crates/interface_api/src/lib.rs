//! HTTP API Layer
//!
//! REST API for the hospital's HMO coverage, claims, pharmacy and referral
//! services, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: thin adapters from HTTP onto the domain services
//! - **Middleware**: bearer authentication, audit logging, error redaction
//! - **DTOs**: query strings and transition bodies
//! - **Error Handling**: every domain error maps onto one [`error::ApiError`]
//!
//! Every `/api` route requires a bearer token except the public referral
//! verification lookup. Role and ownership checks live in the domain
//! services, which receive the caller as a `core_kernel::Principal`.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::postgres(pool, config, timezone);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{HealthCheckable, Timezone};
use domain_claims::{ClaimsPort, ClaimsService};
use domain_hmo::{CoverageResolver, HmoAdminService, HmoPort};
use domain_patient::{PatientPort, PatientService};
use domain_pharmacy::{PharmacyPort, PharmacyService};
use domain_referral::{ReferralPort, ReferralService};
use infra_db::{
    PostgresClaimsAdapter, PostgresHealthCheck, PostgresHmoAdapter, PostgresPatientAdapter,
    PostgresPharmacyAdapter, PostgresReferralAdapter,
};

use crate::config::ApiConfig;
use crate::handlers::{claims, health, hmo, patients, pharmacy, referrals};
use crate::middleware::{audit_middleware, auth_middleware, redact_internal_errors};

/// The datastore ports the services run against
pub struct Ports {
    pub patients: Arc<dyn PatientPort>,
    pub hmo: Arc<dyn HmoPort>,
    pub claims: Arc<dyn ClaimsPort>,
    pub pharmacy: Arc<dyn PharmacyPort>,
    pub referrals: Arc<dyn ReferralPort>,
    pub datastore: Arc<dyn HealthCheckable>,
}

impl Ports {
    /// PostgreSQL adapters sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            patients: Arc::new(PostgresPatientAdapter::new(pool.clone())),
            hmo: Arc::new(PostgresHmoAdapter::new(pool.clone())),
            claims: Arc::new(PostgresClaimsAdapter::new(pool.clone())),
            pharmacy: Arc::new(PostgresPharmacyAdapter::new(pool.clone())),
            referrals: Arc::new(PostgresReferralAdapter::new(pool.clone())),
            datastore: Arc::new(PostgresHealthCheck::new(pool)),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub patients: PatientService,
    pub hmo_admin: HmoAdminService,
    pub coverage: CoverageResolver,
    pub claims: ClaimsService,
    pub pharmacy: PharmacyService,
    pub referrals: ReferralService,
    pub datastore: Arc<dyn HealthCheckable>,
}

impl AppState {
    /// Wires the domain services onto `ports`
    pub fn new(config: ApiConfig, timezone: Timezone, ports: Ports) -> Self {
        Self {
            config,
            patients: PatientService::new(ports.patients.clone(), timezone),
            hmo_admin: HmoAdminService::new(ports.hmo.clone(), ports.patients.clone()),
            coverage: CoverageResolver::new(ports.patients.clone(), ports.hmo.clone(), timezone),
            claims: ClaimsService::new(ports.claims, ports.hmo, ports.patients, timezone),
            pharmacy: PharmacyService::new(ports.pharmacy),
            referrals: ReferralService::new(ports.referrals),
            datastore: ports.datastore,
        }
    }

    pub fn postgres(pool: PgPool, config: ApiConfig, timezone: Timezone) -> Self {
        Self::new(config, timezone, Ports::postgres(pool))
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/referrals/verify/:code", get(referrals::verify_referral));

    let patient_routes = Router::new()
        .route("/", post(patients::register_patient).get(patients::search_patients))
        .route("/:id", get(patients::get_patient))
        .route("/:id/hmo", put(patients::enroll_patient));

    let hmo_routes = Router::new()
        .route("/providers", post(hmo::create_provider).get(hmo::list_providers))
        .route(
            "/providers/:id",
            get(hmo::get_provider)
                .put(hmo::update_provider)
                .delete(hmo::deactivate_provider),
        )
        .route("/providers/:id/packages", post(hmo::create_package).get(hmo::list_packages))
        .route("/service-codes", post(hmo::create_service_code).get(hmo::list_service_codes))
        .route("/tariffs", post(hmo::create_tariff).get(hmo::list_tariffs))
        .route("/eligibility/:patient_id", get(hmo::check_eligibility))
        .route("/check-coverage", post(hmo::check_coverage));

    let claims_routes = Router::new()
        .route("/", post(claims::create_claim).get(claims::list_claims))
        .route("/statistics", get(claims::claim_statistics))
        .route("/:id", get(claims::get_claim))
        .route("/:id/submit", put(claims::submit_claim))
        .route("/:id/approve", put(claims::approve_claim))
        .route("/:id/reject", put(claims::reject_claim))
        .route("/:id/paid", put(claims::mark_claim_paid));

    let prescription_routes = Router::new()
        .route("/", post(pharmacy::create_prescription).get(pharmacy::list_prescriptions))
        .route("/:id", get(pharmacy::get_prescription))
        .route("/:id/fills", get(pharmacy::list_fills))
        .route("/:id/dispense", post(pharmacy::dispense));

    let inventory_routes = Router::new()
        .route("/items", post(pharmacy::create_item))
        .route("/items/:id", get(pharmacy::get_item))
        .route("/items/:id/receive", post(pharmacy::receive_stock))
        .route("/items/:id/movements", get(pharmacy::list_movements));

    let referral_routes = Router::new()
        .route("/", post(referrals::create_referral).get(referrals::list_referrals))
        .route("/:id", get(referrals::get_referral))
        .route("/:id/accept", put(referrals::accept_referral))
        .route("/:id/complete", put(referrals::complete_referral))
        .route("/:id/cancel", put(referrals::cancel_referral));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/patients", patient_routes)
        .nest("/hmo", hmo_routes)
        .nest("/claims", claims_routes)
        .nest("/prescriptions", prescription_routes)
        .nest("/inventory", inventory_routes)
        .nest("/referrals", referral_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let production = state.config.is_production();

    let router = Router::new()
        .merge(public_routes)
        .nest("/api", api_routes)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let router = if production {
        router.layer(axum_middleware::map_response(redact_internal_errors))
    } else {
        router
    };

    router.with_state(state)
}
