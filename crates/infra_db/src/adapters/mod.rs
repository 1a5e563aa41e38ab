//! Domain Adapters
//!
//! Each adapter implements one domain port against PostgreSQL. Row structs
//! derive `sqlx::FromRow` and convert into domain types with `TryFrom`,
//! reporting undecodable values as `PortError::Transformation`.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresPharmacyAdapter;
//! use domain_pharmacy::PharmacyPort;
//! use std::sync::Arc;
//!
//! let port: Arc<dyn PharmacyPort> = Arc::new(PostgresPharmacyAdapter::new(pool));
//! ```

pub mod patient;
pub mod hmo;
pub mod claims;
pub mod pharmacy;
pub mod referral;
pub mod health;

pub use patient::PostgresPatientAdapter;
pub use hmo::PostgresHmoAdapter;
pub use claims::PostgresClaimsAdapter;
pub use pharmacy::PostgresPharmacyAdapter;
pub use referral::PostgresReferralAdapter;
pub use health::PostgresHealthCheck;
