//! Infrastructure Database Layer
//!
//! PostgreSQL implementations of the domain ports, built on SQLx.
//!
//! # Architecture
//!
//! Each domain crate defines a port trait; the adapters in [`adapters`]
//! implement them against the schema in the workspace `migrations/`
//! directory. Structured values (package service lists, medications, fill
//! items, emergency contacts) live in TEXT columns as JSON documents and
//! are decoded into domain types at this boundary.
//!
//! Multi-row writes run in a single transaction. Dispensing and stock
//! receipt take `SELECT ... FOR UPDATE` row locks, always in the order
//! prescription, then inventory items by id, then batches by id.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimsAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/hospital")).await?;
//! run_migrations(&pool).await?;
//! let claims = PostgresClaimsAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::{
    PostgresPatientAdapter, PostgresHmoAdapter, PostgresClaimsAdapter, PostgresPharmacyAdapter,
    PostgresReferralAdapter, PostgresHealthCheck,
};
