//! Datastore readiness check

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::warn;

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};

const ADAPTER_ID: &str = "postgres";

/// Latency above which a responsive database is reported as degraded
const DEGRADED_LATENCY_MS: u64 = 1_000;

/// Checks that the pool can reach PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresHealthCheck {
    pool: PgPool,
}

impl PostgresHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheckable for PostgresHealthCheck {
    /// Performs a `SELECT 1` round trip
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) if latency_ms > DEGRADED_LATENCY_MS => {
                (AdapterHealth::Degraded, Some(format!("Slow response: {}ms", latency_ms)))
            }
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e)))
            }
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}
