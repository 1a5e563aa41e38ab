//! Hospital Coverage API - Server Binary
//!
//! Starts the HTTP API server for HMO coverage, claims, pharmacy and
//! referral operations.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin hospital-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... API_LOG_FORMAT=json cargo run --bin hospital-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_LOG_LEVEL` - Log level or filter directive (default: info; `RUST_LOG` wins)
//! * `API_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! * `API_ENVIRONMENT` - `production` hides internal error messages
//! * `API_TIMEZONE` - IANA timezone for "today" (default: Africa/Lagos)

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use infra_db::{create_pool, run_migrations, DatabaseConfig};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("Invalid API configuration")?;

    init_tracing(&config);

    if config.is_production() && config.jwt_secret == ApiConfig::default().jwt_secret {
        anyhow::bail!("API_JWT_SECRET must be set in production");
    }
    let timezone = config.timezone().context("Invalid API_TIMEZONE")?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        environment = %config.environment,
        timezone = %config.timezone,
        "Starting hospital coverage API server"
    );

    let pool = create_pool(
        DatabaseConfig::new(&config.database_url).max_connections(config.database_max_connections),
    )
    .await
    .context("Failed to connect to the database")?;

    run_migrations(&pool)
        .await
        .context("Failed to apply database migrations")?;

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server_addr()))?;

    let app = create_router(AppState::postgres(pool, config, timezone));

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Installs the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `API_LOG_LEVEL`.
fn init_tracing(config: &ApiConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
