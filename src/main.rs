//! AuthGuard Server: lockout and token revocation host process
//!
//! Loads configuration, builds the security services, runs their sweepers,
//! and stops them cleanly on shutdown.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use authguard_auth::SecurityServices;
use authguard_core::config::SecurityConfig;
use authguard_core::error::AppError;
use authguard_core::traits::SystemClock;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<SecurityConfig, AppError> {
    let env = std::env::var("AUTHGUARD_ENV").unwrap_or_else(|_| "development".to_string());
    SecurityConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &SecurityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Start the sweepers and wait for a shutdown signal
async fn run(config: SecurityConfig) -> Result<(), AppError> {
    tracing::info!("Starting AuthGuard v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        max_failed_attempts = config.lockout.max_failed_attempts,
        initial_lockout_seconds = config.lockout.initial_lockout_seconds,
        reset_max_failed_attempts = config.password_reset.max_failed_attempts,
        "Lockout policy loaded"
    );

    let services = SecurityServices::new(&config, Arc::new(SystemClock));
    services.start()?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {}", e)))?;

    tracing::info!("Shutdown signal received");
    services.shutdown();

    tracing::info!("AuthGuard stopped");
    Ok(())
}
