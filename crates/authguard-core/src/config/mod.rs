//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod lockout;
pub mod logging;
pub mod revocation;

use serde::{Deserialize, Serialize};

pub use self::lockout::LockoutConfig;
pub use self::logging::LoggingConfig;
pub use self::revocation::RevocationConfig;

use crate::error::AppError;

/// Root security configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay) and `AUTHGUARD__*`
/// environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Login attempt lockout policy.
    #[serde(default)]
    pub lockout: LockoutConfig,
    /// Password reset lockout policy.
    #[serde(default)]
    pub password_reset: LockoutConfig,
    /// Revoked token denylist settings.
    #[serde(default)]
    pub revocation: RevocationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SecurityConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `AUTHGUARD__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AUTHGUARD")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml));
        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config = builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject policies that would never lock out or never sweep.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_lockout("lockout", &self.lockout)?;
        validate_lockout("password_reset", &self.password_reset)?;

        if self.revocation.cleanup_interval_seconds == 0 {
            return Err(AppError::configuration(
                "revocation.cleanup_interval_seconds must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn validate_lockout(section: &str, config: &LockoutConfig) -> Result<(), AppError> {
    if config.max_failed_attempts == 0 {
        return Err(AppError::configuration(format!(
            "{section}.max_failed_attempts must be greater than zero"
        )));
    }
    if config.initial_lockout_seconds == 0 {
        return Err(AppError::configuration(format!(
            "{section}.initial_lockout_seconds must be greater than zero"
        )));
    }
    if config.cleanup_interval_seconds == 0 {
        return Err(AppError::configuration(format!(
            "{section}.cleanup_interval_seconds must be greater than zero"
        )));
    }
    Ok(())
}
