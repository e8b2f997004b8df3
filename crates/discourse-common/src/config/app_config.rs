//! Application configuration structs
//!
//! Loads configuration from environment variables with `.env` support.

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub redis: RedisConfig,
    pub presence: PresenceConfig,
    pub session: SessionConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Redis configuration (the shared real-time store)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Presence timing configuration
///
/// The connection lease must outlive at least one missed heartbeat, so
/// `connection_ttl_secs` is validated to exceed `heartbeat_interval_secs`.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_connection_ttl")]
    pub connection_ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            connection_ttl_secs: default_connection_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: i64,
    #[serde(default = "default_sign_out_timeout")]
    pub sign_out_timeout_ms: u64,
}

// Default value functions
fn default_app_name() -> String {
    "discourse".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_connection_ttl() -> u64 {
    90
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_token_expiry() -> i64 {
    86400 // 24 hours
}

fn default_sign_out_timeout() -> u64 {
    2000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or
    /// the presence timing values are inconsistent
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: env::var("REDIS_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_redis_max_connections),
            },
            presence: PresenceConfig {
                heartbeat_interval_secs: env::var("PRESENCE_HEARTBEAT_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_heartbeat_interval),
                connection_ttl_secs: env::var("PRESENCE_CONNECTION_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_connection_ttl),
                sweep_interval_secs: env::var("PRESENCE_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_sweep_interval),
            },
            session: SessionConfig {
                secret: env::var("SESSION_SECRET")
                    .map_err(|_| ConfigError::MissingVar("SESSION_SECRET"))?,
                token_expiry_secs: env::var("SESSION_TOKEN_EXPIRY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_token_expiry),
                sign_out_timeout_ms: env::var("SIGN_OUT_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_sign_out_timeout),
            },
        };

        config.presence.validate()?;
        Ok(config)
    }
}

impl PresenceConfig {
    /// Check the lease/heartbeat relationship
    ///
    /// # Errors
    /// Returns an error when the connection lease would expire before a
    /// single heartbeat interval elapses
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_ttl_secs <= self.heartbeat_interval_secs {
            return Err(ConfigError::InvalidValue(
                "PRESENCE_CONNECTION_TTL_SECS",
                format!(
                    "must exceed heartbeat interval ({}s)",
                    self.heartbeat_interval_secs
                ),
            ));
        }
        Ok(())
    }

    /// Heartbeat interval as a `Duration`
    #[must_use]
    pub fn heartbeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Connection lease as a `Duration`
    #[must_use]
    pub fn connection_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_ttl_secs)
    }

    /// Sweep interval as a `Duration`
    #[must_use]
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

impl SessionConfig {
    /// Sign-out write timeout as a `Duration`
    #[must_use]
    pub fn sign_out_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sign_out_timeout_ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
