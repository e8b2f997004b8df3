//! # discourse-common
//!
//! Shared utilities including configuration, error handling, session-token
//! verification, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{SessionClaims, SessionTokenService};
pub use config::{
    AppConfig, AppSettings, ConfigError, Environment, PresenceConfig, RedisConfig, SessionConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
