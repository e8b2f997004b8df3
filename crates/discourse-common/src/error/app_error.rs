//! Application error types
//!
//! Unified error handling for the presence subsystem. Errors carry a
//! classification that drives the propagation policy: fetch-style failures
//! are surfaced to the view as an explicit error state, while presence and
//! sign-out write failures are logged and absorbed because the store-side
//! disconnect fallback converges the record regardless.

use discourse_core::DomainError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session token expired")]
    TokenExpired,

    #[error("Sign-out failed: {0}")]
    SignOut(String),

    // Presence errors
    #[error("Presence write failed: {0}")]
    PresenceWrite(String),

    // Group directory errors
    #[error("Group directory error: {0}")]
    Directory(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AppError {
    /// Get an error code for logs and reporting
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::SignOut(_) => "SIGN_OUT_FAILED",
            Self::PresenceWrite(_) => "PRESENCE_WRITE_FAILED",
            Self::Directory(_) => "DIRECTORY_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Whether the failure must reach the view as an explicit error state.
    ///
    /// Presence and sign-out write failures return `false`: they are logged
    /// and absorbed, with the lease fallback as the safety net. Everything
    /// the user initiated and is waiting on returns `true`.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::SignOut(_) | Self::PresenceWrite(_))
    }

    /// Create a presence write error
    #[must_use]
    pub fn presence_write(msg: impl std::fmt::Display) -> Self {
        Self::PresenceWrite(msg.to_string())
    }

    /// Create a group directory error
    #[must_use]
    pub fn directory(msg: impl std::fmt::Display) -> Self {
        Self::Directory(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
