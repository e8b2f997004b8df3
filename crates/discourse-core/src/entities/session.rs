//! Session entity - an authenticated user's context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// An authenticated session, created at sign-in and destroyed at sign-out.
///
/// Passed explicitly to the services that need it; there is no ambient
/// "current user" state. A user's presence may only be online while one of
/// their sessions exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Snowflake,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub auth_token: String,
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(
        user_id: Snowflake,
        display_name: impl Into<String>,
        photo_url: Option<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            photo_url,
            auth_token: auth_token.into(),
            started_at: Utc::now(),
        }
    }
}
