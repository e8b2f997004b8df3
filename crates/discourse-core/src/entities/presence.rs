//! User presence record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A user's online/offline record in the shared presence store.
///
/// One record per user, written only by that user's own sessions or by the
/// store's disconnect sweeper. `last_changed_at` marks the most recent
/// online/offline transition, not the most recent write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresence {
    pub user_id: Snowflake,
    pub is_online: bool,
    pub last_changed_at: DateTime<Utc>,
}

impl UserPresence {
    /// Create a fresh online record
    #[must_use]
    pub fn online(user_id: Snowflake) -> Self {
        Self {
            user_id,
            is_online: true,
            last_changed_at: Utc::now(),
        }
    }

    /// Create a fresh offline record
    #[must_use]
    pub fn offline(user_id: Snowflake) -> Self {
        Self {
            user_id,
            is_online: false,
            last_changed_at: Utc::now(),
        }
    }

    /// Apply an online/offline transition, stamping the change time only
    /// when the value actually flips
    pub fn set_online(&mut self, online: bool) {
        if self.is_online != online {
            self.is_online = online;
            self.last_changed_at = Utc::now();
        }
    }
}
