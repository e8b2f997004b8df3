//! Group entity - a chat group visible on the home screen

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Group summary as listed on the home screen.
///
/// Read-only from the presence subsystem's perspective; the member set is
/// kept free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: Snowflake,
    pub is_private: bool,
    pub member_ids: Vec<Snowflake>,
    pub created_at: DateTime<Utc>,
}

impl GroupSummary {
    /// Create a new group with no members
    pub fn new(id: Snowflake, is_private: bool) -> Self {
        Self {
            id,
            is_private,
            member_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the initial member list, discarding duplicates
    #[must_use]
    pub fn with_members(mut self, members: impl IntoIterator<Item = Snowflake>) -> Self {
        for member in members {
            self.add_member(member);
        }
        self
    }

    /// Add a member if not already present
    pub fn add_member(&mut self, user_id: Snowflake) {
        if !self.member_ids.contains(&user_id) {
            self.member_ids.push(user_id);
        }
    }

    /// Remove a member
    pub fn remove_member(&mut self, user_id: Snowflake) {
        self.member_ids.retain(|m| *m != user_id);
    }

    /// Check membership
    #[must_use]
    pub fn is_member(&self, user_id: Snowflake) -> bool {
        self.member_ids.contains(&user_id)
    }

    /// Number of members
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}
