//! Store ports - define the interface to the shared real-time store
//!
//! The domain layer defines what it needs from the store; the adapter layer
//! provides the implementation. Presence is tracked per connection: each
//! live client session registers its own leased connection, and the store
//! converges the user offline when the last lease is released or lapses.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{GroupSummary, UserPresence};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for store operations
pub type StoreResult<T> = Result<T, DomainError>;

// ============================================================================
// Presence Store
// ============================================================================

/// Per-user presence with connection-scoped disconnect detection.
///
/// `register_connection` both marks the user online and installs the
/// store-side fallback: a lease that, once lapsed, lets `sweep_expired`
/// apply the offline write without any further client action.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Register a live connection for the user and mark them online.
    ///
    /// Idempotent for the same `(user_id, connection_id)` pair.
    async fn register_connection(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<()>;

    /// Renew a connection's lease.
    ///
    /// Returns `false` when the lease no longer exists (already swept or
    /// released) - the caller's connection instance is then dead.
    async fn renew_lease(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<bool>;

    /// Release a connection explicitly (graceful disconnect).
    ///
    /// Returns `true` when this was the user's last live connection and the
    /// record was flipped offline.
    async fn release_connection(
        &self,
        user_id: Snowflake,
        connection_id: &str,
    ) -> StoreResult<bool>;

    /// Read the user's presence record
    async fn presence(&self, user_id: Snowflake) -> StoreResult<Option<UserPresence>>;

    /// Count the user's live connections
    async fn live_connections(&self, user_id: Snowflake) -> StoreResult<u64>;

    /// Store-side disconnect detector: drop lapsed leases and converge
    /// users with no remaining connection to offline.
    ///
    /// Returns the users flipped offline by this sweep.
    async fn sweep_expired(&self) -> StoreResult<Vec<Snowflake>>;
}

// ============================================================================
// Group Store
// ============================================================================

/// Group records plus per-user open/last-opened bookkeeping
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Find a group by ID
    async fn find_by_id(&self, id: Snowflake) -> StoreResult<Option<GroupSummary>>;

    /// List all public groups. An empty listing is not a failure.
    async fn list_public(&self) -> StoreResult<Vec<GroupSummary>>;

    /// Persist a new group
    async fn create(&self, group: &GroupSummary) -> StoreResult<()>;

    /// Record the group a user currently has open
    async fn set_open_group(&self, user_id: Snowflake, group_id: Snowflake) -> StoreResult<()>;

    /// Read the group a user currently has open
    async fn open_group(&self, user_id: Snowflake) -> StoreResult<Option<Snowflake>>;

    /// Record when a user last opened a group
    async fn set_last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Read when a user last opened a group
    async fn last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
    ) -> StoreResult<Option<DateTime<Utc>>>;
}
