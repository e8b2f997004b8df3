//! Presence client
//!
//! Maintains one user's online status against the shared presence store.
//! Each connection instance walks
//! `Disconnected -> Connecting -> Online -> Offline` once; either offline
//! variant is terminal for that instance, and a later `mark_online` mints a
//! fresh connection ID and starts over.
//!
//! Registering a connection also installs the store-side fallback (the
//! connection lease), so a client that dies without calling `mark_offline`
//! still converges to offline once the lease lapses. The heartbeat task
//! only keeps the lease alive; it is not required for correctness of the
//! offline transition.

use std::sync::Arc;
use std::time::Duration;

use discourse_core::{PresenceStore, Snowflake};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::error::ServiceResult;

/// Why a connection ended up offline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectKind {
    /// Client-initiated transition (sign-out)
    Graceful,
    /// The store stopped seeing the connection (lease lost)
    Detected,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been attempted yet
    Disconnected,
    /// Registration with the store is in flight
    Connecting,
    /// Registered and heartbeating
    Online,
    /// This connection instance is over
    Offline(DisconnectKind),
}

impl ConnectionState {
    /// Whether a connection instance is live (registered or registering)
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Online)
    }
}

/// Client-side presence handle for a single user session
#[derive(Clone)]
pub struct PresenceClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    user_id: Snowflake,
    store: Arc<dyn PresenceStore>,
    heartbeat_interval: Duration,
    lease_ttl: Duration,
    state: RwLock<ConnectionState>,
    connection_id: parking_lot::RwLock<Option<String>>,
    heartbeat: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl PresenceClient {
    /// Create a client for the given user
    #[must_use]
    pub fn new(
        user_id: Snowflake,
        store: Arc<dyn PresenceStore>,
        heartbeat_interval: Duration,
        lease_ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                user_id,
                store,
                heartbeat_interval,
                lease_ttl,
                state: RwLock::new(ConnectionState::Disconnected),
                connection_id: parking_lot::RwLock::new(None),
                heartbeat: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// The user this client tracks
    pub fn user_id(&self) -> Snowflake {
        self.inner.user_id
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.inner.state.read().await
    }

    /// The current connection ID, if a connection is live
    pub fn connection_id(&self) -> Option<String> {
        self.inner.connection_id.read().clone()
    }

    /// Mark the user online.
    ///
    /// Registers a fresh connection (and its disconnect lease) with the
    /// store and starts the heartbeat. Idempotent while a connection is
    /// live: calling again during `Connecting` or `Online` has no
    /// additional effect.
    pub async fn mark_online(&self) -> ServiceResult<()> {
        {
            let mut state = self.inner.state.write().await;
            if state.is_live() {
                return Ok(());
            }
            *state = ConnectionState::Connecting;
        }

        let connection_id = Uuid::new_v4().to_string();
        *self.inner.connection_id.write() = Some(connection_id.clone());

        if let Err(e) = self
            .inner
            .store
            .register_connection(self.inner.user_id, &connection_id, self.inner.lease_ttl)
            .await
        {
            let mut state = self.inner.state.write().await;
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Disconnected;
            }
            *self.inner.connection_id.write() = None;
            return Err(e.into());
        }

        let handle = tokio::spawn(heartbeat_loop(Arc::clone(&self.inner), connection_id.clone()));
        if let Some(old) = self.inner.heartbeat.lock().replace(handle) {
            old.abort();
        }

        {
            let mut state = self.inner.state.write().await;
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Online;
            }
        }

        tracing::debug!(
            user_id = %self.inner.user_id,
            connection_id = %connection_id,
            "Presence online"
        );

        Ok(())
    }

    /// Mark the user offline (graceful, client-initiated).
    ///
    /// Stops the heartbeat and attempts the release write. A failed write
    /// is logged and swallowed; the lease lapse converges the record
    /// either way, and sign-out must never be blocked by this path.
    pub async fn mark_offline(&self) {
        if let Some(handle) = self.inner.heartbeat.lock().take() {
            handle.abort();
        }

        {
            let mut state = self.inner.state.write().await;
            if !state.is_live() {
                return;
            }
            *state = ConnectionState::Offline(DisconnectKind::Graceful);
        }

        let connection_id = self.inner.connection_id.write().take();
        let Some(connection_id) = connection_id else {
            return;
        };

        match self
            .inner
            .store
            .release_connection(self.inner.user_id, &connection_id)
            .await
        {
            Ok(went_offline) => {
                tracing::debug!(
                    user_id = %self.inner.user_id,
                    connection_id = %connection_id,
                    went_offline = went_offline,
                    "Presence released"
                );
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %self.inner.user_id,
                    connection_id = %connection_id,
                    error = %e,
                    "Offline write failed; lease lapse will converge the record"
                );
            }
        }
    }
}

impl std::fmt::Debug for PresenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceClient")
            .field("user_id", &self.inner.user_id)
            .field("connection_id", &*self.inner.connection_id.read())
            .finish_non_exhaustive()
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.abort();
        }
    }
}

/// Renew the connection lease until the connection dies.
///
/// A renewal that finds no lease means the store already considers this
/// connection gone; a renewal outage longer than the lease TTL means it is
/// about to. Both flip the client to `Offline(Detected)` - the store-side
/// record converges on its own.
async fn heartbeat_loop(inner: Arc<ClientInner>, connection_id: String) {
    let mut ticker = tokio::time::interval(inner.heartbeat_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; registration just happened
    ticker.tick().await;

    let mut last_renewed = tokio::time::Instant::now();

    loop {
        ticker.tick().await;

        if !(*inner.state.read().await).is_live() {
            break;
        }

        match inner
            .store
            .renew_lease(inner.user_id, &connection_id, inner.lease_ttl)
            .await
        {
            Ok(true) => {
                last_renewed = tokio::time::Instant::now();
            }
            Ok(false) => {
                tracing::warn!(
                    user_id = %inner.user_id,
                    connection_id = %connection_id,
                    "Connection lease gone, disconnect detected"
                );
                detected_offline(&inner).await;
                break;
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %inner.user_id,
                    connection_id = %connection_id,
                    error = %e,
                    "Lease renewal failed"
                );
                if last_renewed.elapsed() >= inner.lease_ttl {
                    detected_offline(&inner).await;
                    break;
                }
            }
        }
    }
}

async fn detected_offline(inner: &ClientInner) {
    let mut state = inner.state.write().await;
    if state.is_live() {
        *state = ConnectionState::Offline(DisconnectKind::Detected);
    }
}
