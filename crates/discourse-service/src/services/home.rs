//! Home flow
//!
//! The session-established control flow behind the home screen, expressed
//! as explicit service calls instead of render-time side effects: presence
//! registration and the public-group fetch run concurrently, the fetch
//! lands in an explicit state the view can render (including failure), and
//! results that arrive after the session is torn down are dropped.

use std::sync::Arc;

use discourse_core::{GroupSummary, Route, Session, Snowflake};

use super::context::ServiceContext;
use super::directory::GroupDirectory;
use super::error::ServiceResult;
use super::session::SessionHandle;

/// State of the public-group fetch, as rendered by the view.
///
/// A failed fetch always lands in `Failed`; the flow never leaves the view
/// stuck in `Loading` once the store has answered.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupFetchState {
    /// Fetch not yet answered
    Loading,
    /// Fetch succeeded
    Loaded(Vec<GroupSummary>),
    /// Fetch failed; the message is render-ready and the fetch retryable
    Failed(String),
}

impl GroupFetchState {
    /// Whether the fetch has not resolved yet
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the fetch resolved successfully
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Whether the fetch resolved with an error
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-session orchestrator for the home screen
pub struct HomeFlow {
    ctx: ServiceContext,
    handle: Arc<SessionHandle>,
    fetch_state: parking_lot::RwLock<GroupFetchState>,
}

impl HomeFlow {
    /// Create the flow for a live session
    #[must_use]
    pub fn new(ctx: ServiceContext, handle: Arc<SessionHandle>) -> Self {
        Self {
            ctx,
            handle,
            fetch_state: parking_lot::RwLock::new(GroupFetchState::Loading),
        }
    }

    /// The session this flow serves
    pub fn session(&self) -> &Session {
        self.handle.session()
    }

    /// Snapshot of the current fetch state for the view
    pub fn fetch_state(&self) -> GroupFetchState {
        self.fetch_state.read().clone()
    }

    /// Run the session-established effects: presence registration and the
    /// public-group fetch, concurrently and with no ordering dependency.
    ///
    /// A presence registration failure is logged and does not abort the
    /// fetch; the next `establish` or the lease fallback covers it.
    pub async fn establish(&self) {
        let epoch = self.handle.epoch();

        let presence = async {
            if let Err(e) = self.handle.presence().mark_online().await {
                tracing::warn!(
                    user_id = %self.handle.session().user_id,
                    error = %e,
                    "Presence registration failed"
                );
            }
        };

        tokio::join!(presence, self.apply_fetch(epoch));
    }

    /// Re-run the public-group fetch after a failure
    pub async fn retry_fetch(&self) {
        *self.fetch_state.write() = GroupFetchState::Loading;
        self.apply_fetch(self.handle.epoch()).await;
    }

    /// Fetch the listing and apply the result - unless the session epoch
    /// moved while the fetch was in flight, in which case the result
    /// belongs to a torn-down view and is dropped.
    async fn apply_fetch(&self, epoch: u64) {
        let user_id = self.handle.session().user_id;
        let directory = GroupDirectory::new(&self.ctx);
        let result = directory.list_public_groups(user_id).await;

        if self.handle.epoch() != epoch {
            tracing::debug!(
                user_id = %user_id,
                "Dropping group fetch result for a stale session"
            );
            return;
        }

        *self.fetch_state.write() = match result {
            Ok(groups) => GroupFetchState::Loaded(groups),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Public group fetch failed");
                GroupFetchState::Failed(e.to_string())
            }
        };
    }

    /// Open a group from the listing
    pub async fn open_group(&self, group_id: Snowflake) -> Route {
        let user_id = self.handle.session().user_id;
        GroupDirectory::new(&self.ctx)
            .open_group(user_id, group_id)
            .await
    }

    /// Create a new public group and open it
    ///
    /// # Errors
    /// Returns an error when the group cannot be created
    pub async fn create_group(&self) -> ServiceResult<Route> {
        let user_id = self.handle.session().user_id;
        GroupDirectory::new(&self.ctx)
            .create_and_open_group(user_id, vec![], false)
            .await
    }
}

impl std::fmt::Debug for HomeFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeFlow")
            .field("user_id", &self.handle.session().user_id)
            .field("fetch_state", &*self.fetch_state.read())
            .finish()
    }
}
