//! Session controller
//!
//! Owns the lifecycle of authenticated sessions. Sessions are explicit
//! context objects created at sign-in and destroyed at sign-out; every
//! service that needs the signed-in user receives the handle rather than
//! reading ambient state.
//!
//! Sign-out is sequenced: the presence offline write is awaited under a
//! bounded timeout, then local session state is cleared, then the landing
//! route is returned. The offline write stays best-effort - the connection
//! lease is the authoritative disconnect mechanism.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use discourse_core::{Route, Session, Snowflake};
use uuid::Uuid;

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::presence::PresenceClient;

/// A live session: the session context plus its presence client and the
/// liveness epoch that guards late async results
pub struct SessionHandle {
    id: String,
    session: Session,
    presence: PresenceClient,
    epoch: AtomicU64,
}

impl SessionHandle {
    /// Session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session context
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The presence client owned by this session
    pub fn presence(&self) -> &PresenceClient {
        &self.presence
    }

    /// Current liveness epoch. Async results captured against an older
    /// epoch must be dropped instead of applied.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("user_id", &self.session.user_id)
            .finish_non_exhaustive()
    }
}

/// Manages all live sessions
///
/// Multiple simultaneous sessions per user (several devices) are supported;
/// each owns its own presence connection, and the user goes offline only
/// when the last one ends.
pub struct SessionController {
    ctx: ServiceContext,
    sessions: DashMap<String, Arc<SessionHandle>>,
    user_sessions: DashMap<Snowflake, HashSet<String>>,
}

impl SessionController {
    /// Create a new controller
    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            sessions: DashMap::new(),
            user_sessions: DashMap::new(),
        }
    }

    /// Establish a session from a verified auth token
    ///
    /// # Errors
    /// Returns an error when the token is invalid or expired
    pub fn sign_in(&self, token: &str) -> ServiceResult<Arc<SessionHandle>> {
        let claims = self.ctx.session_tokens().verify(token)?;
        let user_id = claims.user_id()?;

        let session = Session::new(user_id, claims.name, claims.picture, token);
        let presence = PresenceClient::new(
            user_id,
            Arc::clone(self.ctx.presence_store()),
            self.ctx.presence_config().heartbeat_interval(),
            self.ctx.presence_config().connection_ttl(),
        );

        let handle = Arc::new(SessionHandle {
            id: Uuid::new_v4().to_string(),
            session,
            presence,
            epoch: AtomicU64::new(0),
        });

        self.sessions.insert(handle.id.clone(), Arc::clone(&handle));
        self.user_sessions
            .entry(user_id)
            .or_default()
            .insert(handle.id.clone());

        tracing::info!(
            session_id = %handle.id,
            user_id = %user_id,
            "Session established"
        );

        Ok(handle)
    }

    /// Terminate a session.
    ///
    /// Sequencing: (1) attempt the presence offline write, bounded by the
    /// configured timeout; (2) clear local session state; (3) return the
    /// landing route. Never fails from the caller's perspective - an
    /// unknown session ID is logged and still yields the landing route.
    pub async fn sign_out(&self, session_id: &str) -> Route {
        let Some(handle) = self.sessions.get(session_id).map(|r| Arc::clone(r.value())) else {
            tracing::warn!(session_id = %session_id, "Sign-out for unknown session");
            return Route::Landing;
        };

        // 1. The offline write, with the lease fallback as the safety net
        let offline = handle.presence().mark_offline();
        if tokio::time::timeout(self.ctx.sign_out_timeout(), offline)
            .await
            .is_err()
        {
            tracing::warn!(
                session_id = %session_id,
                "Offline write timed out; lease lapse will converge the record"
            );
        }

        // 2. Clear local session state; in-flight results become stale
        handle.invalidate();
        self.sessions.remove(session_id);
        let user_id = handle.session().user_id;
        self.user_sessions.alter(&user_id, |_, mut sessions| {
            sessions.remove(session_id);
            sessions
        });
        self.user_sessions.retain(|_, sessions| !sessions.is_empty());

        tracing::info!(
            session_id = %session_id,
            user_id = %user_id,
            "Session terminated"
        );

        // 3. Hand the view its destination
        Route::Landing
    }

    /// Get a session by ID
    pub fn session(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_id).map(|r| Arc::clone(r.value()))
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of live sessions for a user
    pub fn user_session_count(&self, user_id: Snowflake) -> usize {
        self.user_sessions
            .get(&user_id)
            .map_or(0, |sessions| sessions.len())
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("sessions", &self.sessions.len())
            .field("users", &self.user_sessions.len())
            .finish()
    }
}
