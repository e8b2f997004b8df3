//! In-memory store doubles for unit tests.
//!
//! Leases are tracked as `tokio::time::Instant` deadlines so tests running
//! under `start_paused` can drive expiry with `tokio::time::advance`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use discourse_common::SessionTokenService;
use discourse_core::{
    DomainError, GroupStore, GroupSummary, PresenceStore, Snowflake, StoreResult, UserPresence,
};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::context::ServiceContext;

// ============================================================================
// Presence store double
// ============================================================================

pub(crate) struct MemoryPresenceStore {
    inner: Mutex<PresenceInner>,
    fail_register: AtomicBool,
}

#[derive(Default)]
struct PresenceInner {
    records: HashMap<Snowflake, UserPresence>,
    leases: HashMap<(Snowflake, String), Instant>,
}

impl MemoryPresenceStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(PresenceInner::default()),
            fail_register: AtomicBool::new(false),
        }
    }

    /// Make the next `register_connection` fail
    pub(crate) fn fail_next_register(&self) {
        self.fail_register.store(true, Ordering::SeqCst);
    }

    /// Force every lease the user holds to count as lapsed
    pub(crate) fn expire_user_leases(&self, user_id: Snowflake) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        for ((user, _), deadline) in inner.leases.iter_mut() {
            if *user == user_id {
                *deadline = now;
            }
        }
    }
}

fn live_count(inner: &PresenceInner, user_id: Snowflake, now: Instant) -> u64 {
    inner
        .leases
        .iter()
        .filter(|((user, _), deadline)| *user == user_id && **deadline > now)
        .count() as u64
}

fn flip(records: &mut HashMap<Snowflake, UserPresence>, user_id: Snowflake, online: bool) {
    records
        .entry(user_id)
        .and_modify(|r| r.set_online(online))
        .or_insert_with(|| {
            if online {
                UserPresence::online(user_id)
            } else {
                UserPresence::offline(user_id)
            }
        });
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn register_connection(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<()> {
        if self.fail_register.swap(false, Ordering::SeqCst) {
            return Err(DomainError::StoreError("injected register failure".into()));
        }

        let mut inner = self.inner.lock();
        inner
            .leases
            .insert((user_id, connection_id.to_string()), Instant::now() + lease);
        flip(&mut inner.records, user_id, true);
        Ok(())
    }

    async fn renew_lease(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let key = (user_id, connection_id.to_string());
        match inner.leases.get_mut(&key) {
            Some(deadline) if *deadline > now => {
                *deadline = now + lease;
                Ok(true)
            }
            Some(_) => {
                inner.leases.remove(&key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn release_connection(
        &self,
        user_id: Snowflake,
        connection_id: &str,
    ) -> StoreResult<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.leases.remove(&(user_id, connection_id.to_string()));

        if live_count(&inner, user_id, now) == 0 {
            flip(&mut inner.records, user_id, false);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn presence(&self, user_id: Snowflake) -> StoreResult<Option<UserPresence>> {
        Ok(self.inner.lock().records.get(&user_id).cloned())
    }

    async fn live_connections(&self, user_id: Snowflake) -> StoreResult<u64> {
        Ok(live_count(&self.inner.lock(), user_id, Instant::now()))
    }

    async fn sweep_expired(&self) -> StoreResult<Vec<Snowflake>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired: Vec<(Snowflake, String)> = inner
            .leases
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut affected: Vec<Snowflake> = Vec::new();
        for key in &expired {
            inner.leases.remove(key);
            if !affected.contains(&key.0) {
                affected.push(key.0);
            }
        }

        let mut flipped = Vec::new();
        for user_id in affected {
            if live_count(&inner, user_id, now) == 0 {
                let was_online = inner
                    .records
                    .get(&user_id)
                    .is_some_and(|r| r.is_online);
                if was_online {
                    flip(&mut inner.records, user_id, false);
                    flipped.push(user_id);
                }
            }
        }

        Ok(flipped)
    }
}

// ============================================================================
// Group store doubles
// ============================================================================

pub(crate) struct MemoryGroupStore {
    inner: Mutex<GroupInner>,
}

#[derive(Default)]
struct GroupInner {
    groups: HashMap<Snowflake, GroupSummary>,
    open: HashMap<Snowflake, Snowflake>,
    last_open: HashMap<(Snowflake, Snowflake), DateTime<Utc>>,
}

impl MemoryGroupStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(GroupInner::default()),
        }
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn find_by_id(&self, id: Snowflake) -> StoreResult<Option<GroupSummary>> {
        Ok(self.inner.lock().groups.get(&id).cloned())
    }

    async fn list_public(&self) -> StoreResult<Vec<GroupSummary>> {
        let mut groups: Vec<GroupSummary> = self
            .inner
            .lock()
            .groups
            .values()
            .filter(|g| !g.is_private)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn create(&self, group: &GroupSummary) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.groups.contains_key(&group.id) {
            return Err(DomainError::GroupAlreadyExists(group.id));
        }
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn set_open_group(&self, user_id: Snowflake, group_id: Snowflake) -> StoreResult<()> {
        self.inner.lock().open.insert(user_id, group_id);
        Ok(())
    }

    async fn open_group(&self, user_id: Snowflake) -> StoreResult<Option<Snowflake>> {
        Ok(self.inner.lock().open.get(&user_id).copied())
    }

    async fn set_last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.lock().last_open.insert((user_id, group_id), at);
        Ok(())
    }

    async fn last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .inner
            .lock()
            .last_open
            .get(&(user_id, group_id))
            .copied())
    }
}

/// Group store that fails on demand (failing from the start)
pub(crate) struct FlakyGroupStore {
    inner: MemoryGroupStore,
    failing: AtomicBool,
}

impl FlakyGroupStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryGroupStore::new(),
            failing: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DomainError::StoreError("injected group store failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GroupStore for FlakyGroupStore {
    async fn find_by_id(&self, id: Snowflake) -> StoreResult<Option<GroupSummary>> {
        self.check()?;
        self.inner.find_by_id(id).await
    }

    async fn list_public(&self) -> StoreResult<Vec<GroupSummary>> {
        self.check()?;
        self.inner.list_public().await
    }

    async fn create(&self, group: &GroupSummary) -> StoreResult<()> {
        self.check()?;
        self.inner.create(group).await
    }

    async fn set_open_group(&self, user_id: Snowflake, group_id: Snowflake) -> StoreResult<()> {
        self.check()?;
        self.inner.set_open_group(user_id, group_id).await
    }

    async fn open_group(&self, user_id: Snowflake) -> StoreResult<Option<Snowflake>> {
        self.check()?;
        self.inner.open_group(user_id).await
    }

    async fn set_last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner.set_last_opened(user_id, group_id, at).await
    }

    async fn last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        self.check()?;
        self.inner.last_opened(user_id, group_id).await
    }
}

/// Group store whose listing blocks until released, for racing fetches
/// against session teardown
pub(crate) struct GatedGroupStore {
    inner: MemoryGroupStore,
    gate: tokio::sync::Notify,
}

impl GatedGroupStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryGroupStore::new(),
            gate: tokio::sync::Notify::new(),
        }
    }

    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl GroupStore for GatedGroupStore {
    async fn find_by_id(&self, id: Snowflake) -> StoreResult<Option<GroupSummary>> {
        self.inner.find_by_id(id).await
    }

    async fn list_public(&self) -> StoreResult<Vec<GroupSummary>> {
        self.gate.notified().await;
        self.inner.list_public().await
    }

    async fn create(&self, group: &GroupSummary) -> StoreResult<()> {
        self.inner.create(group).await
    }

    async fn set_open_group(&self, user_id: Snowflake, group_id: Snowflake) -> StoreResult<()> {
        self.inner.set_open_group(user_id, group_id).await
    }

    async fn open_group(&self, user_id: Snowflake) -> StoreResult<Option<Snowflake>> {
        self.inner.open_group(user_id).await
    }

    async fn set_last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.set_last_opened(user_id, group_id, at).await
    }

    async fn last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        self.inner.last_opened(user_id, group_id).await
    }
}

// ============================================================================
// Context helpers
// ============================================================================

pub(crate) struct TestStores {
    pub presence: Arc<MemoryPresenceStore>,
    pub groups: Arc<MemoryGroupStore>,
}

/// Context over fresh in-memory stores
pub(crate) fn test_context() -> (ServiceContext, TestStores) {
    let presence = Arc::new(MemoryPresenceStore::new());
    let groups = Arc::new(MemoryGroupStore::new());

    let ctx = ServiceContext::builder()
        .presence_store(Arc::clone(&presence) as Arc<dyn PresenceStore>)
        .group_store(Arc::clone(&groups) as Arc<dyn GroupStore>)
        .session_tokens(Arc::new(SessionTokenService::new(
            "unit-test-secret-key",
            3600,
        )))
        .build()
        .expect("test context should build");

    (ctx, TestStores { presence, groups })
}

/// Context with a custom group store (failure/race doubles)
pub(crate) fn test_context_with_groups(
    groups: Arc<dyn GroupStore>,
) -> (ServiceContext, Arc<MemoryPresenceStore>) {
    let presence = Arc::new(MemoryPresenceStore::new());

    let ctx = ServiceContext::builder()
        .presence_store(Arc::clone(&presence) as Arc<dyn PresenceStore>)
        .group_store(groups)
        .session_tokens(Arc::new(SessionTokenService::new(
            "unit-test-secret-key",
            3600,
        )))
        .build()
        .expect("test context should build");

    (ctx, presence)
}

/// Issue a signed token for the test user
pub(crate) fn test_token(ctx: &ServiceContext, user: i64, name: &str) -> String {
    ctx.session_tokens()
        .issue(Snowflake::new(user), name, None)
        .expect("token issuance should succeed")
}
