//! Test fixtures
//!
//! A single in-memory store implementing both ports, with the switches the
//! flow tests need: lease expiry driven by `tokio::time` (works under
//! `start_paused`) and on-demand group-store failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use discourse_core::{
    DomainError, GroupStore, GroupSummary, PresenceStore, Snowflake, StoreResult, UserPresence,
};
use parking_lot::Mutex;
use tokio::time::Instant;

/// In-memory realization of the presence and group store ports
#[derive(Default)]
pub struct MemoryStore {
    presence: Mutex<PresenceState>,
    groups: Mutex<GroupState>,
    fail_group_ops: AtomicBool,
}

#[derive(Default)]
struct PresenceState {
    records: HashMap<Snowflake, UserPresence>,
    leases: HashMap<(Snowflake, String), Instant>,
}

#[derive(Default)]
struct GroupState {
    records: HashMap<Snowflake, GroupSummary>,
    open: HashMap<Snowflake, Snowflake>,
    last_open: HashMap<(Snowflake, Snowflake), DateTime<Utc>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle failure injection for every group-store operation
    pub fn fail_group_ops(&self, failing: bool) {
        self.fail_group_ops.store(failing, Ordering::SeqCst);
    }

    /// Force all of a user's leases to count as lapsed, as if the clients
    /// vanished and their TTLs ran out
    pub fn lapse_user_leases(&self, user_id: Snowflake) {
        let now = Instant::now();
        let mut state = self.presence.lock();
        for ((user, _), deadline) in state.leases.iter_mut() {
            if *user == user_id {
                *deadline = now;
            }
        }
    }

    fn group_guard(&self) -> StoreResult<()> {
        if self.fail_group_ops.load(Ordering::SeqCst) {
            Err(DomainError::StoreError("injected store failure".into()))
        } else {
            Ok(())
        }
    }
}

fn live_leases(state: &PresenceState, user_id: Snowflake, now: Instant) -> u64 {
    state
        .leases
        .iter()
        .filter(|((user, _), deadline)| *user == user_id && **deadline > now)
        .count() as u64
}

fn set_record(state: &mut PresenceState, user_id: Snowflake, online: bool) {
    state
        .records
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
impl PresenceStore for MemoryStore {
    async fn register_connection(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<()> {
        let mut state = self.presence.lock();
        state
            .leases
            .insert((user_id, connection_id.to_string()), Instant::now() + lease);
        set_record(&mut state, user_id, true);
        Ok(())
    }

    async fn renew_lease(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<bool> {
        let now = Instant::now();
        let mut state = self.presence.lock();
        let key = (user_id, connection_id.to_string());
        match state.leases.get_mut(&key) {
            Some(deadline) if *deadline > now => {
                *deadline = now + lease;
                Ok(true)
            }
            Some(_) => {
                state.leases.remove(&key);
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
        let mut state = self.presence.lock();
        state.leases.remove(&(user_id, connection_id.to_string()));

        if live_leases(&state, user_id, now) == 0 {
            set_record(&mut state, user_id, false);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn presence(&self, user_id: Snowflake) -> StoreResult<Option<UserPresence>> {
        Ok(self.presence.lock().records.get(&user_id).cloned())
    }

    async fn live_connections(&self, user_id: Snowflake) -> StoreResult<u64> {
        Ok(live_leases(&self.presence.lock(), user_id, Instant::now()))
    }

    async fn sweep_expired(&self) -> StoreResult<Vec<Snowflake>> {
        let now = Instant::now();
        let mut state = self.presence.lock();

        let lapsed: Vec<(Snowflake, String)> = state
            .leases
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut touched: Vec<Snowflake> = Vec::new();
        for key in &lapsed {
            state.leases.remove(key);
            if !touched.contains(&key.0) {
                touched.push(key.0);
            }
        }

        let mut flipped = Vec::new();
        for user_id in touched {
            let still_online = state.records.get(&user_id).is_some_and(|r| r.is_online);
            if still_online && live_leases(&state, user_id, now) == 0 {
                set_record(&mut state, user_id, false);
                flipped.push(user_id);
            }
        }

        Ok(flipped)
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> StoreResult<Option<GroupSummary>> {
        self.group_guard()?;
        Ok(self.groups.lock().records.get(&id).cloned())
    }

    async fn list_public(&self) -> StoreResult<Vec<GroupSummary>> {
        self.group_guard()?;
        let mut groups: Vec<GroupSummary> = self
            .groups
            .lock()
            .records
            .values()
            .filter(|g| !g.is_private)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn create(&self, group: &GroupSummary) -> StoreResult<()> {
        self.group_guard()?;
        let mut state = self.groups.lock();
        if state.records.contains_key(&group.id) {
            return Err(DomainError::GroupAlreadyExists(group.id));
        }
        state.records.insert(group.id, group.clone());
        Ok(())
    }

    async fn set_open_group(&self, user_id: Snowflake, group_id: Snowflake) -> StoreResult<()> {
        self.group_guard()?;
        self.groups.lock().open.insert(user_id, group_id);
        Ok(())
    }

    async fn open_group(&self, user_id: Snowflake) -> StoreResult<Option<Snowflake>> {
        self.group_guard()?;
        Ok(self.groups.lock().open.get(&user_id).copied())
    }

    async fn set_last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.group_guard()?;
        self.groups
            .lock()
            .last_open
            .insert((user_id, group_id), at);
        Ok(())
    }

    async fn last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        self.group_guard()?;
        Ok(self
            .groups
            .lock()
            .last_open
            .get(&(user_id, group_id))
            .copied())
    }
}
