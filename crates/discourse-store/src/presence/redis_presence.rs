//! User presence storage in Redis.
//!
//! Each live client session holds a leased connection key with a TTL that
//! the heartbeat renews. Registering a connection is therefore also the
//! registration of the disconnect fallback: when a client vanishes without
//! releasing, its lease lapses and the sweep flips the user offline with no
//! further client action. A user goes offline only when the *last* of their
//! connections is released or lapses.

use std::time::Duration;

use async_trait::async_trait;
use discourse_core::{DomainError, PresenceStore, Snowflake, StoreResult, UserPresence};
use redis::AsyncCommands;

use crate::pool::{RedisPool, RedisPoolError};

/// Key prefix for user presence records
const PRESENCE_PREFIX: &str = "presence:";
/// Key prefix for a user's connection-ID set
const CONNS_PREFIX: &str = "presence_conns:";
/// Key prefix for per-connection lease keys (TTL-bearing)
const LEASE_PREFIX: &str = "presence_lease:";

/// Redis-backed presence store with per-connection leases
#[derive(Clone)]
pub struct RedisPresenceStore {
    pool: RedisPool,
}

impl RedisPresenceStore {
    /// Create a new presence store
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Generate Redis key for a user's presence record
    fn presence_key(user_id: Snowflake) -> String {
        format!("{PRESENCE_PREFIX}{user_id}")
    }

    /// Generate Redis key for a user's connection set
    fn conns_key(user_id: Snowflake) -> String {
        format!("{CONNS_PREFIX}{user_id}")
    }

    /// Generate Redis key for a connection lease
    fn lease_key(user_id: Snowflake, connection_id: &str) -> String {
        format!("{LEASE_PREFIX}{user_id}:{connection_id}")
    }

    /// Read-modify-write the presence record so `last_changed_at` only moves
    /// on actual transitions
    async fn write_online_state(&self, user_id: Snowflake, online: bool) -> StoreResult<()> {
        let key = Self::presence_key(user_id);
        let record = match self.pool.get_value::<UserPresence>(&key).await? {
            Some(mut record) => {
                record.set_online(online);
                record
            }
            None if online => UserPresence::online(user_id),
            None => UserPresence::offline(user_id),
        };
        self.pool.set(&key, &record, None).await?;
        Ok(())
    }

    /// Drop set members whose lease has lapsed; return the live count
    async fn prune_and_count(
        &self,
        conn: &mut deadpool_redis::Connection,
        user_id: Snowflake,
    ) -> StoreResult<u64> {
        let conns_key = Self::conns_key(user_id);
        let members: Vec<String> = conn
            .smembers(&conns_key)
            .await
            .map_err(RedisPoolError::from)?;

        let mut live = 0u64;
        for member in members {
            let lease_key = Self::lease_key(user_id, &member);
            let exists: bool = conn.exists(&lease_key).await.map_err(RedisPoolError::from)?;
            if exists {
                live += 1;
            } else {
                conn.srem::<_, _, ()>(&conns_key, &member)
                    .await
                    .map_err(RedisPoolError::from)?;
            }
        }
        Ok(live)
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn register_connection(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;

        conn.sadd::<_, _, ()>(Self::conns_key(user_id), connection_id)
            .await
            .map_err(RedisPoolError::from)?;
        conn.set_ex::<_, _, ()>(
            Self::lease_key(user_id, connection_id),
            1,
            lease.as_secs().max(1),
        )
        .await
        .map_err(RedisPoolError::from)?;
        drop(conn);

        self.write_online_state(user_id, true).await?;

        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            lease_secs = lease.as_secs(),
            "Connection registered, user online"
        );

        Ok(())
    }

    async fn renew_lease(
        &self,
        user_id: Snowflake,
        connection_id: &str,
        lease: Duration,
    ) -> StoreResult<bool> {
        let renewed = self
            .pool
            .expire(
                &Self::lease_key(user_id, connection_id),
                lease.as_secs().max(1),
            )
            .await?;

        if !renewed {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Lease renewal found no lease"
            );
        }

        Ok(renewed)
    }

    async fn release_connection(
        &self,
        user_id: Snowflake,
        connection_id: &str,
    ) -> StoreResult<bool> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;

        conn.del::<_, ()>(Self::lease_key(user_id, connection_id))
            .await
            .map_err(RedisPoolError::from)?;
        conn.srem::<_, _, ()>(Self::conns_key(user_id), connection_id)
            .await
            .map_err(RedisPoolError::from)?;

        let remaining = self.prune_and_count(&mut conn, user_id).await?;
        drop(conn);

        if remaining == 0 {
            self.write_online_state(user_id, false).await?;
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Last connection released, user offline"
            );
            Ok(true)
        } else {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                remaining = remaining,
                "Connection released, user still online elsewhere"
            );
            Ok(false)
        }
    }

    async fn presence(&self, user_id: Snowflake) -> StoreResult<Option<UserPresence>> {
        let record = self
            .pool
            .get_value(&Self::presence_key(user_id))
            .await?;
        Ok(record)
    }

    async fn live_connections(&self, user_id: Snowflake) -> StoreResult<u64> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;
        self.prune_and_count(&mut conn, user_id).await
    }

    async fn sweep_expired(&self) -> StoreResult<Vec<Snowflake>> {
        let pattern = format!("{CONNS_PREFIX}*");
        let keys = self.pool.scan_keys(&pattern, 100).await?;

        let mut flipped = Vec::new();
        for key in keys {
            let Some(id_str) = key.strip_prefix(CONNS_PREFIX) else {
                continue;
            };
            let Ok(user_id) = id_str.parse::<Snowflake>() else {
                continue;
            };

            let mut conn = self.pool.get().await.map_err(DomainError::from)?;
            let live = self.prune_and_count(&mut conn, user_id).await?;
            if live > 0 {
                continue;
            }
            conn.del::<_, ()>(Self::conns_key(user_id))
                .await
                .map_err(RedisPoolError::from)?;
            drop(conn);

            let presence_key = Self::presence_key(user_id);
            if let Some(mut record) = self.pool.get_value::<UserPresence>(&presence_key).await? {
                if record.is_online {
                    record.set_online(false);
                    self.pool.set(&presence_key, &record, None).await?;
                    flipped.push(user_id);
                }
            }
        }

        Ok(flipped)
    }
}
