//! Group records and per-user bookkeeping in Redis.
//!
//! Groups are stored as JSON records with a set index over the public ones.
//! The per-user keys track which group a user currently has open and when
//! they last opened each group.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use discourse_core::{DomainError, GroupStore, GroupSummary, Snowflake, StoreResult};
use redis::AsyncCommands;

use crate::pool::{RedisPool, RedisPoolError};

/// Key prefix for group records
const GROUP_PREFIX: &str = "group:";
/// Key holding the set of public group IDs
const PUBLIC_GROUPS_KEY: &str = "public_groups";
/// Key prefix for the group a user currently has open
const OPEN_GROUP_PREFIX: &str = "open_group:";
/// Key prefix for per-(user, group) last-opened timestamps
const LAST_OPEN_PREFIX: &str = "last_open:";

/// Redis-backed group store
#[derive(Clone)]
pub struct RedisGroupStore {
    pool: RedisPool,
}

impl RedisGroupStore {
    /// Create a new group store
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Generate Redis key for a group record
    fn group_key(group_id: Snowflake) -> String {
        format!("{GROUP_PREFIX}{group_id}")
    }

    /// Generate Redis key for a user's open group
    fn open_group_key(user_id: Snowflake) -> String {
        format!("{OPEN_GROUP_PREFIX}{user_id}")
    }

    /// Generate Redis key for a last-opened timestamp
    fn last_open_key(user_id: Snowflake, group_id: Snowflake) -> String {
        format!("{LAST_OPEN_PREFIX}{user_id}:{group_id}")
    }
}

#[async_trait]
impl GroupStore for RedisGroupStore {
    async fn find_by_id(&self, id: Snowflake) -> StoreResult<Option<GroupSummary>> {
        let group = self.pool.get_value(&Self::group_key(id)).await?;
        Ok(group)
    }

    async fn list_public(&self) -> StoreResult<Vec<GroupSummary>> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;
        let ids: Vec<String> = conn
            .smembers(PUBLIC_GROUPS_KEY)
            .await
            .map_err(RedisPoolError::from)?;
        drop(conn);

        let mut groups = Vec::with_capacity(ids.len());
        for id_str in ids {
            let Ok(id) = id_str.parse::<Snowflake>() else {
                continue;
            };
            match self.find_by_id(id).await? {
                Some(group) => groups.push(group),
                None => {
                    // Stale index entry; the record was removed
                    tracing::debug!(group_id = %id, "Public group index entry has no record");
                }
            }
        }

        Ok(groups)
    }

    async fn create(&self, group: &GroupSummary) -> StoreResult<()> {
        let key = Self::group_key(group.id);
        if self.pool.exists(&key).await? {
            return Err(DomainError::GroupAlreadyExists(group.id));
        }

        self.pool.set(&key, group, None).await?;

        if !group.is_private {
            let mut conn = self.pool.get().await.map_err(DomainError::from)?;
            conn.sadd::<_, _, ()>(PUBLIC_GROUPS_KEY, group.id.to_string())
                .await
                .map_err(RedisPoolError::from)?;
        }

        tracing::debug!(
            group_id = %group.id,
            is_private = group.is_private,
            members = group.member_count(),
            "Group created"
        );

        Ok(())
    }

    async fn set_open_group(&self, user_id: Snowflake, group_id: Snowflake) -> StoreResult<()> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;
        conn.set::<_, _, ()>(Self::open_group_key(user_id), group_id.to_string())
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }

    async fn open_group(&self, user_id: Snowflake) -> StoreResult<Option<Snowflake>> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;
        let value: Option<String> = conn
            .get(Self::open_group_key(user_id))
            .await
            .map_err(RedisPoolError::from)?;

        Ok(value.and_then(|v| v.parse().ok()))
    }

    async fn set_last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;
        conn.set::<_, _, ()>(
            Self::last_open_key(user_id, group_id),
            at.timestamp_millis(),
        )
        .await
        .map_err(RedisPoolError::from)?;
        Ok(())
    }

    async fn last_opened(
        &self,
        user_id: Snowflake,
        group_id: Snowflake,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let mut conn = self.pool.get().await.map_err(DomainError::from)?;
        let value: Option<i64> = conn
            .get(Self::last_open_key(user_id, group_id))
            .await
            .map_err(RedisPoolError::from)?;

        Ok(value.and_then(DateTime::from_timestamp_millis))
    }
}
