//! # discourse-store
//!
//! Adapters over the shared real-time store (Redis), implementing the
//! `discourse-core` store ports.
//!
//! - **Connection pool**: managed Redis pool with deadpool
//! - **Presence**: per-connection TTL leases; a lapsed lease is the
//!   store-side disconnect fallback, applied by the sweeper
//! - **Groups**: group records, the public-group index, and per-user
//!   open/last-opened bookkeeping

pub mod groups;
pub mod pool;
pub mod presence;

// Re-export pool types
pub use pool::{
    create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool,
};

// Re-export store implementations
pub use groups::RedisGroupStore;
pub use presence::{PresenceSweeper, RedisPresenceStore};
