//! Presence storage module
//!
//! Connection-scoped leases plus the sweeper that converges users offline
//! once their last lease lapses.

mod redis_presence;
mod sweeper;

pub use redis_presence::RedisPresenceStore;
pub use sweeper::PresenceSweeper;
