//! Group storage module

mod redis_groups;

pub use redis_groups::RedisGroupStore;
