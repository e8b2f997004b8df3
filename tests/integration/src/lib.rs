//! Integration test support
//!
//! The workspace's boundary is the store port, so these tests drive the
//! service layer end-to-end over an in-memory store implementation of the
//! ports (see `fixtures`). A separate, environment-guarded suite exercises
//! the Redis adapters against a live instance.

pub mod fixtures;
pub mod helpers;

pub use fixtures::MemoryStore;
pub use helpers::{issue_token, redis_test_url, test_context, unique_user};
