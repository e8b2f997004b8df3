//! Test helpers

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use discourse_common::SessionTokenService;
use discourse_core::{GroupStore, PresenceStore, Snowflake};
use discourse_service::{ServiceContext, ServiceContextBuilder};

use crate::fixtures::MemoryStore;

/// Secret shared by every test token
const TEST_SECRET: &str = "integration-test-secret-key";

/// Counter for unique test users
static USER_COUNTER: AtomicI64 = AtomicI64::new(1000);

/// Mint a user ID no other test in this process has used
pub fn unique_user() -> Snowflake {
    Snowflake::new(USER_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Build a service context over a fresh in-memory store.
///
/// The presence timing is compressed (5s heartbeat, 15s lease) so paused-
/// time tests can drive lease expiry quickly.
pub fn test_context() -> (ServiceContext, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());

    let ctx = ServiceContextBuilder::new()
        .presence_store(Arc::clone(&store) as Arc<dyn PresenceStore>)
        .group_store(Arc::clone(&store) as Arc<dyn GroupStore>)
        .session_tokens(Arc::new(SessionTokenService::new(TEST_SECRET, 3600)))
        .presence_config(discourse_common::PresenceConfig {
            heartbeat_interval_secs: 5,
            connection_ttl_secs: 15,
            sweep_interval_secs: 10,
        })
        .build()
        .expect("test context should build");

    (ctx, store)
}

/// Issue a signed session token for the given user
pub fn issue_token(ctx: &ServiceContext, user_id: Snowflake, name: &str) -> String {
    ctx.session_tokens()
        .issue(user_id, name, None)
        .expect("token issuance should succeed")
}

/// Redis URL for the live-adapter suite, if one is configured.
///
/// Returning `None` skips those tests; they need a disposable instance.
pub fn redis_test_url() -> Option<String> {
    std::env::var("TEST_REDIS_URL").ok()
}
