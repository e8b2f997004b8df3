//! Live Redis adapter tests
//!
//! These exercise the real store adapters and require a disposable Redis
//! instance. They are skipped unless `TEST_REDIS_URL` is set, e.g.:
//!
//! ```sh
//! TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -p integration-tests --test redis_adapter_tests
//! ```

use std::time::Duration;

use chrono::Utc;
use discourse_core::{GroupStore, GroupSummary, PresenceStore};
use discourse_store::{RedisGroupStore, RedisPool, RedisPoolConfig, RedisPresenceStore};
use integration_tests::{redis_test_url, unique_user};

fn stores() -> Option<(RedisPresenceStore, RedisGroupStore)> {
    let url = redis_test_url()?;
    let pool = RedisPool::new(RedisPoolConfig {
        url,
        max_connections: 4,
    })
    .ok()?;
    Some((
        RedisPresenceStore::new(pool.clone()),
        RedisGroupStore::new(pool),
    ))
}

#[tokio::test]
async fn connection_roundtrip() {
    let Some((presence, _)) = stores() else {
        return;
    };
    let user = unique_user();

    presence
        .register_connection(user, "conn-a", Duration::from_secs(30))
        .await
        .unwrap();
    assert!(presence.presence(user).await.unwrap().unwrap().is_online);
    assert_eq!(presence.live_connections(user).await.unwrap(), 1);
    assert!(presence
        .renew_lease(user, "conn-a", Duration::from_secs(30))
        .await
        .unwrap());

    let went_offline = presence.release_connection(user, "conn-a").await.unwrap();
    assert!(went_offline);
    assert!(!presence.presence(user).await.unwrap().unwrap().is_online);
}

#[tokio::test]
async fn two_connections_fan_in() {
    let Some((presence, _)) = stores() else {
        return;
    };
    let user = unique_user();
    let lease = Duration::from_secs(30);

    presence
        .register_connection(user, "conn-a", lease)
        .await
        .unwrap();
    presence
        .register_connection(user, "conn-b", lease)
        .await
        .unwrap();
    assert_eq!(presence.live_connections(user).await.unwrap(), 2);

    assert!(!presence.release_connection(user, "conn-a").await.unwrap());
    assert!(presence.presence(user).await.unwrap().unwrap().is_online);

    assert!(presence.release_connection(user, "conn-b").await.unwrap());
    assert!(!presence.presence(user).await.unwrap().unwrap().is_online);
}

#[tokio::test]
async fn short_lease_lapses_and_sweeps_offline() {
    let Some((presence, _)) = stores() else {
        return;
    };
    let user = unique_user();

    presence
        .register_connection(user, "conn-ttl", Duration::from_secs(1))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(!presence
        .renew_lease(user, "conn-ttl", Duration::from_secs(1))
        .await
        .unwrap());

    presence.sweep_expired().await.unwrap();
    assert!(!presence.presence(user).await.unwrap().unwrap().is_online);
}

#[tokio::test]
async fn group_records_and_bookkeeping() {
    let Some((_, groups)) = stores() else {
        return;
    };
    let owner = unique_user();
    let group = GroupSummary::new(unique_user(), false);

    groups.create(&group).await.unwrap();
    let listed = groups.list_public().await.unwrap();
    assert!(listed.iter().any(|g| g.id == group.id));

    groups.set_open_group(owner, group.id).await.unwrap();
    assert_eq!(groups.open_group(owner).await.unwrap(), Some(group.id));

    let now = Utc::now();
    groups.set_last_opened(owner, group.id, now).await.unwrap();
    let recorded = groups.last_opened(owner, group.id).await.unwrap().unwrap();
    assert_eq!(recorded.timestamp_millis(), now.timestamp_millis());
}

#[tokio::test]
async fn private_groups_stay_out_of_the_public_listing() {
    let Some((_, groups)) = stores() else {
        return;
    };
    let group = GroupSummary::new(unique_user(), true).with_members([unique_user()]);

    groups.create(&group).await.unwrap();
    let listed = groups.list_public().await.unwrap();
    assert!(listed.iter().all(|g| g.id != group.id));
}
