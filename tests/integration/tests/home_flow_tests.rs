//! End-to-end flow tests over the in-memory store
//!
//! Drives sign-in, presence, the home-screen fetch, group navigation, and
//! sign-out through the service layer the way the view layer would.

use std::sync::Arc;
use std::time::Duration;

use discourse_core::{PresenceStore, Route, Snowflake};
use discourse_service::{
    ConnectionState, DisconnectKind, GroupDirectory, HomeFlow, PresenceClient, SessionController,
};
use discourse_store::PresenceSweeper;
use integration_tests::{issue_token, test_context, unique_user};

async fn yield_to_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Presence convergence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn vanished_client_converges_offline_via_sweeper() {
    let (ctx, store) = test_context();
    let user = unique_user();

    // A client that goes online and then disappears without sign-out;
    // dropping it kills the heartbeat, like a closed tab
    let client = PresenceClient::new(
        user,
        Arc::clone(ctx.presence_store()),
        ctx.presence_config().heartbeat_interval(),
        ctx.presence_config().connection_ttl(),
    );
    client.mark_online().await.unwrap();
    assert!(store.presence(user).await.unwrap().unwrap().is_online);
    drop(client);

    // The sweeper is the only actor from here on
    let sweeper = PresenceSweeper::new(
        Arc::clone(ctx.presence_store()),
        ctx.presence_config().sweep_interval(),
    );
    let task = sweeper.spawn();

    // Past the lease TTL (15s) and the next sweep tick (20s)
    tokio::time::advance(Duration::from_secs(21)).await;
    yield_to_tasks().await;

    let record = store.presence(user).await.unwrap().unwrap();
    assert!(!record.is_online, "lease lapse must converge the record");
    task.abort();
}

#[tokio::test]
async fn offline_then_online_leaves_user_online() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    let handle = controller
        .sign_in(&issue_token(&ctx, user, "Ada"))
        .unwrap();

    handle.presence().mark_online().await.unwrap();
    handle.presence().mark_offline().await;
    handle.presence().mark_online().await.unwrap();

    assert_eq!(handle.presence().state().await, ConnectionState::Online);
    assert!(store.presence(user).await.unwrap().unwrap().is_online);
}

#[tokio::test]
async fn second_session_keeps_user_online_until_last_one_ends() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    let phone = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    let laptop = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    phone.presence().mark_online().await.unwrap();
    laptop.presence().mark_online().await.unwrap();
    assert_eq!(store.live_connections(user).await.unwrap(), 2);

    controller.sign_out(phone.id()).await;
    assert!(
        store.presence(user).await.unwrap().unwrap().is_online,
        "one device closing must not mark the user offline"
    );

    controller.sign_out(laptop.id()).await;
    assert!(!store.presence(user).await.unwrap().unwrap().is_online);
}

// ============================================================================
// Home flow
// ============================================================================

#[tokio::test]
async fn establish_brings_user_online_and_lists_groups() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    let seeded = GroupDirectory::new(&ctx)
        .create_public_group(unique_user(), vec![], false)
        .await
        .unwrap();

    let handle = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    let flow = HomeFlow::new(ctx.clone(), Arc::clone(&handle));
    flow.establish().await;

    assert!(store.presence(user).await.unwrap().unwrap().is_online);
    let state = flow.fetch_state();
    assert!(state.is_loaded());
    let discourse_service::GroupFetchState::Loaded(groups) = state else {
        unreachable!();
    };
    assert!(groups.iter().any(|g| g.id == seeded.id));
}

#[tokio::test]
async fn empty_directory_is_a_loaded_state_not_an_error() {
    let (ctx, _store) = test_context();
    let user = unique_user();

    let groups = GroupDirectory::new(&ctx)
        .list_public_groups(user)
        .await
        .unwrap();
    assert!(groups.is_empty());
}

#[tokio::test]
async fn fetch_failure_lands_in_failed_never_loading() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    store.fail_group_ops(true);

    let handle = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    let flow = HomeFlow::new(ctx.clone(), Arc::clone(&handle));
    flow.establish().await;

    assert!(flow.fetch_state().is_failed());

    // Recovery path: the store comes back and the user retries
    store.fail_group_ops(false);
    flow.retry_fetch().await;
    assert!(flow.fetch_state().is_loaded());
}

#[tokio::test]
async fn creating_a_group_opens_it_and_records_bookkeeping() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    let handle = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    let flow = HomeFlow::new(ctx.clone(), Arc::clone(&handle));

    let route = flow.create_group().await.unwrap();
    let Route::Group(group_id) = route else {
        panic!("expected a group route, got {route}");
    };
    assert_eq!(route.path(), format!("/group/{group_id}"));

    let group = GroupDirectory::new(&ctx);
    let created = group.list_public_groups(user).await.unwrap();
    assert_eq!(created.len(), 1);
    assert!(!created[0].is_private);
    assert!(created[0].member_ids.is_empty());

    use discourse_core::GroupStore;
    assert_eq!(store.open_group(user).await.unwrap(), Some(group_id));
    assert!(store.last_opened(user, group_id).await.unwrap().is_some());
}

// ============================================================================
// Sign-out sequencing
// ============================================================================

#[tokio::test]
async fn sign_out_writes_offline_then_clears_state_then_routes_to_landing() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    let handle = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    let flow = HomeFlow::new(ctx.clone(), Arc::clone(&handle));
    flow.establish().await;
    assert!(store.presence(user).await.unwrap().unwrap().is_online);

    let route = controller.sign_out(handle.id()).await;

    assert_eq!(route, Route::Landing);
    assert_eq!(route.path(), "/");
    assert!(controller.session(handle.id()).is_none());
    assert_eq!(
        handle.presence().state().await,
        ConnectionState::Offline(DisconnectKind::Graceful)
    );
    assert!(!store.presence(user).await.unwrap().unwrap().is_online);
}

#[tokio::test]
async fn sign_out_twice_is_harmless() {
    let (ctx, _store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    let handle = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    assert_eq!(controller.sign_out(handle.id()).await, Route::Landing);
    assert_eq!(controller.sign_out(handle.id()).await, Route::Landing);
}

#[tokio::test]
async fn stale_session_cannot_resurrect_presence() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());
    let user = unique_user();

    let handle = controller.sign_in(&issue_token(&ctx, user, "Ada")).unwrap();
    handle.presence().mark_online().await.unwrap();
    controller.sign_out(handle.id()).await;

    // The store-side view: everything released
    assert_eq!(store.live_connections(user).await.unwrap(), 0);
    assert!(!store.presence(user).await.unwrap().unwrap().is_online);

    // A lapse sweep right after finds nothing left to flip
    let flipped = store.sweep_expired().await.unwrap();
    assert!(!flipped.contains(&user));
}

#[tokio::test]
async fn invalid_token_never_creates_presence() {
    let (ctx, store) = test_context();
    let controller = SessionController::new(ctx.clone());

    assert!(controller.sign_in("not-a-real-token").is_err());
    assert_eq!(controller.session_count(), 0);
    assert!(store
        .presence(Snowflake::new(1))
        .await
        .unwrap()
        .is_none());
}
