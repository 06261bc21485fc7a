//! Async session driver tests: `spawn_session` on a paused tokio clock
//! against the simulated feed.

use georoute_core::{
    spawn_session, ConnectionState, EngineConfig, LatLng, Node, NodeRegistry, Session,
    SessionCommand, SessionHandle, Snapshot, Tier,
};
use georoute_env::TokioContext;
use georoute_sim::{Decider, SimFeed};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn session() -> Session<TokioContext> {
    let registry = NodeRegistry::new(vec![
        Node::new("core-a", "A", 0.0, 0.0, Tier::Core),
        Node::new("edge-b", "B", 1.0, 1.0, Tier::Edge),
    ])
    .unwrap();
    Session::new(TokioContext::shared(), Arc::new(registry), EngineConfig::default()).unwrap()
}

async fn wait_for<F>(handle: &SessionHandle, mut condition: F) -> Snapshot
where
    F: FnMut(&Snapshot) -> bool,
{
    let mut snapshots = handle.snapshots();
    let snapshot = timeout(Duration::from_secs(60), snapshots.wait_for(|s| condition(s)))
        .await
        .expect("timed out waiting for snapshot")
        .expect("session ended");
    snapshot.clone()
}

#[tokio::test(start_paused = true)]
async fn test_placed_user_gets_route() {
    let (feed, controller) = SimFeed::new(Decider::nearest());
    let handle = spawn_session(session(), feed);

    wait_for(&handle, |s| s.connection == ConnectionState::Connected).await;
    assert!(handle.send(SessionCommand::PlaceUser(LatLng::new(1.0, 1.1))));

    let snapshot = wait_for(&handle, |s| s.stats.total_routes == 1).await;
    assert_eq!(snapshot.paths.len(), 2);
    assert_eq!(snapshot.paths[0].id, "route-1");
    assert_eq!(snapshot.paths[1].id, "route-1-core");
    assert_eq!(controller.sent().len(), 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_routes_fade_but_stay_in_history() {
    let (feed, _controller) = SimFeed::new(Decider::nearest());
    let handle = spawn_session(session(), feed);

    wait_for(&handle, |s| s.connection == ConnectionState::Connected).await;
    handle.send(SessionCommand::PlaceUser(LatLng::new(1.0, 1.1)));
    wait_for(&handle, |s| s.stats.visible_routes == 1).await;

    // The periodic tick re-projects without any new event
    sleep(Duration::from_millis(4500)).await;
    let latest = handle.latest();
    assert!(latest.paths.is_empty());
    assert_eq!(latest.stats.total_routes, 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_feed_retries_every_three_seconds() {
    let (feed, controller) = SimFeed::new(Decider::nearest());
    controller.set_reachable(false);
    let handle = spawn_session(session(), feed);

    sleep(Duration::from_millis(9500)).await;
    assert_eq!(controller.opens(), 4);
    assert_eq!(handle.latest().connection, ConnectionState::Disconnected);

    controller.set_reachable(true);
    sleep(Duration::from_millis(3000)).await;
    assert_eq!(controller.opens(), 5);
    assert_eq!(handle.latest().connection, ConnectionState::Connected);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_severed_feed_reconnects_after_delay() {
    let (feed, controller) = SimFeed::new(Decider::nearest());
    let handle = spawn_session(session(), feed);
    wait_for(&handle, |s| s.connection == ConnectionState::Connected).await;

    assert!(controller.sever());
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(handle.latest().connection, ConnectionState::Disconnected);

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(handle.latest().connection, ConnectionState::Connected);
    assert_eq!(controller.opens(), 2);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_reconnect_timer() {
    let (feed, controller) = SimFeed::new(Decider::nearest());
    controller.set_reachable(false);
    let handle = spawn_session(session(), feed);

    sleep(Duration::from_millis(500)).await;
    handle.stop().await;

    sleep(Duration::from_secs(30)).await;
    assert_eq!(controller.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_ends_session() {
    let (feed, _controller) = SimFeed::new(Decider::nearest());
    let handle = spawn_session(session(), feed);
    let mut snapshots = handle.snapshots();
    drop(handle);

    let ended = timeout(Duration::from_secs(10), async {
        while snapshots.changed().await.is_ok() {}
    })
    .await;
    assert!(ended.is_ok());
    assert_eq!(snapshots.borrow().connection, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_hover_and_clear_commands() {
    let (feed, _controller) = SimFeed::new(Decider::nearest());
    let handle = spawn_session(session(), feed);
    wait_for(&handle, |s| s.connection == ConnectionState::Connected).await;

    handle.send(SessionCommand::PlaceUser(LatLng::new(1.0, 1.1)));
    let snapshot = wait_for(&handle, |s| s.stats.total_routes == 1).await;
    let user = snapshot.users[0].id.clone();

    sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.latest().stats.visible_routes, 0);

    handle.send(SessionCommand::Hover(Some(user)));
    wait_for(&handle, |s| s.stats.visible_routes == 1).await;

    handle.send(SessionCommand::Clear);
    let cleared = wait_for(&handle, |s| s.stats.total_routes == 0).await;
    assert!(cleared.users.is_empty());
    assert_eq!(cleared.hovered, None);
    assert_eq!(cleared.stats.core_nodes + cleared.stats.edge_nodes, 2);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_garbage_frames_do_not_break_feed() {
    let (feed, controller) = SimFeed::new(Decider::nearest());
    let handle = spawn_session(session(), feed);
    wait_for(&handle, |s| s.connection == ConnectionState::Connected).await;

    assert!(controller.inject("{not json"));
    assert!(controller.inject(r#"{"type": "PONG"}"#));
    handle.send(SessionCommand::PlaceUser(LatLng::new(1.0, 1.1)));

    let snapshot = wait_for(&handle, |s| s.stats.total_routes == 1).await;
    assert_eq!(snapshot.connection, ConnectionState::Connected);

    handle.stop().await;
}
