use anyhow::Result;
use switchboard::{
    core::{
        error::InteractionError,
        uri::Uri,
    },
    peer::{
        new_web_socket_peer,
        PeerConfig,
        WebSocketPeer,
    },
    router::{
        new_web_socket_router,
        RealmConfig,
        RouterConfig,
        RouterHandle,
    },
};
use tokio::task::JoinHandle;

const REALM: &str = "myapp.realm.test";
const OTHER_REALM: &str = "myapp.realm.other";

async fn start_router_with_config(
    mut config: RouterConfig,
) -> Result<(RouterHandle, JoinHandle<()>)> {
    config.realms.push(RealmConfig {
        name: "test".to_owned(),
        uri: Uri::try_from(REALM)?,
    });
    let router = new_web_socket_router(config)?;
    router.start().await
}

async fn start_router() -> Result<(RouterHandle, JoinHandle<()>)> {
    start_router_with_config(RouterConfig::default()).await
}

fn create_peer(name: &str) -> Result<WebSocketPeer> {
    let mut config = PeerConfig::default();
    config.name = name.to_owned();
    new_web_socket_peer(config)
}

#[tokio::test(flavor = "multi_thread")]
async fn peer_joins_realm() {
    test_utils::setup::setup_test_environment();

    let (router_handle, router_join_handle) = start_router().await.unwrap();
    let peer = create_peer("peer").unwrap();

    assert_matches::assert_matches!(
        peer.connect(&format!("ws://{}", router_handle.local_addr()))
            .await,
        Ok(())
    );
    assert_matches::assert_matches!(peer.join_realm(REALM).await, Ok(_));

    router_handle.cancel().unwrap();
    router_join_handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn peer_joins_and_leaves_realm_repeatedly() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let peer = create_peer("peer").unwrap();

    assert_matches::assert_matches!(
        peer.connect(&format!("ws://{}", router_handle.local_addr()))
            .await,
        Ok(())
    );
    assert_matches::assert_matches!(peer.join_realm(REALM).await, Ok(_));
    assert_matches::assert_matches!(peer.leave_realm().await, Ok(()));
    assert_matches::assert_matches!(peer.join_realm(REALM).await, Ok(_));
    assert_matches::assert_matches!(peer.leave_realm().await, Ok(()));
}

#[tokio::test(flavor = "multi_thread")]
async fn sessions_receive_distinct_ids() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let peer_1 = create_peer("peer1").unwrap();
    let peer_2 = create_peer("peer2").unwrap();

    peer_1
        .connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();
    peer_2
        .connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();

    let session_1 = peer_1.join_realm(REALM).await.unwrap();
    let session_2 = peer_2.join_realm(REALM).await.unwrap();
    assert_ne!(session_1, session_2);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_realm_created_on_demand_by_default() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let peer = create_peer("peer").unwrap();

    peer.connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();
    assert_matches::assert_matches!(peer.join_realm(OTHER_REALM).await, Ok(_));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_realm_aborts_session_when_auto_create_disabled() {
    test_utils::setup::setup_test_environment();

    let mut config = RouterConfig::default();
    config.auto_create_realms = false;
    let (router_handle, _) = start_router_with_config(config).await.unwrap();
    let peer = create_peer("peer").unwrap();

    peer.connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();

    // The declared realm works; an undeclared one is aborted.
    assert_matches::assert_matches!(peer.join_realm(REALM).await, Ok(_));
    assert_matches::assert_matches!(peer.leave_realm().await, Ok(()));
    assert_matches::assert_matches!(peer.join_realm(OTHER_REALM).await, Err(err) => {
        assert_matches::assert_matches!(
            err.downcast_ref::<InteractionError>(),
            Some(InteractionError::NoSuchRealm(message)) => {
                assert_eq!(message, &format!("The realm {OTHER_REALM} does not exist."));
            }
        );
    });
}

#[tokio::test(flavor = "multi_thread")]
async fn abort_unknown_realms_dominates_auto_create() {
    test_utils::setup::setup_test_environment();

    let mut config = RouterConfig::default();
    config.auto_create_realms = true;
    config.abort_unknown_realms = true;
    let (router_handle, _) = start_router_with_config(config).await.unwrap();
    let peer = create_peer("peer").unwrap();

    peer.connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();

    assert_matches::assert_matches!(peer.join_realm(OTHER_REALM).await, Err(err) => {
        assert_matches::assert_matches!(
            err.downcast_ref::<InteractionError>(),
            Some(InteractionError::NoSuchRealm(_))
        );
    });
    // Declared realms are unaffected.
    assert_matches::assert_matches!(peer.join_realm(REALM).await, Ok(_));
}

#[tokio::test(flavor = "multi_thread")]
async fn peer_reconnects_after_router_restarts() {
    test_utils::setup::setup_test_environment();

    let (router_handle, router_join_handle) = start_router().await.unwrap();
    let peer = create_peer("peer").unwrap();

    peer.connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();
    assert_matches::assert_matches!(peer.join_realm(REALM).await, Ok(_));

    // Stop the first router.
    router_handle.cancel().unwrap();
    router_join_handle.await.unwrap();

    // Recreate the router and reconnect.
    let (router_handle, router_join_handle) = start_router().await.unwrap();
    assert_matches::assert_matches!(
        peer.connect(&format!("ws://{}", router_handle.local_addr()))
            .await,
        Ok(())
    );
    assert_matches::assert_matches!(peer.join_realm(REALM).await, Ok(_));

    router_handle.cancel().unwrap();
    router_join_handle.await.unwrap();
}
