use anyhow::Result;
use switchboard::{
    core::{
        error::InteractionError,
        types::{
            Dictionary,
            List,
            Value,
        },
        uri::Uri,
    },
    peer::{
        new_web_socket_peer,
        PeerConfig,
        PublishedEvent,
        ReceivedEvent,
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

async fn start_router() -> Result<(RouterHandle, JoinHandle<()>)> {
    let mut config = RouterConfig::default();
    config.realms.push(RealmConfig {
        name: "test".to_owned(),
        uri: Uri::try_from(REALM)?,
    });
    let router = new_web_socket_router(config)?;
    router.start().await
}

fn create_peer(name: &str) -> Result<WebSocketPeer> {
    let mut config = PeerConfig::default();
    config.name = name.to_owned();
    new_web_socket_peer(config)
}

async fn connect_and_join(router_handle: &RouterHandle, name: &str) -> WebSocketPeer {
    let peer = create_peer(name).unwrap();
    peer.connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();
    peer.join_realm(REALM).await.unwrap();
    peer
}

#[tokio::test(flavor = "multi_thread")]
async fn subscriber_receives_published_events_in_order() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let publisher = connect_and_join(&router_handle, "publisher").await;
    let subscriber = connect_and_join(&router_handle, "subscriber").await;

    let mut subscription = subscriber
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();

    for i in 0..10u64 {
        assert_matches::assert_matches!(
            publisher
                .publish(
                    Uri::try_from("myapp.topic1").unwrap(),
                    PublishedEvent {
                        arguments: List::from_iter([Value::from(i)]),
                        arguments_keyword: Dictionary::from_iter([(
                            "index".to_owned(),
                            Value::from(i),
                        )]),
                    },
                )
                .await,
            Ok(())
        );
    }

    for i in 0..10u64 {
        let event = subscription.event_rx.recv().await.unwrap();
        pretty_assertions::assert_eq!(
            event,
            ReceivedEvent {
                arguments: List::from_iter([Value::from(i)]),
                arguments_keyword: Dictionary::from_iter([("index".to_owned(), Value::from(i))]),
            }
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn subscription_id_shared_between_subscribers_of_topic() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let subscriber_1 = connect_and_join(&router_handle, "subscriber1").await;
    let subscriber_2 = connect_and_join(&router_handle, "subscriber2").await;

    let subscription_1 = subscriber_1
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();
    let subscription_2 = subscriber_2
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();
    assert_eq!(subscription_1.id, subscription_2.id);

    let other = subscriber_1
        .subscribe(Uri::try_from("myapp.topic2").unwrap())
        .await
        .unwrap();
    assert_ne!(subscription_1.id, other.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn unsubscribed_peer_stops_receiving_events() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let publisher = connect_and_join(&router_handle, "publisher").await;
    let subscriber = connect_and_join(&router_handle, "subscriber").await;

    let mut subscription = subscriber
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();

    publisher
        .publish(
            Uri::try_from("myapp.topic1").unwrap(),
            PublishedEvent {
                arguments: List::from_iter([Value::from("before")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_matches::assert_matches!(subscription.event_rx.recv().await, Some(event) => {
        assert_eq!(event.arguments, List::from_iter([Value::from("before")]));
    });

    subscriber.unsubscribe(subscription.id).await.unwrap();

    publisher
        .publish(
            Uri::try_from("myapp.topic1").unwrap(),
            PublishedEvent {
                arguments: List::from_iter([Value::from("after")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The event channel closed with the subscription; nothing more arrives.
    assert_matches::assert_matches!(subscription.event_rx.recv().await, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn fails_unsubscribe_for_unknown_subscription() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let subscriber = connect_and_join(&router_handle, "subscriber").await;

    let subscription = subscriber
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();
    let subscription_id = subscription.id;
    assert_matches::assert_matches!(subscriber.unsubscribe(subscription_id).await, Ok(()));
    assert_matches::assert_matches!(subscriber.unsubscribe(subscription_id).await, Err(err) => {
        assert_matches::assert_matches!(
            err.downcast_ref::<InteractionError>(),
            Some(InteractionError::NoSuchSubscription)
        );
    });
}

#[tokio::test(flavor = "multi_thread")]
async fn publisher_excluded_from_own_events_by_default() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let peer = connect_and_join(&router_handle, "peer").await;

    let mut subscription = peer
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();

    // Self-published events are excluded by default, so only the second publication (which
    // re-includes the publisher) arrives.
    peer.publish(
        Uri::try_from("myapp.topic1").unwrap(),
        PublishedEvent {
            arguments: List::from_iter([Value::from("excluded")]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    peer.publish_with_options(
        Uri::try_from("myapp.topic1").unwrap(),
        PublishedEvent {
            arguments: List::from_iter([Value::from("included")]),
            ..Default::default()
        },
        Dictionary::from_iter([("exclude_me".to_owned(), Value::Bool(false))]),
    )
    .await
    .unwrap();

    assert_matches::assert_matches!(subscription.event_rx.recv().await, Some(event) => {
        assert_eq!(event.arguments, List::from_iter([Value::from("included")]));
    });
}

#[tokio::test(flavor = "multi_thread")]
async fn events_fan_out_to_all_subscribers() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let publisher = connect_and_join(&router_handle, "publisher").await;
    let subscriber_1 = connect_and_join(&router_handle, "subscriber1").await;
    let subscriber_2 = connect_and_join(&router_handle, "subscriber2").await;

    let mut subscription_1 = subscriber_1
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();
    let mut subscription_2 = subscriber_2
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();

    publisher
        .publish(
            Uri::try_from("myapp.topic1").unwrap(),
            PublishedEvent {
                arguments: List::from_iter([Value::from(123)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    for subscription in [&mut subscription_1, &mut subscription_2] {
        assert_matches::assert_matches!(subscription.event_rx.recv().await, Some(event) => {
            assert_eq!(event.arguments, List::from_iter([Value::from(123)]));
        });
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn subscriptions_do_not_cross_realms() {
    test_utils::setup::setup_test_environment();

    let (router_handle, _) = start_router().await.unwrap();
    let publisher = connect_and_join(&router_handle, "publisher").await;

    let subscriber = create_peer("subscriber").unwrap();
    subscriber
        .connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();
    subscriber.join_realm("myapp.realm.other").await.unwrap();

    let mut subscription = subscriber
        .subscribe(Uri::try_from("myapp.topic1").unwrap())
        .await
        .unwrap();

    // An event published in another realm never arrives; an event published in the subscriber's
    // realm does.
    publisher
        .publish(
            Uri::try_from("myapp.topic1").unwrap(),
            PublishedEvent {
                arguments: List::from_iter([Value::from("wrong realm")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let same_realm_publisher = create_peer("publisher2").unwrap();
    same_realm_publisher
        .connect(&format!("ws://{}", router_handle.local_addr()))
        .await
        .unwrap();
    same_realm_publisher
        .join_realm("myapp.realm.other")
        .await
        .unwrap();
    same_realm_publisher
        .publish(
            Uri::try_from("myapp.topic1").unwrap(),
            PublishedEvent {
                arguments: List::from_iter([Value::from("right realm")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_matches::assert_matches!(subscription.event_rx.recv().await, Some(event) => {
        assert_eq!(event.arguments, List::from_iter([Value::from("right realm")]));
    });
}
