//! # switchboard
//!
//! **switchboard** is a WAMP v2 router for Rust, speaking the `wamp.2.json` sub-protocol over
//! WebSockets.
//!
//! The router implements the two WAMP messaging patterns on a realm: Publish & Subscribe
//! (the *broker* role) and routed Remote Procedure Calls (the *dealer* role). Peers connect over
//! WebSocket, establish a session in a realm with a HELLO/WELCOME handshake, and thereafter
//! exchange typed messages identified by a numeric code.
//!
//! The library uses [`tokio`](https://tokio.rs) as its asynchronous runtime. All routing state is
//! owned by a single router task; each connection runs its own transport pipeline and
//! communicates with the router purely by message passing, so no locks guard realm state.
//!
//! The WAMP protocol specification is described [here](https://wamp-proto.org/spec.html).
//!
//! ## Routers
//!
//! Configure a router through a [`RouterConfig`][`crate::router::RouterConfig`] and construct one
//! with [`new_web_socket_router`][`crate::router::new_web_socket_router`]. The router runs in
//! background tasks transparent to the caller and is interacted with through the returned
//! [`RouterHandle`][`crate::router::RouterHandle`].
//!
//! ```no_run
//! use switchboard::router::{
//!     new_web_socket_router,
//!     RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = RouterConfig::default();
//!     config.port = 8080;
//!
//!     let router = new_web_socket_router(config).unwrap();
//!
//!     // Start the router in background tasks.
//!     let (router_handle, router_join_handle) = router.start().await.unwrap();
//!
//!     // Let the router run for as long as desired...
//!
//!     // Cancel and wait for the router to terminate.
//!     router_handle.cancel().unwrap();
//!     router_join_handle.await.unwrap();
//! }
//! ```
//!
//! By default the router creates realms when peers first say HELLO to them. Realms can also be
//! declared up front through [`RealmConfig`][`crate::router::RealmConfig`], and the
//! `auto_create_realms` / `abort_unknown_realms` policies control what happens for unknown
//! realms.
//!
//! ## Peers
//!
//! WAMP peers are clients that interact with a WAMP router. Configure a peer using a
//! [`PeerConfig`][`crate::peer::PeerConfig`] and construct one with
//! [`new_web_socket_peer`][`crate::peer::new_web_socket_peer`].
//!
//! ```no_run
//! use switchboard::{
//!     core::uri::Uri,
//!     peer::{
//!         new_web_socket_peer,
//!         PeerConfig,
//!         PublishedEvent,
//!     },
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let peer = new_web_socket_peer(PeerConfig::default()).unwrap();
//!     peer.connect("ws://127.0.0.1:8080").await.unwrap();
//!     peer.join_realm("myapp.realm").await.unwrap();
//!
//!     // Subscribe to a topic.
//!     let mut subscription = peer
//!         .subscribe(Uri::try_from("myapp.topic1").unwrap())
//!         .await
//!         .unwrap();
//!
//!     // Publish an event to the same topic from elsewhere, and it arrives on the
//!     // subscription's channel.
//!     while let Some(event) = subscription.event_rx.recv().await {
//!         println!("received: {:?}", event.arguments);
//!     }
//!
//!     peer.leave_realm().await.unwrap();
//!     peer.disconnect().await.unwrap();
//! }
//! ```
//!
//! Procedures work symmetrically: a callee [`register`s][`crate::peer::Peer::register`] a
//! procedure and answers [`Invocation`s][`crate::peer::Invocation`] arriving on its channel,
//! while callers use [`call`][`crate::peer::Peer::call`] and receive the result or error routed
//! back through the dealer.

pub mod core;
pub mod message;
pub mod peer;
pub mod router;
pub mod serializer;
pub mod transport;
