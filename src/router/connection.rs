use anyhow::{
    Error,
    Result,
};
use log::{
    debug,
    error,
    info,
};
use tokio::sync::{
    broadcast::{
        self,
        error::RecvError,
    },
    mpsc,
};
use uuid::Uuid;

use crate::{
    core::service::Service,
    message::message::Message,
};

/// Size of the outbound message buffer owned by each connection.
///
/// The router never blocks on a slow peer; overflowing the buffer fails the connection.
pub const OUTBOUND_BUFFER_SIZE: usize = 4;

/// An event delivered from a connection into the router's mailbox.
///
/// Events from one connection arrive in FIFO order. `Disconnected` is terminal and is the source
/// of truth for state cleanup, whether the peer went away on its own, the pipeline failed, or the
/// router commanded the disconnect.
pub enum ConnectionEvent {
    Connected(ConnectionHandle),
    Received(Uuid, Message),
    Disconnected(Uuid),
}

/// A send-capability for one connection, held in the router's connection registry.
#[derive(Clone)]
pub struct ConnectionHandle {
    uuid: Uuid,
    outbound_tx: mpsc::Sender<Message>,
    disconnect_tx: broadcast::Sender<()>,
}

impl ConnectionHandle {
    /// The unique identifier of the connection.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Queues a message for the peer.
    ///
    /// The buffer is bounded; failure means the connection is overflowing or already gone and
    /// should be failed.
    pub fn send(&self, message: Message) -> Result<()> {
        self.outbound_tx.try_send(message).map_err(Error::new)
    }

    /// Commands the connection to tear down its peer.
    ///
    /// Best-effort; cleanup happens when the `Disconnected` event comes back.
    pub fn disconnect(&self) {
        self.disconnect_tx.send(()).ok();
    }
}

/// A connection from the router to a client.
///
/// On its own, a connection is not very meaningful. When started, it uses a WAMP [`Service`] to
/// send and receive messages on an underlying transport, forwarding inbound messages and the
/// terminal disconnect into the router's mailbox and draining the router's outbound queue to the
/// peer.
#[derive(Debug)]
pub struct Connection {
    uuid: Uuid,
}

impl Connection {
    /// Creates a new connection.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
        }
    }

    /// The unique identifier of the connection.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Starts the connection on the runtime.
    ///
    /// The `Connected` event is delivered before any message from the peer, so the router always
    /// knows the connection before it has to route for it.
    pub fn start(
        self,
        service: Service,
        event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> ConnectionHandle {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER_SIZE);
        let (disconnect_tx, disconnect_rx) = broadcast::channel(1);
        let handle = ConnectionHandle {
            uuid: self.uuid,
            outbound_tx,
            disconnect_tx,
        };
        event_tx.send(ConnectionEvent::Connected(handle.clone())).ok();
        tokio::spawn(self.run(service, event_tx, outbound_rx, disconnect_rx));
        handle
    }

    async fn run(
        self,
        service: Service,
        event_tx: mpsc::UnboundedSender<ConnectionEvent>,
        mut outbound_rx: mpsc::Receiver<Message>,
        mut disconnect_rx: broadcast::Receiver<()>,
    ) {
        let uuid = self.uuid;
        let mut service_message_rx = service.message_rx();
        let mut end_rx = service.end_rx();
        let service_handle = service.start();

        let reason = loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(message) => {
                            if service_handle.message_tx().send(message).is_err() {
                                break "outbound channel closed";
                            }
                        }
                        None => break "router released the connection",
                    }
                }
                inbound = service_message_rx.recv() => {
                    match inbound {
                        Ok(message) => {
                            if event_tx.send(ConnectionEvent::Received(uuid, message)).is_err() {
                                break "router mailbox closed";
                            }
                        }
                        Err(RecvError::Closed) => break "peer stream ended",
                        Err(RecvError::Lagged(_)) => break "inbound messages lagged",
                    }
                }
                _ = disconnect_rx.recv() => {
                    // Flush what the router already queued before tearing down.
                    while let Ok(message) = outbound_rx.try_recv() {
                        service_handle.message_tx().send(message).ok();
                    }
                    break "router disconnected the peer";
                }
                _ = end_rx.recv() => break "service ended",
            }
        };

        info!("Connection {uuid} finished: {reason}");

        if let Err(err) = service_handle.cancel() {
            debug!("Failed to cancel service for connection {uuid}: {err}");
        }
        if let Err(err) = service_handle.join().await {
            error!("Failed to join service for connection {uuid}: {err}");
        }

        event_tx.send(ConnectionEvent::Disconnected(uuid)).ok();
    }
}
