use std::sync::Arc;

use anyhow::{
    Error,
    Result,
};
use futures_util::lock::Mutex;
use log::{
    debug,
    info,
    warn,
};
use tokio::sync::{
    broadcast::{
        self,
        error::RecvError,
    },
    mpsc::{
        unbounded_channel,
        UnboundedReceiver,
        UnboundedSender,
    },
    oneshot,
};

use crate::{
    core::{
        close::CloseReason,
        error::{
            error_from_message,
            WampError,
        },
        hash::{
            HashMap,
            HashSet,
        },
        id::{
            Id,
            IdAllocator,
            SequentialIdAllocator,
        },
        roles::PeerRole,
        service::{
            Service,
            ServiceHandle,
        },
        stream::MessageStream,
        types::{
            Dictionary,
            List,
            Value,
        },
        uri::{
            Uri,
            UriValidation,
        },
    },
    message::{
        common::{
            goodbye_and_out,
            goodbye_with_close_reason,
        },
        message::{
            CallMessage,
            ErrorMessage,
            HelloMessage,
            Message,
            PublishMessage,
            RegisterMessage,
            SubscribeMessage,
            UnregisterMessage,
            UnsubscribeMessage,
            YieldMessage,
        },
    },
    peer::connector::connector::ConnectorFactory,
    transport::transport::TransportFactory,
};

const DEFAULT_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

/// Configuration for a [`Peer`].
#[derive(Debug)]
pub struct PeerConfig {
    /// Name of the peer, mostly for logging.
    pub name: String,
    /// Agent name, communicated to the router.
    pub agent: String,
    /// Roles implemented by the peer.
    pub roles: HashSet<PeerRole>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT.to_owned(),
            agent: DEFAULT_AGENT.to_owned(),
            roles: HashSet::from_iter([
                PeerRole::Callee,
                PeerRole::Caller,
                PeerRole::Publisher,
                PeerRole::Subscriber,
            ]),
        }
    }
}

/// An event received over a subscription.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceivedEvent {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
}

/// An event for publishing to a topic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishedEvent {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
}

/// Input for calling a procedure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RpcCall {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
}

/// The result of calling a procedure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RpcResult {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
}

/// The result of an invocation, yielded by the callee.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RpcYield {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
}

/// A subscription to a topic.
///
/// Events arrive on `event_rx` until the subscription is closed.
#[derive(Debug)]
pub struct Subscription {
    /// The subscription ID.
    pub id: Id,
    /// The event receiver channel.
    pub event_rx: UnboundedReceiver<ReceivedEvent>,
}

/// A procedure registered in the realm.
///
/// Invocations arrive on `invocation_rx`; each one is answered explicitly with a yield or an
/// error.
#[derive(Debug)]
pub struct Procedure {
    /// The registration ID.
    pub id: Id,
    /// The invocation receiver channel.
    pub invocation_rx: UnboundedReceiver<Invocation>,
}

/// A single invocation of a procedure, to be answered by the callee.
#[derive(Debug)]
pub struct Invocation {
    /// The invocation request ID.
    pub request: Id,
    pub arguments: List,
    pub arguments_keyword: Dictionary,

    message_tx: UnboundedSender<Message>,
}

impl Invocation {
    /// Responds to the invocation with a result.
    pub fn respond_ok(self, result: RpcYield) -> Result<()> {
        self.message_tx
            .send(Message::Yield(YieldMessage {
                invocation_request: self.request,
                options: Dictionary::default(),
                arguments: result.arguments,
                arguments_keyword: result.arguments_keyword,
            }))
            .map_err(Error::new)
    }

    /// Responds to the invocation with an error.
    pub fn respond_error(self, error: WampError) -> Result<()> {
        self.message_tx
            .send(Message::Error(ErrorMessage {
                request_type: Message::INVOCATION_TAG,
                request: self.request,
                details: [(
                    "message".to_owned(),
                    Value::String(error.message.clone()),
                )]
                .into_iter()
                .collect(),
                error: error.reason,
                ..Default::default()
            }))
            .map_err(Error::new)
    }

    /// Responds to the invocation with the given outcome.
    pub fn respond(self, result: Result<RpcYield, WampError>) -> Result<()> {
        match result {
            Ok(result) => self.respond_ok(result),
            Err(error) => self.respond_error(error),
        }
    }
}

#[derive(Default)]
struct PendingRequests {
    join: Option<oneshot::Sender<Result<Id>>>,
    goodbye: Option<oneshot::Sender<()>>,
    requests: HashMap<Id, oneshot::Sender<Result<Message>>>,
    calls: HashMap<Id, oneshot::Sender<Result<RpcResult>>>,
    subscriptions: HashMap<Id, UnboundedSender<ReceivedEvent>>,
    procedures: HashMap<Id, UnboundedSender<Invocation>>,
}

struct PeerState {
    service: ServiceHandle,
    message_tx: UnboundedSender<Message>,
    pending: Arc<Mutex<PendingRequests>>,
    session: Option<Id>,
}

/// A WAMP peer (a.k.a., client) that connects to a WAMP router, establishes sessions in a realm,
/// and interacts with resources in the realm.
pub struct Peer<S> {
    config: PeerConfig,
    connector_factory: Box<dyn ConnectorFactory<S>>,
    transport_factory: Box<dyn TransportFactory<S>>,
    request_ids: SequentialIdAllocator,

    state: Mutex<Option<PeerState>>,
}

impl<S> Peer<S>
where
    S: Send + 'static,
{
    /// Creates a new peer.
    pub fn new(
        config: PeerConfig,
        connector_factory: Box<dyn ConnectorFactory<S>>,
        transport_factory: Box<dyn TransportFactory<S>>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            connector_factory,
            transport_factory,
            request_ids: SequentialIdAllocator::default(),
            state: Mutex::new(None),
        })
    }

    /// Connects to a router.
    ///
    /// This method merely establishes a network connection with the router. It does not establish
    /// any WAMP session. If the peer loses connection to the router, the connection is dropped in
    /// the background and methods depending on the connection will fail. The peer can reconnect
    /// to the router by calling this method again.
    pub async fn connect(&self, uri: &str) -> Result<()> {
        let connector = self.connector_factory.new_connector();
        let connection = connector.connect(uri).await?;
        info!(
            "WAMP connection established with {uri} for peer {}",
            self.config.name
        );

        let serializer = crate::serializer::serializer::new_serializer(
            connection.serializer,
            UriValidation::Loose,
        );
        let transport = self.transport_factory.new_transport(connection.stream);

        let service = Service::new(
            self.config.name.clone(),
            MessageStream::new(transport, serializer),
            false,
        );
        let message_rx = service.message_rx();
        let end_rx = service.end_rx();
        let service_handle = service.start();
        let message_tx = service_handle.message_tx();

        let pending = Arc::new(Mutex::new(PendingRequests::default()));
        tokio::spawn(Self::message_handler(
            self.config.name.clone(),
            pending.clone(),
            message_tx.clone(),
            message_rx,
            end_rx,
        ));

        let mut state = self.state.lock().await;
        if let Some(old) = state.take() {
            old.service.cancel().ok();
        }
        *state = Some(PeerState {
            service: service_handle,
            message_tx,
            pending,
            session: None,
        });
        Ok(())
    }

    /// Disconnects from the router altogether.
    pub async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.take() {
            Some(old) => {
                old.service.cancel().ok();
                Ok(())
            }
            None => Err(Error::msg("peer is not connected")),
        }
    }

    /// Establishes a session in the given realm.
    ///
    /// Returns the session ID assigned by the router.
    pub async fn join_realm(&self, realm: &str) -> Result<Id> {
        let realm = Uri::try_from(realm).map_err(Error::new)?;
        let rx = {
            let mut state = self.state.lock().await;
            let state = state
                .as_mut()
                .ok_or_else(|| Error::msg("peer is not connected"))?;
            let (tx, rx) = oneshot::channel();
            state.pending.lock().await.join = Some(tx);

            let mut roles = Dictionary::default();
            for role in &self.config.roles {
                roles.insert(
                    role.key_for_details().to_owned(),
                    Value::Object(Dictionary::default()),
                );
            }
            let mut details = Dictionary::default();
            details.insert("agent".to_owned(), Value::String(self.config.agent.clone()));
            details.insert("roles".to_owned(), Value::Object(roles));

            state
                .message_tx
                .send(Message::Hello(HelloMessage { realm, details }))
                .map_err(|_| Error::msg("channel closed"))?;
            rx
        };
        let session = rx
            .await
            .map_err(|_| Error::msg("channel closed"))??;
        if let Some(state) = self.state.lock().await.as_mut() {
            state.session = Some(session);
        }
        Ok(session)
    }

    /// Leaves the current realm with a GOODBYE handshake.
    pub async fn leave_realm(&self) -> Result<()> {
        let rx = {
            let mut state = self.state.lock().await;
            let state = state
                .as_mut()
                .ok_or_else(|| Error::msg("peer is not connected"))?;
            let (tx, rx) = oneshot::channel();
            state.pending.lock().await.goodbye = Some(tx);
            state
                .message_tx
                .send(goodbye_with_close_reason(CloseReason::CloseRealm))
                .map_err(|_| Error::msg("channel closed"))?;
            rx
        };
        rx.await.map_err(|_| Error::msg("channel closed"))?;
        let mut state = self.state.lock().await;
        if let Some(state) = state.as_mut() {
            state.session = None;
            let mut pending = state.pending.lock().await;
            pending.subscriptions.clear();
            pending.procedures.clear();
        }
        Ok(())
    }

    /// The current session ID, if a realm has been joined.
    pub async fn current_session_id(&self) -> Option<Id> {
        self.state.lock().await.as_ref().and_then(|state| state.session)
    }

    /// Subscribes to a topic.
    pub async fn subscribe(&self, topic: Uri) -> Result<Subscription> {
        let request = self.request_ids.generate_id().await?;
        let reply = self
            .send_request(
                request,
                Message::Subscribe(SubscribeMessage {
                    request,
                    options: Dictionary::default(),
                    topic,
                }),
            )
            .await?;
        match reply {
            Message::Subscribed(message) => {
                let (event_tx, event_rx) = unbounded_channel();
                self.with_pending(|pending| {
                    pending
                        .subscriptions
                        .insert(message.subscription, event_tx);
                })
                .await?;
                Ok(Subscription {
                    id: message.subscription,
                    event_rx,
                })
            }
            message => Err(Error::msg(format!(
                "unexpected {} response to SUBSCRIBE",
                message.message_name()
            ))),
        }
    }

    /// Unsubscribes from a topic, closing the subscription's event channel.
    pub async fn unsubscribe(&self, subscription: Id) -> Result<()> {
        let request = self.request_ids.generate_id().await?;
        self.send_request(
            request,
            Message::Unsubscribe(UnsubscribeMessage {
                request,
                subscribed_subscription: subscription,
            }),
        )
        .await?;
        self.with_pending(|pending| {
            pending.subscriptions.remove(&subscription);
        })
        .await
    }

    /// Publishes an event to a topic, waiting for the router's acknowledgement.
    pub async fn publish(&self, topic: Uri, event: PublishedEvent) -> Result<()> {
        self.publish_with_options(topic, event, Dictionary::default())
            .await
    }

    /// Publishes an event to a topic with explicit options.
    ///
    /// The acknowledgement is always requested, so that the publication is confirmed before this
    /// method returns.
    pub async fn publish_with_options(
        &self,
        topic: Uri,
        event: PublishedEvent,
        mut options: Dictionary,
    ) -> Result<()> {
        let request = self.request_ids.generate_id().await?;
        options.insert("acknowledge".to_owned(), Value::Bool(true));
        self.send_request(
            request,
            Message::Publish(PublishMessage {
                request,
                options,
                topic,
                arguments: event.arguments,
                arguments_keyword: event.arguments_keyword,
            }),
        )
        .await?;
        Ok(())
    }

    /// Registers a procedure in the realm.
    pub async fn register(&self, procedure: Uri) -> Result<Procedure> {
        let request = self.request_ids.generate_id().await?;
        let reply = self
            .send_request(
                request,
                Message::Register(RegisterMessage {
                    request,
                    options: Dictionary::default(),
                    procedure,
                }),
            )
            .await?;
        match reply {
            Message::Registered(message) => {
                let (invocation_tx, invocation_rx) = unbounded_channel();
                self.with_pending(|pending| {
                    pending
                        .procedures
                        .insert(message.registration, invocation_tx);
                })
                .await?;
                Ok(Procedure {
                    id: message.registration,
                    invocation_rx,
                })
            }
            message => Err(Error::msg(format!(
                "unexpected {} response to REGISTER",
                message.message_name()
            ))),
        }
    }

    /// Unregisters a procedure, closing its invocation channel.
    pub async fn unregister(&self, registration: Id) -> Result<()> {
        let request = self.request_ids.generate_id().await?;
        self.send_request(
            request,
            Message::Unregister(UnregisterMessage {
                request,
                registered_registration: registration,
            }),
        )
        .await?;
        self.with_pending(|pending| {
            pending.procedures.remove(&registration);
        })
        .await
    }

    /// Calls a procedure and waits for its result.
    pub async fn call(&self, procedure: Uri, rpc: RpcCall) -> Result<RpcResult> {
        let request = self.request_ids.generate_id().await?;
        let rx = {
            let state = self.state.lock().await;
            let state = state
                .as_ref()
                .ok_or_else(|| Error::msg("peer is not connected"))?;
            let (tx, rx) = oneshot::channel();
            state.pending.lock().await.calls.insert(request, tx);
            state
                .message_tx
                .send(Message::Call(CallMessage {
                    request,
                    options: Dictionary::default(),
                    procedure,
                    arguments: rpc.arguments,
                    arguments_keyword: rpc.arguments_keyword,
                }))
                .map_err(|_| Error::msg("channel closed"))?;
            rx
        };
        rx.await.map_err(|_| Error::msg("channel closed"))?
    }

    async fn send_request(&self, request: Id, message: Message) -> Result<Message> {
        let rx = {
            let state = self.state.lock().await;
            let state = state
                .as_ref()
                .ok_or_else(|| Error::msg("peer is not connected"))?;
            let (tx, rx) = oneshot::channel();
            state.pending.lock().await.requests.insert(request, tx);
            state
                .message_tx
                .send(message)
                .map_err(|_| Error::msg("channel closed"))?;
            rx
        };
        rx.await.map_err(|_| Error::msg("channel closed"))?
    }

    async fn with_pending<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PendingRequests) -> T,
    {
        let state = self.state.lock().await;
        let state = state
            .as_ref()
            .ok_or_else(|| Error::msg("peer is not connected"))?;
        let mut pending = state.pending.lock().await;
        Ok(f(&mut pending))
    }

    async fn message_handler(
        name: String,
        pending: Arc<Mutex<PendingRequests>>,
        message_tx: UnboundedSender<Message>,
        mut message_rx: broadcast::Receiver<Message>,
        mut end_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                message = message_rx.recv() => {
                    let message = match message {
                        Ok(message) => message,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => continue,
                    };
                    Self::handle_message(&name, &pending, &message_tx, message).await;
                }
                _ = end_rx.recv() => break,
            }
        }
        debug!("Message handler for peer {name} finished");
    }

    async fn handle_message(
        name: &str,
        pending: &Arc<Mutex<PendingRequests>>,
        message_tx: &UnboundedSender<Message>,
        message: Message,
    ) {
        let mut pending = pending.lock().await;
        match message {
            Message::Welcome(message) => {
                if let Some(join) = pending.join.take() {
                    join.send(Ok(message.session)).ok();
                }
            }
            Message::Abort(ref abort) => {
                if let Some(join) = pending.join.take() {
                    join.send(Err(error_from_message(&message)
                        .unwrap_or_else(|_| Error::msg(abort.reason.to_string()))))
                        .ok();
                } else {
                    warn!("Peer {name} session aborted: {}", abort.reason);
                }
            }
            Message::Goodbye(_) => {
                match pending.goodbye.take() {
                    Some(goodbye) => {
                        goodbye.send(()).ok();
                    }
                    None => {
                        // Router-initiated close; respond with the terminal GOODBYE.
                        message_tx.send(goodbye_and_out()).ok();
                    }
                }
            }
            Message::Subscribed(ref subscribed) => {
                Self::resolve_request(&mut pending, subscribed.subscribe_request, message.clone());
            }
            Message::Unsubscribed(ref unsubscribed) => {
                Self::resolve_request(
                    &mut pending,
                    unsubscribed.unsubscribe_request,
                    message.clone(),
                );
            }
            Message::Published(ref published) => {
                Self::resolve_request(&mut pending, published.publish_request, message.clone());
            }
            Message::Registered(ref registered) => {
                Self::resolve_request(&mut pending, registered.register_request, message.clone());
            }
            Message::Unregistered(ref unregistered) => {
                Self::resolve_request(
                    &mut pending,
                    unregistered.unregister_request,
                    message.clone(),
                );
            }
            Message::Result(message) => {
                if let Some(call) = pending.calls.remove(&message.call_request) {
                    call.send(Ok(RpcResult {
                        arguments: message.yield_arguments,
                        arguments_keyword: message.yield_arguments_keyword,
                    }))
                    .ok();
                }
            }
            Message::Event(message) => {
                if let Some(subscription) = pending
                    .subscriptions
                    .get(&message.subscribed_subscription)
                {
                    subscription
                        .send(ReceivedEvent {
                            arguments: message.publish_arguments,
                            arguments_keyword: message.publish_arguments_keyword,
                        })
                        .ok();
                }
            }
            Message::Invocation(message) => {
                if let Some(procedure) = pending
                    .procedures
                    .get(&message.registered_registration)
                {
                    procedure
                        .send(Invocation {
                            request: message.request,
                            arguments: message.call_arguments,
                            arguments_keyword: message.call_arguments_keyword,
                            message_tx: message_tx.clone(),
                        })
                        .ok();
                }
            }
            ref error_message @ Message::Error(ref error) => {
                let err = error_from_message(error_message)
                    .unwrap_or_else(|_| Error::msg(error.error.to_string()));
                if error.request_type == Message::CALL_TAG {
                    if let Some(call) = pending.calls.remove(&error.request) {
                        call.send(Err(err)).ok();
                    }
                } else if let Some(request) = pending.requests.remove(&error.request) {
                    request.send(Err(err)).ok();
                }
            }
            message => {
                debug!(
                    "Peer {name} dropped unexpected {} message",
                    message.message_name()
                );
            }
        }
    }

    fn resolve_request(pending: &mut PendingRequests, request: Id, message: Message) {
        if let Some(tx) = pending.requests.remove(&request) {
            tx.send(Ok(message)).ok();
        }
    }
}
