use std::{
    net::{
        IpAddr,
        Ipv4Addr,
        SocketAddr,
    },
    sync::Arc,
};

use anyhow::{
    Error,
    Result,
};
use futures_util::lock::Mutex;
use log::{
    debug,
    error,
    info,
    warn,
};
use tokio::{
    net::{
        TcpListener,
        TcpStream,
    },
    sync::{
        broadcast,
        mpsc::{
            unbounded_channel,
            UnboundedReceiver,
            UnboundedSender,
        },
    },
    task::JoinHandle,
};
use tokio_tungstenite::MaybeTlsStream;
use uuid::Uuid;

use crate::{
    core::{
        close::CloseReason,
        error::InteractionError,
        hash::{
            HashMap,
            HashSet,
        },
        id::{
            allocate_unused_id,
            Id,
            IdAllocator,
            RandomIdAllocator,
        },
        roles::{
            peer_roles_from_details,
            router_roles_details,
            RouterRole,
        },
        service::Service,
        stream::MessageStream,
        types::{
            Dictionary,
            Value,
        },
        uri::{
            Uri,
            UriValidation,
        },
    },
    message::{
        common::{
            abort_message_for_error,
            error_for_request,
            goodbye_and_out,
            goodbye_with_close_reason,
        },
        message::{
            CallMessage,
            ErrorMessage,
            EventMessage,
            GoodbyeMessage,
            HelloMessage,
            InvocationMessage,
            Message,
            PublishMessage,
            PublishedMessage,
            RegisterMessage,
            RegisteredMessage,
            ResultMessage,
            SubscribeMessage,
            SubscribedMessage,
            UnregisterMessage,
            UnregisteredMessage,
            UnsubscribeMessage,
            UnsubscribedMessage,
            WelcomeMessage,
            YieldMessage,
        },
    },
    router::{
        acceptor::acceptor::AcceptorFactory,
        connection::{
            Connection,
            ConnectionEvent,
            ConnectionHandle,
        },
        procedure::PendingCall,
        realm::{
            Realm,
            RealmConfig,
            RealmManager,
        },
        session::SessionRecord,
    },
    serializer::serializer::new_serializer,
    transport::transport::TransportFactory,
};

const DEFAULT_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

/// Configuration for a [`Router`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// IP address the router starts on.
    pub address: IpAddr,
    /// Network port the router starts on.
    pub port: u16,
    /// HTTP path accepting the WebSocket upgrade.
    pub path: String,
    /// Agent name, communicated to peers.
    pub agent: String,
    /// Realms available on the router at startup.
    pub realms: Vec<RealmConfig>,
    /// Validate URIs against the strict pattern instead of the loose one.
    pub validate_strict_uris: bool,
    /// Create realms on first HELLO instead of rejecting them.
    pub auto_create_realms: bool,
    /// Abort sessions saying HELLO to unknown realms, even when realms are auto-created.
    pub abort_unknown_realms: bool,
    /// Log and skip malformed inbound frames instead of disconnecting the peer.
    pub drop_offending_messages: bool,
}

impl RouterConfig {
    /// The URI validation level used for inbound frames.
    pub fn uri_validation(&self) -> UriValidation {
        if self.validate_strict_uris {
            UriValidation::Strict
        } else {
            UriValidation::Loose
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 0,
            path: "/".to_owned(),
            agent: DEFAULT_AGENT.to_owned(),
            realms: Vec::default(),
            validate_strict_uris: false,
            auto_create_realms: true,
            abort_unknown_realms: false,
            drop_offending_messages: false,
        }
    }
}

/// A handle to an asynchronously-running [`Router`].
///
/// The router's ownership is transferred away when it starts. This handle allows interaction with
/// the router as it is running asynchronously.
pub struct RouterHandle {
    local_addr: SocketAddr,
    cancel_tx: broadcast::Sender<()>,
}

impl RouterHandle {
    /// Cancels the router.
    ///
    /// Cancellation is asynchronous. Open sessions receive a final GOODBYE before their
    /// connections close. Await the join handle returned from [`Router::start`] to wait for the
    /// router to stop.
    pub fn cancel(&self) -> Result<()> {
        self.cancel_tx.send(()).map(|_| ()).map_err(Error::new)
    }

    /// The local address of the router.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// A WAMP router (a.k.a., server) that accepts incoming connections and routes messages between
/// sessions.
///
/// All realm, session, subscription, and registration state is owned by a single router task;
/// connections deliver events into its mailbox and own nothing but their bounded outbound queue.
pub struct Router<S> {
    config: RouterConfig,
    acceptor_factory: Mutex<Box<dyn AcceptorFactory<S>>>,
    transport_factory: Mutex<Box<dyn TransportFactory<S>>>,
    id_allocator: Arc<Box<dyn IdAllocator>>,
    cancel_tx: broadcast::Sender<()>,
}

impl<S> Router<S>
where
    S: Send + 'static,
{
    /// Creates a new [`Router`].
    pub fn new(
        config: RouterConfig,
        acceptor_factory: Box<dyn AcceptorFactory<S>>,
        transport_factory: Box<dyn TransportFactory<S>>,
    ) -> Result<Self> {
        let (cancel_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            acceptor_factory: Mutex::new(acceptor_factory),
            transport_factory: Mutex::new(transport_factory),
            id_allocator: Arc::new(Box::new(RandomIdAllocator::default())),
            cancel_tx,
        })
    }

    /// Replaces the allocator used for global- and router-scope IDs.
    ///
    /// Intended for tests that want deterministic IDs.
    pub fn with_id_allocator(mut self, id_allocator: Box<dyn IdAllocator>) -> Self {
        self.id_allocator = Arc::new(id_allocator);
        self
    }

    /// Starts the router asynchronously.
    ///
    /// The returned handle can be used to interact with the router since its ownership is
    /// transferred away. The returned join handle finishes when the router has fully stopped.
    pub async fn start(self) -> Result<(RouterHandle, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.config.address, self.config.port);
        info!(
            "Starting router {} at {addr}: {:?}",
            self.config.agent, self.config
        );
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        let cancel_tx = self.cancel_tx.clone();
        let (event_tx, event_rx) = unbounded_channel();

        let state = RouterState::new(&self.config, self.id_allocator.clone());
        let state_handle = tokio::spawn(Self::state_loop(
            state,
            event_rx,
            self.cancel_tx.subscribe(),
        ));

        let router = Arc::new(self);
        let start_handle = tokio::spawn(async move {
            Self::connection_loop(&router, listener, event_tx).await;
            if let Err(err) = state_handle.await {
                error!("Router state task failed: {err}");
            }
        });

        Ok((
            RouterHandle {
                local_addr,
                cancel_tx,
            },
            start_handle,
        ))
    }

    async fn connection_loop(
        router: &Arc<Router<S>>,
        listener: TcpListener,
        event_tx: UnboundedSender<ConnectionEvent>,
    ) {
        let mut cancel_rx = router.cancel_tx.subscribe();

        loop {
            tokio::select! {
                accept = listener.accept() => {
                    let (stream, addr) = match accept {
                        Ok((stream, addr)) => (stream, addr),
                        Err(_) => break,
                    };
                    tokio::spawn(Self::handle_connection(
                        router.clone(),
                        addr,
                        MaybeTlsStream::Plain(stream),
                        event_tx.clone(),
                    ));
                }
                _ = cancel_rx.recv() => {
                    break;
                }
            }
        }
    }

    async fn handle_connection(
        router: Arc<Router<S>>,
        addr: SocketAddr,
        stream: MaybeTlsStream<TcpStream>,
        event_tx: UnboundedSender<ConnectionEvent>,
    ) {
        if let Err(err) = Self::start_connection(&router, addr, stream, event_tx).await {
            error!("Failed to start handling connection from {addr}: {err}");
        }
    }

    async fn start_connection(
        router: &Arc<Router<S>>,
        addr: SocketAddr,
        stream: MaybeTlsStream<TcpStream>,
        event_tx: UnboundedSender<ConnectionEvent>,
    ) -> Result<()> {
        debug!("Incoming TCP connection from {addr}");
        let acceptor = router.acceptor_factory.lock().await.new_acceptor();
        let acceptance = acceptor.accept(&router.config, stream).await?;
        debug!("WAMP connection established with {addr}");

        let serializer = new_serializer(acceptance.serializer, router.config.uri_validation());
        let transport = router
            .transport_factory
            .lock()
            .await
            .new_transport(acceptance.stream);

        let connection = Connection::new();
        info!("Created connection {} for {addr}", connection.uuid());
        let service = Service::new(
            connection.uuid().to_string(),
            MessageStream::new(transport, serializer),
            router.config.drop_offending_messages,
        );
        connection.start(service, event_tx);
        Ok(())
    }

    async fn state_loop(
        mut state: RouterState,
        mut event_rx: UnboundedReceiver<ConnectionEvent>,
        mut cancel_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => {
                            if let Err(err) = state.handle_event(event).await {
                                error!("Router failed to handle event: {err:#}");
                            }
                        }
                        None => break,
                    }
                }
                _ = cancel_rx.recv() => {
                    state.shut_down();
                    break;
                }
            }
        }
    }
}

/// All routing state, owned by the single router task.
struct RouterState {
    agent: String,
    auto_create_realms: bool,
    abort_unknown_realms: bool,
    id_allocator: Arc<Box<dyn IdAllocator>>,
    realms: RealmManager,
    connections: HashMap<Uuid, ConnectionHandle>,
    sessions: HashMap<Uuid, SessionRecord>,
    connections_by_session: HashMap<Id, Uuid>,
}

impl RouterState {
    fn new(config: &RouterConfig, id_allocator: Arc<Box<dyn IdAllocator>>) -> Self {
        let mut realms = RealmManager::default();
        for realm_config in &config.realms {
            realms.insert(Realm::new(realm_config.uri.clone()));
        }
        Self {
            agent: config.agent.clone(),
            auto_create_realms: config.auto_create_realms,
            abort_unknown_realms: config.abort_unknown_realms,
            id_allocator,
            realms,
            connections: HashMap::default(),
            sessions: HashMap::default(),
            connections_by_session: HashMap::default(),
        }
    }

    async fn handle_event(&mut self, event: ConnectionEvent) -> Result<()> {
        match event {
            ConnectionEvent::Connected(handle) => {
                self.connections.insert(handle.uuid(), handle);
                Ok(())
            }
            ConnectionEvent::Disconnected(conn) => {
                self.connections.remove(&conn);
                self.release_session(conn);
                Ok(())
            }
            ConnectionEvent::Received(conn, message) => self.handle_message(conn, message).await,
        }
    }

    async fn handle_message(&mut self, conn: Uuid, message: Message) -> Result<()> {
        debug!(
            "Received {} message from connection {conn}",
            message.message_name()
        );
        match message {
            Message::Hello(message) => self.handle_hello(conn, message).await,
            Message::Goodbye(message) => self.handle_goodbye(conn, message),
            Message::Abort(message) => {
                // The router does not act on client-origin ABORT.
                debug!(
                    "Connection {conn} aborted with reason {}; dropped",
                    message.reason
                );
                Ok(())
            }
            message => {
                if !self.sessions.contains_key(&conn) {
                    debug!(
                        "Dropped {} message from connection {conn} with no open session",
                        message.message_name()
                    );
                    return Ok(());
                }
                match message {
                    Message::Subscribe(message) => self.handle_subscribe(conn, message).await,
                    Message::Unsubscribe(message) => self.handle_unsubscribe(conn, message),
                    Message::Publish(message) => self.handle_publish(conn, message).await,
                    Message::Register(message) => self.handle_register(conn, message).await,
                    Message::Unregister(message) => self.handle_unregister(conn, message),
                    Message::Call(message) => self.handle_call(conn, message).await,
                    Message::Yield(message) => self.handle_yield(conn, message),
                    Message::Error(message)
                        if message.request_type == Message::INVOCATION_TAG =>
                    {
                        self.handle_invocation_error(conn, message)
                    }
                    message => {
                        debug!(
                            "Dropped {} message from connection {conn}",
                            message.message_name()
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    async fn handle_hello(&mut self, conn: Uuid, message: HelloMessage) -> Result<()> {
        if self.sessions.contains_key(&conn) {
            // The second HELLO closes the session, not the connection.
            self.send(
                conn,
                abort_message_for_error(&InteractionError::SessionAlreadyOpen.into()),
            );
            self.release_session(conn);
            return Ok(());
        }

        if !self.realms.contains(&message.realm) {
            if self.abort_unknown_realms || !self.auto_create_realms {
                self.send(
                    conn,
                    abort_message_for_error(
                        &InteractionError::NoSuchRealm(format!(
                            "The realm {} does not exist.",
                            message.realm
                        ))
                        .into(),
                    ),
                );
                return Ok(());
            }
            info!("Realm {} created for connection {conn}", message.realm);
            self.realms.insert(Realm::new(message.realm.clone()));
        }

        let session_id = self.fresh_session_id().await?;
        let roles = peer_roles_from_details(&message.details);
        self.sessions.insert(
            conn,
            SessionRecord::new(session_id, message.realm.clone(), roles),
        );
        self.connections_by_session.insert(session_id, conn);
        info!(
            "Session {session_id} joined realm {} on connection {conn}",
            message.realm
        );

        let mut details = Dictionary::default();
        details.insert("agent".to_owned(), Value::String(self.agent.clone()));
        details.insert(
            "roles".to_owned(),
            Value::Object(router_roles_details([
                RouterRole::Broker,
                RouterRole::Dealer,
            ])),
        );
        self.send(
            conn,
            Message::Welcome(WelcomeMessage {
                session: session_id,
                details,
            }),
        );
        Ok(())
    }

    fn handle_goodbye(&mut self, conn: Uuid, message: GoodbyeMessage) -> Result<()> {
        if !self.sessions.contains_key(&conn) {
            debug!("Dropped GOODBYE from connection {conn} with no open session");
            return Ok(());
        }
        debug!(
            "Connection {conn} said GOODBYE with reason {}",
            message.reason
        );
        self.release_session(conn);
        self.send(conn, goodbye_and_out());
        Ok(())
    }

    async fn handle_subscribe(&mut self, conn: Uuid, message: SubscribeMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;
        let fresh_id = self.fresh_router_id().await?;
        let realm = self.realm_mut(&realm_uri)?;
        let subscription =
            realm
                .topic_manager
                .subscribe(session_id, message.topic.clone(), fresh_id);
        self.send(
            conn,
            Message::Subscribed(SubscribedMessage {
                subscribe_request: message.request,
                subscription,
            }),
        );
        Ok(())
    }

    fn handle_unsubscribe(&mut self, conn: Uuid, message: UnsubscribeMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;
        let realm = self.realm_mut(&realm_uri)?;
        match realm
            .topic_manager
            .unsubscribe(session_id, message.subscribed_subscription)
        {
            Ok(()) => {
                self.send(
                    conn,
                    Message::Unsubscribed(UnsubscribedMessage {
                        unsubscribe_request: message.request,
                    }),
                );
            }
            Err(err) => {
                let request = Message::Unsubscribe(message);
                self.send(conn, error_for_request(&request, &err.into()));
            }
        }
        Ok(())
    }

    async fn handle_publish(&mut self, conn: Uuid, message: PublishMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;
        let exclude_me = message
            .options
            .get("exclude_me")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let acknowledge = message
            .options
            .get("acknowledge")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let publication = self.fresh_router_id().await?;
        let realm = self.realm_mut(&realm_uri)?;
        let mut events = Vec::new();
        if let Some((subscription, state)) =
            realm.topic_manager.subscription_for_topic(&message.topic)
        {
            for &subscriber in &state.subscribers {
                if subscriber == session_id && exclude_me {
                    continue;
                }
                events.push((
                    subscriber,
                    EventMessage {
                        subscribed_subscription: subscription,
                        published_publication: publication,
                        details: Dictionary::default(),
                        publish_arguments: message.arguments.clone(),
                        publish_arguments_keyword: message.arguments_keyword.clone(),
                    },
                ));
            }
        }
        for (subscriber, event) in events {
            self.send_to_session(subscriber, Message::Event(event));
        }

        if acknowledge {
            self.send(
                conn,
                Message::Published(PublishedMessage {
                    publish_request: message.request,
                    publication,
                }),
            );
        }
        Ok(())
    }

    async fn handle_register(&mut self, conn: Uuid, message: RegisterMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;
        let fresh_id = self.fresh_router_id().await?;
        let realm = self.realm_mut(&realm_uri)?;
        match realm
            .procedure_manager
            .register(session_id, message.procedure.clone(), fresh_id)
        {
            Ok(registration) => {
                self.send(
                    conn,
                    Message::Registered(RegisteredMessage {
                        register_request: message.request,
                        registration,
                    }),
                );
            }
            Err(err) => {
                let request = Message::Register(message);
                self.send(conn, error_for_request(&request, &err.into()));
            }
        }
        Ok(())
    }

    fn handle_unregister(&mut self, conn: Uuid, message: UnregisterMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;
        let realm = self.realm_mut(&realm_uri)?;
        match realm
            .procedure_manager
            .unregister(session_id, message.registered_registration)
        {
            Ok(canceled) => {
                self.send(
                    conn,
                    Message::Unregistered(UnregisteredMessage {
                        unregister_request: message.request,
                    }),
                );
                for pending in canceled {
                    self.fail_pending_call(pending);
                }
            }
            Err(err) => {
                let request = Message::Unregister(message);
                self.send(conn, error_for_request(&request, &err.into()));
            }
        }
        Ok(())
    }

    async fn handle_call(&mut self, conn: Uuid, message: CallMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;

        let registration = {
            let realm = self.realm_mut(&realm_uri)?;
            realm
                .procedure_manager
                .registration_for_procedure(&message.procedure)
                .map(|(registration_id, registration)| (registration_id, registration.callee))
        };
        let (registration_id, callee) = match registration {
            Some(registration) => registration,
            None => {
                let request = Message::Call(message);
                self.send(
                    conn,
                    error_for_request(&request, &InteractionError::NoSuchProcedure.into()),
                );
                return Ok(());
            }
        };

        // The INVOCATION request ID is minted in the callee's session scope.
        let invocation_request = {
            let callee_conn = self.connections_by_session.get(&callee);
            let callee_record = callee_conn.and_then(|conn| self.sessions.get(conn));
            match callee_record {
                Some(record) => record.invocation_ids.generate_id().await?,
                None => {
                    let request = Message::Call(message);
                    self.send(
                        conn,
                        error_for_request(&request, &InteractionError::NoSuchProcedure.into()),
                    );
                    return Ok(());
                }
            }
        };

        let realm = self.realm_mut(&realm_uri)?;
        realm.procedure_manager.add_pending_call(
            callee,
            invocation_request,
            PendingCall {
                call_request: message.request,
                caller: session_id,
                registration: registration_id,
            },
        );
        self.send_to_session(
            callee,
            Message::Invocation(InvocationMessage {
                request: invocation_request,
                registered_registration: registration_id,
                details: Dictionary::default(),
                call_arguments: message.arguments,
                call_arguments_keyword: message.arguments_keyword,
            }),
        );
        Ok(())
    }

    fn handle_yield(&mut self, conn: Uuid, message: YieldMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;
        let realm = self.realm_mut(&realm_uri)?;
        let pending = realm
            .procedure_manager
            .take_pending_call(session_id, message.invocation_request);
        match pending {
            Some(pending) => {
                self.send_to_session(
                    pending.caller,
                    Message::Result(ResultMessage {
                        call_request: pending.call_request,
                        details: Dictionary::default(),
                        yield_arguments: message.arguments,
                        yield_arguments_keyword: message.arguments_keyword,
                    }),
                );
            }
            None => {
                debug!(
                    "Dropped YIELD for unknown invocation {} from connection {conn}",
                    message.invocation_request
                );
            }
        }
        Ok(())
    }

    fn handle_invocation_error(&mut self, conn: Uuid, message: ErrorMessage) -> Result<()> {
        let (session_id, realm_uri) = self.open_session(conn)?;
        let realm = self.realm_mut(&realm_uri)?;
        let pending = realm
            .procedure_manager
            .take_pending_call(session_id, message.request);
        match pending {
            Some(pending) => {
                self.send_to_session(
                    pending.caller,
                    Message::Error(ErrorMessage {
                        request_type: Message::CALL_TAG,
                        request: pending.call_request,
                        details: message.details,
                        error: message.error,
                        arguments: message.arguments,
                        arguments_keyword: message.arguments_keyword,
                    }),
                );
            }
            None => {
                debug!(
                    "Dropped ERROR for unknown invocation {} from connection {conn}",
                    message.request
                );
            }
        }
        Ok(())
    }

    /// Fails an in-flight call back to its caller.
    fn fail_pending_call(&mut self, pending: PendingCall) {
        let request = Message::Call(CallMessage {
            request: pending.call_request,
            ..Default::default()
        });
        let error = error_for_request(&request, &InteractionError::Canceled.into());
        self.send_to_session(pending.caller, error);
    }

    /// Releases everything the session on this connection owns.
    ///
    /// Idempotent; releasing a connection with no session is a no-op.
    fn release_session(&mut self, conn: Uuid) {
        let record = match self.sessions.remove(&conn) {
            Some(record) => record,
            None => return,
        };
        self.connections_by_session.remove(&record.id);
        let failed = match self.realms.get_mut(&record.realm) {
            Some(realm) => {
                realm.topic_manager.release_session(record.id);
                let failed = realm.procedure_manager.release_callee(record.id);
                realm.procedure_manager.discard_caller(record.id);
                failed
            }
            None => Vec::new(),
        };
        for pending in failed {
            self.fail_pending_call(pending);
        }
        info!("Session {} on connection {conn} closed", record.id);
    }

    fn shut_down(&mut self) {
        info!("Router shutting down with {} sessions", self.sessions.len());
        let conns = self.sessions.keys().cloned().collect::<Vec<_>>();
        for conn in conns {
            self.send(conn, goodbye_with_close_reason(CloseReason::SystemShutdown));
            self.release_session(conn);
        }
        for handle in self.connections.values() {
            handle.disconnect();
        }
        self.connections.clear();
    }

    /// The open session on a connection.
    ///
    /// Callers dispatching broker/dealer messages have already checked the session exists.
    fn open_session(&self, conn: Uuid) -> Result<(Id, Uri)> {
        self.sessions
            .get(&conn)
            .map(|record| (record.id, record.realm.clone()))
            .ok_or_else(|| Error::msg("expected an open session"))
    }

    fn realm_mut(&mut self, uri: &Uri) -> Result<&mut Realm> {
        self.realms
            .get_mut(uri)
            .ok_or_else(|| Error::msg(format!("expected realm {uri} to exist")))
    }

    fn send(&self, conn: Uuid, message: Message) {
        let handle = match self.connections.get(&conn) {
            Some(handle) => handle,
            None => {
                debug!("Dropped outbound message for unknown connection {conn}");
                return;
            }
        };
        if let Err(err) = handle.send(message) {
            // Overflowing the bounded outbound buffer fails the connection; cleanup follows
            // from the Disconnected event.
            warn!("Failed to queue message for connection {conn}: {err}");
            handle.disconnect();
        }
    }

    fn send_to_session(&self, session: Id, message: Message) {
        match self.connections_by_session.get(&session) {
            Some(&conn) => self.send(conn, message),
            None => debug!("Dropped outbound message for unknown session {session}"),
        }
    }

    async fn fresh_session_id(&self) -> Result<Id> {
        let in_use = self
            .connections_by_session
            .keys()
            .cloned()
            .collect::<HashSet<_>>();
        allocate_unused_id(&**self.id_allocator, &in_use).await
    }

    async fn fresh_router_id(&self) -> Result<Id> {
        let in_use = self.realms.router_scope_ids();
        allocate_unused_id(&**self.id_allocator, &in_use).await
    }
}
