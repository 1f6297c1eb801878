use anyhow::Result;
use async_trait::async_trait;

use crate::serializer::serializer::SerializerType;

/// The result of a [`Connector`] successfully establishing a WAMP connection.
pub struct Connection<S> {
    /// The established stream.
    pub stream: S,

    /// The negotiated serializer.
    pub serializer: SerializerType,
}

/// A connector, which establishes WAMP connections to a router over a stream.
#[async_trait]
pub trait Connector<S>: Send {
    /// Connects to the router at the given URI.
    async fn connect(&self, uri: &str) -> Result<Connection<S>>;
}

/// A factory for creating a new [`Connector`].
pub trait ConnectorFactory<S>: Send + Sync {
    /// Creates a new [`Connector`].
    fn new_connector(&self) -> Box<dyn Connector<S>>;
}
