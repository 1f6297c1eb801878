use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        client::IntoClientRequest,
        http::{
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue,
        },
    },
    MaybeTlsStream,
    WebSocketStream,
};

use crate::{
    peer::connector::connector::{
        Connection,
        Connector,
        ConnectorFactory,
    },
    serializer::serializer::SerializerType,
};

/// A connector for WebSocket connections, negotiating the `wamp.2.json` sub-protocol.
#[derive(Default)]
struct WebSocketConnector {}

#[async_trait]
impl Connector<WebSocketStream<MaybeTlsStream<TcpStream>>> for WebSocketConnector {
    async fn connect(
        &self,
        uri: &str,
    ) -> Result<Connection<WebSocketStream<MaybeTlsStream<TcpStream>>>> {
        let mut request = uri.into_client_request()?;
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_str(SerializerType::Json.uri().as_ref())?,
        );
        let (stream, response) = tokio_tungstenite::connect_async(request).await?;
        let selected = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|header| header.to_str().ok())
            .and_then(|protocol| SerializerType::try_from(protocol).ok());
        let serializer = match selected {
            Some(serializer) => serializer,
            None => return Err(Error::msg("router did not select a supported sub-protocol")),
        };
        Ok(Connection { stream, serializer })
    }
}

/// A factory for [`WebSocketConnector`].
#[derive(Default)]
pub struct WebSocketConnectorFactory {}

impl ConnectorFactory<WebSocketStream<MaybeTlsStream<TcpStream>>> for WebSocketConnectorFactory {
    fn new_connector(&self) -> Box<dyn Connector<WebSocketStream<MaybeTlsStream<TcpStream>>>> {
        Box::new(WebSocketConnector::default())
    }
}
