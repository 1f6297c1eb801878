use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        handshake::server::{
            ErrorResponse,
            Request,
            Response,
        },
        http::{
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue,
            StatusCode,
        },
    },
    MaybeTlsStream,
    WebSocketStream,
};

use crate::{
    core::hash::HashSet,
    router::{
        acceptor::acceptor::{
            Acceptance,
            Acceptor,
            AcceptorFactory,
        },
        router::RouterConfig,
    },
    serializer::serializer::SerializerType,
};

struct WebSocketWampNegotiator {
    path: String,
    supported_protocols: HashSet<String>,
    selected_protocol: Option<String>,
}

impl WebSocketWampNegotiator {
    fn new(config: &RouterConfig) -> Self {
        let supported_protocols =
            HashSet::from_iter([SerializerType::Json.uri().as_ref().to_owned()]);
        Self {
            path: config.path.clone(),
            supported_protocols,
            selected_protocol: None,
        }
    }

    fn reject_response<S>(&self, message: S) -> ErrorResponse
    where
        S: Into<String>,
    {
        let mut response = ErrorResponse::new(Some(message.into()));
        *response.status_mut() = StatusCode::BAD_REQUEST;
        // Advertise the supported sub-protocols on rejection, so the peer can retry correctly.
        for protocol in &self.supported_protocols {
            if let Ok(header) = HeaderValue::from_str(protocol) {
                response
                    .headers_mut()
                    .insert(SEC_WEBSOCKET_PROTOCOL, header);
            }
        }
        response
    }

    fn supported_protocols_body(&self) -> String {
        let mut protocols = self
            .supported_protocols
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        protocols.sort();
        format!("supported sub-protocols: {}", protocols.join(", "))
    }

    fn negotiate(
        &mut self,
        request: &Request,
        mut response: Response,
    ) -> Result<Response, ErrorResponse> {
        if request.uri().path() != self.path {
            return Err(self.reject_response(format!(
                "no WebSocket endpoint at {}",
                request.uri().path()
            )));
        }
        let selected_protocol = request
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|protocols| match protocols.to_str() {
                Ok(protocols) => protocols
                    .split(',')
                    .map(|protocol| protocol.trim())
                    .find(|protocol| self.supported_protocols.contains(*protocol)),
                Err(_) => None,
            });
        let selected_protocol = match selected_protocol {
            Some(protocol) => protocol,
            None => return Err(self.reject_response(self.supported_protocols_body())),
        };
        self.selected_protocol = Some(selected_protocol.to_owned());
        let header = match HeaderValue::from_str(selected_protocol) {
            Ok(header) => header,
            Err(_) => {
                return Err(self.reject_response("failed to create response header"))
            }
        };
        response
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, header);
        Ok(response)
    }
}

#[derive(Default)]
struct WebSocketAcceptor {}

#[async_trait]
impl Acceptor<WebSocketStream<MaybeTlsStream<TcpStream>>> for WebSocketAcceptor {
    async fn accept(
        &self,
        config: &RouterConfig,
        stream: MaybeTlsStream<TcpStream>,
    ) -> Result<Acceptance<WebSocketStream<MaybeTlsStream<TcpStream>>>> {
        let mut negotiator = WebSocketWampNegotiator::new(config);
        let stream = tokio_tungstenite::accept_hdr_async(
            stream,
            |request: &Request, response: Response| negotiator.negotiate(request, response),
        )
        .await?;
        let protocol = match negotiator.selected_protocol {
            Some(protocol) => protocol,
            None => return Err(Error::msg("expected protocol after negotiation")),
        };
        let serializer = SerializerType::try_from(protocol.as_str()).map_err(Error::msg)?;
        Ok(Acceptance { stream, serializer })
    }
}

/// A factory for an [`Acceptor`] for WebSocket connections.
#[derive(Default)]
pub struct WebSocketAcceptorFactory {}

impl AcceptorFactory<WebSocketStream<MaybeTlsStream<TcpStream>>> for WebSocketAcceptorFactory {
    fn new_acceptor(&self) -> Box<dyn Acceptor<WebSocketStream<MaybeTlsStream<TcpStream>>> + Send> {
        Box::new(WebSocketAcceptor::default())
    }
}

#[cfg(test)]
mod web_socket_acceptor_test {
    use tokio_tungstenite::tungstenite::{
        handshake::server::{
            Request,
            Response,
        },
        http::{
            header::SEC_WEBSOCKET_PROTOCOL,
            StatusCode,
        },
    };

    use crate::router::{
        acceptor::web_socket_acceptor::WebSocketWampNegotiator,
        router::RouterConfig,
    };

    fn request(path: &str, protocol: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(format!("http://localhost{path}"));
        if let Some(protocol) = protocol {
            builder = builder.header(SEC_WEBSOCKET_PROTOCOL, protocol);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn selects_json_sub_protocol() {
        let mut negotiator = WebSocketWampNegotiator::new(&RouterConfig::default());
        let response = negotiator
            .negotiate(&request("/", Some("wamp.2.json")), Response::default())
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(SEC_WEBSOCKET_PROTOCOL)
                .and_then(|header| header.to_str().ok()),
            Some("wamp.2.json"),
        );
        assert_eq!(negotiator.selected_protocol.as_deref(), Some("wamp.2.json"));
    }

    #[test]
    fn selects_json_among_offered_sub_protocols() {
        let mut negotiator = WebSocketWampNegotiator::new(&RouterConfig::default());
        assert_matches::assert_matches!(
            negotiator.negotiate(
                &request("/", Some("wamp.2.msgpack, wamp.2.json")),
                Response::default(),
            ),
            Ok(_)
        );
        assert_eq!(negotiator.selected_protocol.as_deref(), Some("wamp.2.json"));
    }

    #[test]
    fn rejects_missing_sub_protocol_with_supported_list() {
        let mut negotiator = WebSocketWampNegotiator::new(&RouterConfig::default());
        assert_matches::assert_matches!(
            negotiator.negotiate(&request("/", None), Response::default()),
            Err(response) => {
                assert_eq!(response.status(), StatusCode::BAD_REQUEST);
                assert_eq!(
                    response
                        .headers()
                        .get(SEC_WEBSOCKET_PROTOCOL)
                        .and_then(|header| header.to_str().ok()),
                    Some("wamp.2.json"),
                );
                assert_eq!(
                    response.body().as_deref(),
                    Some("supported sub-protocols: wamp.2.json"),
                );
            }
        );
    }

    #[test]
    fn rejects_unsupported_sub_protocol() {
        let mut negotiator = WebSocketWampNegotiator::new(&RouterConfig::default());
        assert_matches::assert_matches!(
            negotiator.negotiate(&request("/", Some("wamp.2.msgpack")), Response::default()),
            Err(response) => {
                assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            }
        );
    }

    #[test]
    fn rejects_unknown_path() {
        let mut config = RouterConfig::default();
        config.path = "/ws".to_owned();
        let mut negotiator = WebSocketWampNegotiator::new(&config);
        assert_matches::assert_matches!(
            negotiator.negotiate(&request("/other", Some("wamp.2.json")), Response::default()),
            Err(response) => {
                assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            }
        );
        assert_matches::assert_matches!(
            negotiator.negotiate(&request("/ws", Some("wamp.2.json")), Response::default()),
            Ok(_)
        );
    }
}
