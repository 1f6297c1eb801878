mod connector;
mod peer;
mod web_socket_peer;

pub use peer::{
    Invocation,
    Peer,
    PeerConfig,
    Procedure,
    PublishedEvent,
    ReceivedEvent,
    RpcCall,
    RpcResult,
    RpcYield,
    Subscription,
};
pub use web_socket_peer::{
    new_web_socket_peer,
    WebSocketPeer,
};
