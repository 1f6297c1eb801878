mod acceptor;
mod connection;
mod procedure;
mod realm;
mod router;
mod session;
mod topic;
mod web_socket_router;

pub use realm::RealmConfig;
pub use router::{
    Router,
    RouterConfig,
    RouterHandle,
};
pub use web_socket_router::{
    new_web_socket_router,
    WebSocketRouter,
};
