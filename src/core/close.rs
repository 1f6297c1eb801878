use crate::core::uri::Uri;

/// The reason for closing a WAMP session.
#[derive(Debug, Default, Clone, Copy)]
pub enum CloseReason {
    #[default]
    Normal,
    SystemShutdown,
    CloseRealm,
    GoodbyeAndOut,
}

impl CloseReason {
    /// URI for the close reason.
    pub fn uri(&self) -> Uri {
        match self {
            Self::Normal => Uri::from_known("wamp.close.normal"),
            Self::SystemShutdown => Uri::from_known("wamp.close.system_shutdown"),
            Self::CloseRealm => Uri::from_known("wamp.close.close_realm"),
            // The responder's terminal GOODBYE carries the error namespace.
            Self::GoodbyeAndOut => Uri::from_known("wamp.error.goodbye_and_out"),
        }
    }
}
