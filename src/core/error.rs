use anyhow::Error;
use thiserror::Error;

use crate::{
    core::{
        types::Value,
        uri::Uri,
    },
    message::message::Message,
};

/// A basic error that occurs while processing a WAMP message.
#[derive(Debug, Error)]
pub enum BasicError {
    /// A generic resource was not found.
    ///
    /// WAMP defines standard URIs for not finding specific resource types. This error should only
    /// be used when the standard URI cannot be used.
    #[error("{0}")]
    NotFound(String),
    /// An invalid argument was passed.
    #[error("{0}")]
    InvalidArgument(String),
    /// The operation is not allowed based on process configuration.
    #[error("{0}")]
    NotAllowed(String),
    /// Some internal error occurred.
    ///
    /// Should only be used when there is no other error variant that describes the error, since
    /// the message is very vague and not very useful for debugging.
    #[error("{0}")]
    Internal(String),
}

impl BasicError {
    /// The trailing URI component for the error.
    pub fn uri_component(&self) -> &str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotAllowed(_) => "not_allowed",
            Self::Internal(_) => "internal",
        }
    }
}

/// An interaction error that occurs while processing a WAMP message.
///
/// Interaction errors are clearly defined in the WAMP standard and are reserved for errors that
/// peers must be able to parse easily.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The incoming message violates the WAMP protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// The procedure being called does not exist.
    #[error("no such procedure")]
    NoSuchProcedure,
    /// The procedure being registered already exists.
    #[error("procedure already exists")]
    ProcedureAlreadyExists,
    /// The registration being referenced does not exist.
    #[error("no such registration")]
    NoSuchRegistration,
    /// The subscription being referenced does not exist.
    #[error("no such subscription")]
    NoSuchSubscription,
    /// The realm being referenced does not exist.
    #[error("{0}")]
    NoSuchRealm(String),
    /// The call was canceled before its result arrived.
    #[error("canceled")]
    Canceled,
    /// A second session was opened on a connection that already has one.
    #[error("session already open")]
    SessionAlreadyOpen,
}

impl InteractionError {
    /// The trailing URI component for the error.
    pub fn uri_component(&self) -> &str {
        match self {
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::NoSuchProcedure => "no_such_procedure",
            Self::ProcedureAlreadyExists => "procedure_already_exists",
            Self::NoSuchRegistration => "no_such_registration",
            Self::NoSuchSubscription => "no_such_subscription",
            Self::NoSuchRealm(_) => "no_such_realm",
            Self::Canceled => "canceled",
            Self::SessionAlreadyOpen => "session_already_open",
        }
    }

    /// The full URI reason for the error.
    pub fn uri(&self) -> Uri {
        match self {
            Self::SessionAlreadyOpen => Uri::from_known("akka.wamp.error.session_already_open"),
            _ => Uri::from_known(format!("wamp.error.{}", self.uri_component())),
        }
    }
}

/// An application-level error, correlated to a request and carrying its own reason URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {message}")]
pub struct WampError {
    pub reason: Uri,
    pub message: String,
}

impl WampError {
    /// Creates a new error from a reason URI and a message.
    pub fn new<S>(reason: Uri, message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// The URI reason reported for an error.
pub fn uri_for_error(error: &Error) -> Uri {
    if let Some(error) = error.downcast_ref::<InteractionError>() {
        return error.uri();
    }
    if let Some(error) = error.downcast_ref::<BasicError>() {
        return Uri::from_known(format!("wamp.error.{}", error.uri_component()));
    }
    if let Some(error) = error.downcast_ref::<WampError>() {
        return error.reason.clone();
    }
    Uri::from_known("wamp.error.internal")
}

/// Creates an [`struct@Error`] from a URI error reason and message.
pub fn error_from_uri_reason_and_message(reason: Uri, message: String) -> Error {
    match reason.as_ref() {
        "wamp.error.not_found" => BasicError::NotFound(message).into(),
        "wamp.error.invalid_argument" => BasicError::InvalidArgument(message).into(),
        "wamp.error.not_allowed" => BasicError::NotAllowed(message).into(),
        "wamp.error.protocol_violation" => InteractionError::ProtocolViolation(message).into(),
        "wamp.error.no_such_procedure" => InteractionError::NoSuchProcedure.into(),
        "wamp.error.procedure_already_exists" => InteractionError::ProcedureAlreadyExists.into(),
        "wamp.error.no_such_registration" => InteractionError::NoSuchRegistration.into(),
        "wamp.error.no_such_subscription" => InteractionError::NoSuchSubscription.into(),
        "wamp.error.no_such_realm" => InteractionError::NoSuchRealm(message).into(),
        "wamp.error.canceled" => InteractionError::Canceled.into(),
        "akka.wamp.error.session_already_open" => InteractionError::SessionAlreadyOpen.into(),
        _ => WampError::new(reason, message).into(),
    }
}

/// Extracts a URI error reason and message from a WAMP message.
pub fn extract_error_uri_reason_and_message(message: &Message) -> Result<(&Uri, &str), Error> {
    let reason = match message.reason() {
        Some(reason) => reason,
        None => return Err(Error::msg("message does not contain a reason uri")),
    };
    let message = match message.details().and_then(|details| details.get("message")) {
        Some(Value::String(message)) => message.as_str(),
        _ => "unknown error",
    };
    Ok((reason, message))
}

/// Constructs an [`struct@Error`] from a WAMP message.
///
/// Fails if the message does not describe any error.
pub fn error_from_message(message: &Message) -> Result<Error, Error> {
    let (uri, message) = extract_error_uri_reason_and_message(message)?;
    Ok(error_from_uri_reason_and_message(
        uri.clone(),
        message.to_owned(),
    ))
}

/// An error that occurs while turning an inbound frame into a WAMP message.
///
/// Offending frames are handled by the transport pipeline's supervision policy, not by the
/// router's state machine.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not well-formed JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// The frame does not match the schema for its message code.
    #[error("{0}")]
    Schema(String),
    /// The leading code does not name a known message kind.
    #[error("unknown message code {0}")]
    UnknownCode(u64),
    /// The frame itself cannot carry a WAMP message.
    #[error("{0}")]
    Frame(String),
}

