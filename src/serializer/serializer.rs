use std::fmt::Debug;

use anyhow::Result;

use crate::{
    core::{
        error::DecodeError,
        uri::{
            Uri,
            UriValidation,
        },
    },
    message::message::Message,
    serializer::json::JsonSerializer,
};

/// The type of serializer to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SerializerType {
    /// Serializes messages to and from JavaScript Object Notation.
    Json,
}

impl SerializerType {
    /// The protocol URI used during protocol negotiation.
    pub fn uri(&self) -> Uri {
        match self {
            Self::Json => Uri::from_known("wamp.2.json"),
        }
    }
}

impl TryFrom<&str> for SerializerType {
    type Error = &'static str;
    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "wamp.2.json" => Ok(Self::Json),
            _ => Err("unsupported serializer"),
        }
    }
}

/// A serializer, which serializes and deserializes WAMP messages to a well-known format that can be
/// passed over wire.
///
/// Does not implement message batching.
pub trait Serializer: Send + Debug {
    /// Serializes the given message to bytes.
    fn serialize(&self, value: &Message) -> Result<Vec<u8>>;

    /// Deserializes bytes to a message.
    ///
    /// Failures are typed so that the transport pipeline can apply its supervision policy to
    /// offending frames.
    fn deserialize(&self, bytes: &[u8]) -> Result<Message, DecodeError>;
}

/// Creates a new [`Serializer`] for the given type.
pub fn new_serializer(
    serializer_type: SerializerType,
    validation: UriValidation,
) -> Box<dyn Serializer> {
    match serializer_type {
        SerializerType::Json => Box::new(JsonSerializer::new(validation)),
    }
}
