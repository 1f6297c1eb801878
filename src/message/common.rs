use anyhow::Error;

use crate::{
    core::{
        close::CloseReason,
        error::uri_for_error,
        types::Value,
    },
    message::message::{
        AbortMessage,
        ErrorMessage,
        GoodbyeMessage,
        Message,
    },
};

pub fn abort_message_for_error(error: &Error) -> Message {
    Message::Abort(AbortMessage {
        details: [("message".to_owned(), Value::String(error.to_string()))]
            .into_iter()
            .collect(),
        reason: uri_for_error(error),
    })
}

pub fn goodbye_with_close_reason(close_reason: CloseReason) -> Message {
    Message::Goodbye(GoodbyeMessage {
        details: Default::default(),
        reason: close_reason.uri(),
    })
}

pub fn goodbye_and_out() -> Message {
    goodbye_with_close_reason(CloseReason::GoodbyeAndOut)
}

pub fn error_for_request(message: &Message, error: &Error) -> Message {
    Message::Error(ErrorMessage {
        request_type: message.tag(),
        request: message.request_id().unwrap_or_default(),
        details: [("message".to_owned(), Value::String(error.to_string()))]
            .into_iter()
            .collect(),
        error: uri_for_error(error),
        ..Default::default()
    })
}
