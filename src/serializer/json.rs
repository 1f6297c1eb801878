use anyhow::{
    Error,
    Result,
};

use crate::{
    core::{
        error::DecodeError,
        id::Id,
        roles::PeerRole,
        types::{
            Dictionary,
            Integer,
            List,
            Value,
        },
        uri::{
            validate_uri,
            Uri,
            UriValidation,
        },
    },
    message::message::{
        AbortMessage,
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
    serializer::serializer::Serializer,
};

/// A serializer implemented for JavaScript Object Notation.
///
/// Decoding is a two-step process: the frame is parsed as JSON, and the resulting array is mapped
/// onto a message schema selected by the leading code. Application payloads (`arguments`,
/// `arguments_keyword`) pass through opaquely; everything else is validated here, including URI
/// fields at the configured validation level.
#[derive(Debug, Default)]
pub struct JsonSerializer {
    validation: UriValidation,
}

impl JsonSerializer {
    pub fn new(validation: UriValidation) -> Self {
        Self { validation }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Message) -> Result<Vec<u8>> {
        serde_json::to_vec(&encode_message(value)).map_err(Error::new)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Message, DecodeError> {
        let value = serde_json::from_slice::<Value>(bytes)?;
        decode_message(value, self.validation)
    }
}

fn schema_error<S>(message: S) -> DecodeError
where
    S: Into<String>,
{
    DecodeError::Schema(message.into())
}

fn arity(name: &str, fields: &[Value], min: usize, max: usize) -> Result<(), DecodeError> {
    if fields.len() < min || fields.len() > max {
        return Err(schema_error(format!(
            "{name} message has {} fields, expected {min} to {max}",
            fields.len(),
        )));
    }
    Ok(())
}

fn id_field(name: &str, field: &str, value: &Value) -> Result<Id, DecodeError> {
    let id = value
        .as_u64()
        .ok_or_else(|| schema_error(format!("{name} {field} is not an integer")))?;
    Id::try_from(id).map_err(|err| schema_error(format!("{name} {field}: {err}")))
}

fn integer_field(name: &str, field: &str, value: &Value) -> Result<Integer, DecodeError> {
    value
        .as_u64()
        .ok_or_else(|| schema_error(format!("{name} {field} is not an integer")))
}

fn uri_field(
    name: &str,
    field: &str,
    value: &Value,
    validation: UriValidation,
) -> Result<Uri, DecodeError> {
    let uri = value
        .as_str()
        .ok_or_else(|| schema_error(format!("{name} {field} is not a string")))?;
    validate_uri(uri, validation)
        .map_err(|_| schema_error(format!("{name} {field} is not a valid uri")))?;
    Ok(Uri::from_known(uri))
}

fn dict_field(name: &str, field: &str, value: &Value) -> Result<Dictionary, DecodeError> {
    match value {
        Value::Object(dict) => Ok(dict.clone()),
        _ => Err(schema_error(format!("{name} {field} is not a dictionary"))),
    }
}

/// Reads the optional trailing `arguments` and `arguments_keyword` fields.
fn payload_fields(name: &str, fields: &[Value]) -> Result<(List, Dictionary), DecodeError> {
    let arguments = match fields.first() {
        Some(Value::Array(list)) => list.clone(),
        Some(_) => return Err(schema_error(format!("{name} arguments is not a list"))),
        None => List::default(),
    };
    let arguments_keyword = match fields.get(1) {
        Some(Value::Object(dict)) => dict.clone(),
        Some(_) => {
            return Err(schema_error(format!(
                "{name} arguments_keyword is not a dictionary"
            )))
        }
        None => Dictionary::default(),
    };
    Ok((arguments, arguments_keyword))
}

fn validate_hello_details(details: &Dictionary) -> Result<(), DecodeError> {
    let roles = match details.get("roles") {
        Some(Value::Object(roles)) => roles,
        _ => return Err(schema_error("HELLO details must contain a roles dictionary")),
    };
    if roles.is_empty() {
        return Err(schema_error("HELLO roles must not be empty"));
    }
    for role in roles.keys() {
        if PeerRole::try_from(role.as_str()).is_err() {
            return Err(schema_error(format!("unknown role {role}")));
        }
    }
    Ok(())
}

fn decode_message(value: Value, validation: UriValidation) -> Result<Message, DecodeError> {
    let elements = match value {
        Value::Array(elements) => elements,
        _ => return Err(schema_error("message is not an array")),
    };
    let (code, fields) = match elements.split_first() {
        Some((code, fields)) => (code, fields),
        None => return Err(schema_error("message array is empty")),
    };
    let code = code
        .as_u64()
        .ok_or_else(|| schema_error("message code is not an integer"))?;
    match code {
        Message::HELLO_TAG => {
            arity("HELLO", fields, 2, 2)?;
            let details = dict_field("HELLO", "details", &fields[1])?;
            validate_hello_details(&details)?;
            Ok(Message::Hello(HelloMessage {
                realm: uri_field("HELLO", "realm", &fields[0], validation)?,
                details,
            }))
        }
        Message::WELCOME_TAG => {
            arity("WELCOME", fields, 2, 2)?;
            Ok(Message::Welcome(WelcomeMessage {
                session: id_field("WELCOME", "session", &fields[0])?,
                details: dict_field("WELCOME", "details", &fields[1])?,
            }))
        }
        Message::ABORT_TAG => {
            arity("ABORT", fields, 2, 2)?;
            Ok(Message::Abort(AbortMessage {
                details: dict_field("ABORT", "details", &fields[0])?,
                reason: uri_field("ABORT", "reason", &fields[1], validation)?,
            }))
        }
        Message::GOODBYE_TAG => {
            arity("GOODBYE", fields, 2, 2)?;
            Ok(Message::Goodbye(GoodbyeMessage {
                details: dict_field("GOODBYE", "details", &fields[0])?,
                reason: uri_field("GOODBYE", "reason", &fields[1], validation)?,
            }))
        }
        Message::ERROR_TAG => {
            arity("ERROR", fields, 4, 6)?;
            let (arguments, arguments_keyword) = payload_fields("ERROR", &fields[4..])?;
            Ok(Message::Error(ErrorMessage {
                request_type: integer_field("ERROR", "request_type", &fields[0])?,
                request: id_field("ERROR", "request", &fields[1])?,
                details: dict_field("ERROR", "details", &fields[2])?,
                error: uri_field("ERROR", "error", &fields[3], validation)?,
                arguments,
                arguments_keyword,
            }))
        }
        Message::PUBLISH_TAG => {
            arity("PUBLISH", fields, 3, 5)?;
            let (arguments, arguments_keyword) = payload_fields("PUBLISH", &fields[3..])?;
            Ok(Message::Publish(PublishMessage {
                request: id_field("PUBLISH", "request", &fields[0])?,
                options: dict_field("PUBLISH", "options", &fields[1])?,
                topic: uri_field("PUBLISH", "topic", &fields[2], validation)?,
                arguments,
                arguments_keyword,
            }))
        }
        Message::PUBLISHED_TAG => {
            arity("PUBLISHED", fields, 2, 2)?;
            Ok(Message::Published(PublishedMessage {
                publish_request: id_field("PUBLISHED", "publish_request", &fields[0])?,
                publication: id_field("PUBLISHED", "publication", &fields[1])?,
            }))
        }
        Message::SUBSCRIBE_TAG => {
            arity("SUBSCRIBE", fields, 3, 3)?;
            Ok(Message::Subscribe(SubscribeMessage {
                request: id_field("SUBSCRIBE", "request", &fields[0])?,
                options: dict_field("SUBSCRIBE", "options", &fields[1])?,
                topic: uri_field("SUBSCRIBE", "topic", &fields[2], validation)?,
            }))
        }
        Message::SUBSCRIBED_TAG => {
            arity("SUBSCRIBED", fields, 2, 2)?;
            Ok(Message::Subscribed(SubscribedMessage {
                subscribe_request: id_field("SUBSCRIBED", "subscribe_request", &fields[0])?,
                subscription: id_field("SUBSCRIBED", "subscription", &fields[1])?,
            }))
        }
        Message::UNSUBSCRIBE_TAG => {
            arity("UNSUBSCRIBE", fields, 2, 2)?;
            Ok(Message::Unsubscribe(UnsubscribeMessage {
                request: id_field("UNSUBSCRIBE", "request", &fields[0])?,
                subscribed_subscription: id_field(
                    "UNSUBSCRIBE",
                    "subscription",
                    &fields[1],
                )?,
            }))
        }
        Message::UNSUBSCRIBED_TAG => {
            arity("UNSUBSCRIBED", fields, 1, 1)?;
            Ok(Message::Unsubscribed(UnsubscribedMessage {
                unsubscribe_request: id_field("UNSUBSCRIBED", "unsubscribe_request", &fields[0])?,
            }))
        }
        Message::EVENT_TAG => {
            arity("EVENT", fields, 3, 5)?;
            let (publish_arguments, publish_arguments_keyword) =
                payload_fields("EVENT", &fields[3..])?;
            Ok(Message::Event(EventMessage {
                subscribed_subscription: id_field("EVENT", "subscription", &fields[0])?,
                published_publication: id_field("EVENT", "publication", &fields[1])?,
                details: dict_field("EVENT", "details", &fields[2])?,
                publish_arguments,
                publish_arguments_keyword,
            }))
        }
        Message::CALL_TAG => {
            arity("CALL", fields, 3, 5)?;
            let (arguments, arguments_keyword) = payload_fields("CALL", &fields[3..])?;
            Ok(Message::Call(CallMessage {
                request: id_field("CALL", "request", &fields[0])?,
                options: dict_field("CALL", "options", &fields[1])?,
                procedure: uri_field("CALL", "procedure", &fields[2], validation)?,
                arguments,
                arguments_keyword,
            }))
        }
        Message::RESULT_TAG => {
            arity("RESULT", fields, 2, 4)?;
            let (yield_arguments, yield_arguments_keyword) =
                payload_fields("RESULT", &fields[2..])?;
            Ok(Message::Result(ResultMessage {
                call_request: id_field("RESULT", "call_request", &fields[0])?,
                details: dict_field("RESULT", "details", &fields[1])?,
                yield_arguments,
                yield_arguments_keyword,
            }))
        }
        Message::REGISTER_TAG => {
            arity("REGISTER", fields, 3, 3)?;
            Ok(Message::Register(RegisterMessage {
                request: id_field("REGISTER", "request", &fields[0])?,
                options: dict_field("REGISTER", "options", &fields[1])?,
                procedure: uri_field("REGISTER", "procedure", &fields[2], validation)?,
            }))
        }
        Message::REGISTERED_TAG => {
            arity("REGISTERED", fields, 2, 2)?;
            Ok(Message::Registered(RegisteredMessage {
                register_request: id_field("REGISTERED", "register_request", &fields[0])?,
                registration: id_field("REGISTERED", "registration", &fields[1])?,
            }))
        }
        Message::UNREGISTER_TAG => {
            arity("UNREGISTER", fields, 2, 2)?;
            Ok(Message::Unregister(UnregisterMessage {
                request: id_field("UNREGISTER", "request", &fields[0])?,
                registered_registration: id_field("UNREGISTER", "registration", &fields[1])?,
            }))
        }
        Message::UNREGISTERED_TAG => {
            arity("UNREGISTERED", fields, 1, 1)?;
            Ok(Message::Unregistered(UnregisteredMessage {
                unregister_request: id_field("UNREGISTERED", "unregister_request", &fields[0])?,
            }))
        }
        Message::INVOCATION_TAG => {
            arity("INVOCATION", fields, 3, 5)?;
            let (call_arguments, call_arguments_keyword) =
                payload_fields("INVOCATION", &fields[3..])?;
            Ok(Message::Invocation(InvocationMessage {
                request: id_field("INVOCATION", "request", &fields[0])?,
                registered_registration: id_field("INVOCATION", "registration", &fields[1])?,
                details: dict_field("INVOCATION", "details", &fields[2])?,
                call_arguments,
                call_arguments_keyword,
            }))
        }
        Message::YIELD_TAG => {
            arity("YIELD", fields, 2, 4)?;
            let (arguments, arguments_keyword) = payload_fields("YIELD", &fields[2..])?;
            Ok(Message::Yield(YieldMessage {
                invocation_request: id_field("YIELD", "invocation_request", &fields[0])?,
                options: dict_field("YIELD", "options", &fields[1])?,
                arguments,
                arguments_keyword,
            }))
        }
        code => Err(DecodeError::UnknownCode(code)),
    }
}

fn id_value(id: Id) -> Value {
    Value::from(u64::from(id))
}

fn uri_value(uri: &Uri) -> Value {
    Value::String(uri.to_string())
}

/// Appends the trailing payload fields, omitting them when empty.
///
/// An empty `arguments` list is kept when `arguments_keyword` is present, since the fields are
/// positional.
fn push_payload(elements: &mut Vec<Value>, arguments: &List, arguments_keyword: &Dictionary) {
    if !arguments_keyword.is_empty() {
        elements.push(Value::Array(arguments.clone()));
        elements.push(Value::Object(arguments_keyword.clone()));
    } else if !arguments.is_empty() {
        elements.push(Value::Array(arguments.clone()));
    }
}

fn encode_message(message: &Message) -> Value {
    let mut elements = vec![Value::from(message.tag())];
    match message {
        Message::Hello(message) => {
            elements.push(uri_value(&message.realm));
            elements.push(Value::Object(message.details.clone()));
        }
        Message::Welcome(message) => {
            elements.push(id_value(message.session));
            elements.push(Value::Object(message.details.clone()));
        }
        Message::Abort(message) => {
            elements.push(Value::Object(message.details.clone()));
            elements.push(uri_value(&message.reason));
        }
        Message::Goodbye(message) => {
            elements.push(Value::Object(message.details.clone()));
            elements.push(uri_value(&message.reason));
        }
        Message::Error(message) => {
            elements.push(Value::from(message.request_type));
            elements.push(id_value(message.request));
            elements.push(Value::Object(message.details.clone()));
            elements.push(uri_value(&message.error));
            push_payload(&mut elements, &message.arguments, &message.arguments_keyword);
        }
        Message::Publish(message) => {
            elements.push(id_value(message.request));
            elements.push(Value::Object(message.options.clone()));
            elements.push(uri_value(&message.topic));
            push_payload(&mut elements, &message.arguments, &message.arguments_keyword);
        }
        Message::Published(message) => {
            elements.push(id_value(message.publish_request));
            elements.push(id_value(message.publication));
        }
        Message::Subscribe(message) => {
            elements.push(id_value(message.request));
            elements.push(Value::Object(message.options.clone()));
            elements.push(uri_value(&message.topic));
        }
        Message::Subscribed(message) => {
            elements.push(id_value(message.subscribe_request));
            elements.push(id_value(message.subscription));
        }
        Message::Unsubscribe(message) => {
            elements.push(id_value(message.request));
            elements.push(id_value(message.subscribed_subscription));
        }
        Message::Unsubscribed(message) => {
            elements.push(id_value(message.unsubscribe_request));
        }
        Message::Event(message) => {
            elements.push(id_value(message.subscribed_subscription));
            elements.push(id_value(message.published_publication));
            elements.push(Value::Object(message.details.clone()));
            push_payload(
                &mut elements,
                &message.publish_arguments,
                &message.publish_arguments_keyword,
            );
        }
        Message::Call(message) => {
            elements.push(id_value(message.request));
            elements.push(Value::Object(message.options.clone()));
            elements.push(uri_value(&message.procedure));
            push_payload(&mut elements, &message.arguments, &message.arguments_keyword);
        }
        Message::Result(message) => {
            elements.push(id_value(message.call_request));
            elements.push(Value::Object(message.details.clone()));
            push_payload(
                &mut elements,
                &message.yield_arguments,
                &message.yield_arguments_keyword,
            );
        }
        Message::Register(message) => {
            elements.push(id_value(message.request));
            elements.push(Value::Object(message.options.clone()));
            elements.push(uri_value(&message.procedure));
        }
        Message::Registered(message) => {
            elements.push(id_value(message.register_request));
            elements.push(id_value(message.registration));
        }
        Message::Unregister(message) => {
            elements.push(id_value(message.request));
            elements.push(id_value(message.registered_registration));
        }
        Message::Unregistered(message) => {
            elements.push(id_value(message.unregister_request));
        }
        Message::Invocation(message) => {
            elements.push(id_value(message.request));
            elements.push(id_value(message.registered_registration));
            elements.push(Value::Object(message.details.clone()));
            push_payload(
                &mut elements,
                &message.call_arguments,
                &message.call_arguments_keyword,
            );
        }
        Message::Yield(message) => {
            elements.push(id_value(message.invocation_request));
            elements.push(Value::Object(message.options.clone()));
            push_payload(&mut elements, &message.arguments, &message.arguments_keyword);
        }
    }
    Value::Array(elements)
}

#[cfg(test)]
mod json_serializer_test {
    use crate::{
        core::{
            error::DecodeError,
            id::Id,
            types::Value,
            uri::{
                Uri,
                UriValidation,
            },
        },
        message::message::{
            CallMessage,
            EventMessage,
            GoodbyeMessage,
            HelloMessage,
            Message,
            PublishMessage,
            SubscribeMessage,
        },
        serializer::{
            json::JsonSerializer,
            serializer::Serializer,
        },
    };

    fn serializer() -> JsonSerializer {
        JsonSerializer::new(UriValidation::Loose)
    }

    fn strict_serializer() -> JsonSerializer {
        JsonSerializer::new(UriValidation::Strict)
    }

    #[track_caller]
    fn assert_round_trip(message: &Message) {
        let serializer = serializer();
        let serialized = serializer.serialize(message).unwrap();
        let deserialized = serializer.deserialize(&serialized).unwrap();
        pretty_assertions::assert_eq!(message, &deserialized);
    }

    #[test]
    fn deserializes_hello_message() {
        assert_matches::assert_matches!(serializer().deserialize(br#"
            [1, "myapp.realm", {"roles": {"publisher": {}, "subscriber": {}}}]
        "#), Ok(Message::Hello(message)) => {
            assert_eq!(message.realm, Uri::try_from("myapp.realm").unwrap());
            assert!(message.details.contains_key("roles"));
        });
    }

    #[test]
    fn tolerates_unknown_hello_details_keys() {
        assert_matches::assert_matches!(serializer().deserialize(br#"
            [1, "myapp.realm", {"roles": {"caller": {}}, "agent": "x", "extra": [1, 2]}]
        "#), Ok(Message::Hello(_)));
    }

    #[test]
    fn fails_deserialization_hello_missing_roles() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[1, "myapp.realm", {}]"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("roles"));
            }
        );
    }

    #[test]
    fn fails_deserialization_hello_empty_roles() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[1, "myapp.realm", {"roles": {}}]"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("roles must not be empty"));
            }
        );
    }

    #[test]
    fn fails_deserialization_hello_unknown_role() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[1, "myapp.realm", {"roles": {"observer": {}}}]"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("unknown role observer"));
            }
        );
    }

    #[test]
    fn deserializes_call_with_payload() {
        assert_matches::assert_matches!(serializer().deserialize(br#"
            [48, 7814135, {}, "myapp.user.new", ["johnny"], {"firstname": "John", "surname": "Doe"}]
        "#), Ok(Message::Call(message)) => {
            assert_eq!(message.request, Id::try_from(7814135).unwrap());
            assert_eq!(message.procedure, Uri::try_from("myapp.user.new").unwrap());
            assert_eq!(message.arguments, vec![Value::String("johnny".to_owned())]);
            assert_eq!(message.arguments_keyword.get("surname"), Some(&Value::String("Doe".to_owned())));
        });
    }

    #[test]
    fn fails_deserialization_bad_payload_type() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[48, 1, {}, "myapp.ping", "not-a-list"]"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("arguments is not a list"));
            }
        );
    }

    #[test]
    fn fails_deserialization_wrong_arity() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[32, 1, {}]"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("SUBSCRIBE message has 2 fields"));
            }
        );
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[6, {}]"#),
            Err(DecodeError::Schema(_))
        );
    }

    #[test]
    fn fails_deserialization_unknown_code() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[99, 1, {}]"#),
            Err(DecodeError::UnknownCode(99))
        );
    }

    #[test]
    fn fails_deserialization_non_array() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"{"hello": 1}"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("not an array"));
            }
        );
        assert_matches::assert_matches!(
            serializer().deserialize(br#"not json"#),
            Err(DecodeError::Json(_))
        );
    }

    #[test]
    fn fails_deserialization_id_out_of_range() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[48, 0, {}, "myapp.ping"]"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("out of range"));
            }
        );
    }

    #[test]
    fn fails_deserialization_invalid_uri() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[6, {}, "invalid..reason"]"#),
            Err(DecodeError::Schema(err)) => {
                assert!(err.contains("reason is not a valid uri"));
            }
        );
    }

    #[test]
    fn strict_validation_rejects_loose_uris() {
        assert_matches::assert_matches!(
            serializer().deserialize(br#"[32, 1, {}, "myapp.TOPIC-"]"#),
            Ok(Message::Subscribe(_))
        );
        assert_matches::assert_matches!(
            strict_serializer().deserialize(br#"[32, 1, {}, "myapp.TOPIC-"]"#),
            Err(DecodeError::Schema(_))
        );
    }

    #[test]
    fn serializes_event_without_payload() {
        let serialized = serializer()
            .serialize(&Message::Event(EventMessage {
                subscribed_subscription: Id::try_from(713845233).unwrap(),
                published_publication: Id::try_from(468236199).unwrap(),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(
            String::from_utf8(serialized).unwrap(),
            r#"[36,713845233,468236199,{}]"#
        );
    }

    #[test]
    fn serializes_empty_arguments_before_keyword_arguments() {
        let serialized = serializer()
            .serialize(&Message::Call(CallMessage {
                request: Id::try_from(1).unwrap(),
                procedure: Uri::try_from("myapp.ping").unwrap(),
                arguments_keyword: [("key".to_owned(), Value::Bool(true))].into_iter().collect(),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(
            String::from_utf8(serialized).unwrap(),
            r#"[48,1,{},"myapp.ping",[],{"key":true}]"#
        );
    }

    #[test]
    fn serializes_and_deserializes_equivalently() {
        assert_round_trip(&Message::Hello(HelloMessage {
            realm: Uri::try_from("myapp.realm").unwrap(),
            details: serde_json::json!({"roles": {"publisher": {}, "callee": {}}})
                .as_object()
                .unwrap()
                .clone(),
        }));
        assert_round_trip(&Message::Goodbye(GoodbyeMessage {
            details: Default::default(),
            reason: Uri::try_from("wamp.close.close_realm").unwrap(),
        }));
        assert_round_trip(&Message::Subscribe(SubscribeMessage {
            request: Id::try_from(1).unwrap(),
            options: Default::default(),
            topic: Uri::try_from("myapp.topic1").unwrap(),
        }));
        assert_round_trip(&Message::Publish(PublishMessage {
            request: Id::try_from(2).unwrap(),
            options: serde_json::json!({"acknowledge": true}).as_object().unwrap().clone(),
            topic: Uri::try_from("myapp.topic1").unwrap(),
            arguments: vec![Value::from(23), Value::from("payload")],
            arguments_keyword: [("index".to_owned(), Value::from(7))].into_iter().collect(),
        }));
        assert_round_trip(&Message::Call(CallMessage {
            request: Id::try_from(7814135).unwrap(),
            options: Default::default(),
            procedure: Uri::try_from("myapp.echo").unwrap(),
            arguments: vec![Value::from("Hello, world!")],
            arguments_keyword: Default::default(),
        }));
    }
}
