// ABOUTME: WAMP v2 message model and the JSON / MessagePack codecs that put it on the wire.
// ABOUTME: Binary payloads are carried in-process as "\0"-prefixed base64 strings, the JSON convention.

use crate::error::{Result, WampError};
use base64::Engine;
use serde_json::{Map, Number, Value};
use wick_auth::SerializerKind;

/// Positional arguments.
pub type List = Vec<Value>;

/// Keyword arguments, options and details.
pub type Dict = Map<String, Value>;

/// Message type codes.
pub mod code {
    pub const HELLO: u64 = 1;
    pub const WELCOME: u64 = 2;
    pub const ABORT: u64 = 3;
    pub const CHALLENGE: u64 = 4;
    pub const AUTHENTICATE: u64 = 5;
    pub const GOODBYE: u64 = 6;
    pub const ERROR: u64 = 8;
    pub const PUBLISH: u64 = 16;
    pub const PUBLISHED: u64 = 17;
    pub const SUBSCRIBE: u64 = 32;
    pub const SUBSCRIBED: u64 = 33;
    pub const UNSUBSCRIBE: u64 = 34;
    pub const UNSUBSCRIBED: u64 = 35;
    pub const EVENT: u64 = 36;
    pub const CALL: u64 = 48;
    pub const RESULT: u64 = 50;
    pub const REGISTER: u64 = 64;
    pub const REGISTERED: u64 = 65;
    pub const UNREGISTER: u64 = 66;
    pub const UNREGISTERED: u64 = 67;
    pub const INVOCATION: u64 = 68;
    pub const YIELD: u64 = 70;
}

/// Close reasons.
pub mod reason {
    pub const CLOSE_REALM: &str = "wamp.close.close_realm";
    pub const GOODBYE_AND_OUT: &str = "wamp.close.goodbye_and_out";
    pub const SYSTEM_SHUTDOWN: &str = "wamp.close.system_shutdown";
    pub const RUNTIME_ERROR: &str = "wamp.error.runtime_error";
}

const BINARY_PREFIX: char = '\0';

/// Wrap raw bytes in the `\0` + base64 string form.
pub fn encode_binary(bytes: &[u8]) -> String {
    format!(
        "{BINARY_PREFIX}{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Unwrap a `\0` + base64 string, or `None` if `s` is not in that form.
pub fn decode_binary(s: &str) -> Option<Vec<u8>> {
    let encoded = s.strip_prefix(BINARY_PREFIX)?;
    base64::engine::general_purpose::STANDARD.decode(encoded).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello {
        realm: String,
        details: Dict,
    },
    Welcome {
        session: u64,
        details: Dict,
    },
    Abort {
        details: Dict,
        reason: String,
    },
    Challenge {
        auth_method: String,
        extra: Dict,
    },
    Authenticate {
        signature: String,
        extra: Dict,
    },
    Goodbye {
        details: Dict,
        reason: String,
    },
    Error {
        request_type: u64,
        request: u64,
        details: Dict,
        error: String,
        args: List,
        kwargs: Dict,
    },
    Publish {
        request: u64,
        options: Dict,
        topic: String,
        args: List,
        kwargs: Dict,
    },
    Published {
        request: u64,
        publication: u64,
    },
    Subscribe {
        request: u64,
        options: Dict,
        topic: String,
    },
    Subscribed {
        request: u64,
        subscription: u64,
    },
    Unsubscribe {
        request: u64,
        subscription: u64,
    },
    Unsubscribed {
        request: u64,
    },
    Event {
        subscription: u64,
        publication: u64,
        details: Dict,
        args: List,
        kwargs: Dict,
    },
    Call {
        request: u64,
        options: Dict,
        procedure: String,
        args: List,
        kwargs: Dict,
    },
    Result {
        request: u64,
        details: Dict,
        args: List,
        kwargs: Dict,
    },
    Register {
        request: u64,
        options: Dict,
        procedure: String,
    },
    Registered {
        request: u64,
        registration: u64,
    },
    Unregister {
        request: u64,
        registration: u64,
    },
    Unregistered {
        request: u64,
    },
    Invocation {
        request: u64,
        registration: u64,
        details: Dict,
        args: List,
        kwargs: Dict,
    },
    Yield {
        request: u64,
        options: Dict,
        args: List,
        kwargs: Dict,
    },
}

impl Message {
    /// Request id this message answers or carries, if any.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            Message::Error { request, .. }
            | Message::Publish { request, .. }
            | Message::Published { request, .. }
            | Message::Subscribe { request, .. }
            | Message::Subscribed { request, .. }
            | Message::Unsubscribe { request, .. }
            | Message::Unsubscribed { request }
            | Message::Call { request, .. }
            | Message::Result { request, .. }
            | Message::Register { request, .. }
            | Message::Registered { request, .. }
            | Message::Unregister { request, .. }
            | Message::Unregistered { request }
            | Message::Invocation { request, .. }
            | Message::Yield { request, .. } => Some(*request),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "HELLO",
            Message::Welcome { .. } => "WELCOME",
            Message::Abort { .. } => "ABORT",
            Message::Challenge { .. } => "CHALLENGE",
            Message::Authenticate { .. } => "AUTHENTICATE",
            Message::Goodbye { .. } => "GOODBYE",
            Message::Error { .. } => "ERROR",
            Message::Publish { .. } => "PUBLISH",
            Message::Published { .. } => "PUBLISHED",
            Message::Subscribe { .. } => "SUBSCRIBE",
            Message::Subscribed { .. } => "SUBSCRIBED",
            Message::Unsubscribe { .. } => "UNSUBSCRIBE",
            Message::Unsubscribed { .. } => "UNSUBSCRIBED",
            Message::Event { .. } => "EVENT",
            Message::Call { .. } => "CALL",
            Message::Result { .. } => "RESULT",
            Message::Register { .. } => "REGISTER",
            Message::Registered { .. } => "REGISTERED",
            Message::Unregister { .. } => "UNREGISTER",
            Message::Unregistered { .. } => "UNREGISTERED",
            Message::Invocation { .. } => "INVOCATION",
            Message::Yield { .. } => "YIELD",
        }
    }

    /// Array form shared by every serializer.
    pub fn to_value(&self) -> Value {
        let mut items: Vec<Value> = Vec::with_capacity(6);
        match self {
            Message::Hello { realm, details } => {
                items.extend([code::HELLO.into(), realm.as_str().into(), dict(details)]);
            }
            Message::Welcome { session, details } => {
                items.extend([code::WELCOME.into(), (*session).into(), dict(details)]);
            }
            Message::Abort { details, reason } => {
                items.extend([code::ABORT.into(), dict(details), reason.as_str().into()]);
            }
            Message::Challenge { auth_method, extra } => {
                items.extend([
                    code::CHALLENGE.into(),
                    auth_method.as_str().into(),
                    dict(extra),
                ]);
            }
            Message::Authenticate { signature, extra } => {
                items.extend([
                    code::AUTHENTICATE.into(),
                    signature.as_str().into(),
                    dict(extra),
                ]);
            }
            Message::Goodbye { details, reason } => {
                items.extend([code::GOODBYE.into(), dict(details), reason.as_str().into()]);
            }
            Message::Error {
                request_type,
                request,
                details,
                error,
                args,
                kwargs,
            } => {
                items.extend([
                    code::ERROR.into(),
                    (*request_type).into(),
                    (*request).into(),
                    dict(details),
                    error.as_str().into(),
                ]);
                push_payload(&mut items, args, kwargs);
            }
            Message::Publish {
                request,
                options,
                topic,
                args,
                kwargs,
            } => {
                items.extend([
                    code::PUBLISH.into(),
                    (*request).into(),
                    dict(options),
                    topic.as_str().into(),
                ]);
                push_payload(&mut items, args, kwargs);
            }
            Message::Published {
                request,
                publication,
            } => {
                items.extend([
                    code::PUBLISHED.into(),
                    (*request).into(),
                    (*publication).into(),
                ]);
            }
            Message::Subscribe {
                request,
                options,
                topic,
            } => {
                items.extend([
                    code::SUBSCRIBE.into(),
                    (*request).into(),
                    dict(options),
                    topic.as_str().into(),
                ]);
            }
            Message::Subscribed {
                request,
                subscription,
            } => {
                items.extend([
                    code::SUBSCRIBED.into(),
                    (*request).into(),
                    (*subscription).into(),
                ]);
            }
            Message::Unsubscribe {
                request,
                subscription,
            } => {
                items.extend([
                    code::UNSUBSCRIBE.into(),
                    (*request).into(),
                    (*subscription).into(),
                ]);
            }
            Message::Unsubscribed { request } => {
                items.extend([code::UNSUBSCRIBED.into(), (*request).into()]);
            }
            Message::Event {
                subscription,
                publication,
                details,
                args,
                kwargs,
            } => {
                items.extend([
                    code::EVENT.into(),
                    (*subscription).into(),
                    (*publication).into(),
                    dict(details),
                ]);
                push_payload(&mut items, args, kwargs);
            }
            Message::Call {
                request,
                options,
                procedure,
                args,
                kwargs,
            } => {
                items.extend([
                    code::CALL.into(),
                    (*request).into(),
                    dict(options),
                    procedure.as_str().into(),
                ]);
                push_payload(&mut items, args, kwargs);
            }
            Message::Result {
                request,
                details,
                args,
                kwargs,
            } => {
                items.extend([code::RESULT.into(), (*request).into(), dict(details)]);
                push_payload(&mut items, args, kwargs);
            }
            Message::Register {
                request,
                options,
                procedure,
            } => {
                items.extend([
                    code::REGISTER.into(),
                    (*request).into(),
                    dict(options),
                    procedure.as_str().into(),
                ]);
            }
            Message::Registered {
                request,
                registration,
            } => {
                items.extend([
                    code::REGISTERED.into(),
                    (*request).into(),
                    (*registration).into(),
                ]);
            }
            Message::Unregister {
                request,
                registration,
            } => {
                items.extend([
                    code::UNREGISTER.into(),
                    (*request).into(),
                    (*registration).into(),
                ]);
            }
            Message::Unregistered { request } => {
                items.extend([code::UNREGISTERED.into(), (*request).into()]);
            }
            Message::Invocation {
                request,
                registration,
                details,
                args,
                kwargs,
            } => {
                items.extend([
                    code::INVOCATION.into(),
                    (*request).into(),
                    (*registration).into(),
                    dict(details),
                ]);
                push_payload(&mut items, args, kwargs);
            }
            Message::Yield {
                request,
                options,
                args,
                kwargs,
            } => {
                items.extend([code::YIELD.into(), (*request).into(), dict(options)]);
                push_payload(&mut items, args, kwargs);
            }
        }
        Value::Array(items)
    }

    /// Parse the array form.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(WampError::Protocol("message is not an array".to_string()));
        };
        let mut fields = Fields::new(items);
        let kind = fields.id("message type")?;

        let message = match kind {
            code::HELLO => Message::Hello {
                realm: fields.string("realm")?,
                details: fields.dict("details")?,
            },
            code::WELCOME => Message::Welcome {
                session: fields.id("session")?,
                details: fields.dict("details")?,
            },
            code::ABORT => Message::Abort {
                details: fields.dict("details")?,
                reason: fields.string("reason")?,
            },
            code::CHALLENGE => Message::Challenge {
                auth_method: fields.string("authmethod")?,
                extra: fields.dict("extra")?,
            },
            code::AUTHENTICATE => Message::Authenticate {
                signature: fields.string("signature")?,
                extra: fields.dict("extra")?,
            },
            code::GOODBYE => Message::Goodbye {
                details: fields.dict("details")?,
                reason: fields.string("reason")?,
            },
            code::ERROR => Message::Error {
                request_type: fields.id("request type")?,
                request: fields.id("request")?,
                details: fields.dict("details")?,
                error: fields.string("error")?,
                args: fields.optional_list()?,
                kwargs: fields.optional_dict()?,
            },
            code::PUBLISH => Message::Publish {
                request: fields.id("request")?,
                options: fields.dict("options")?,
                topic: fields.string("topic")?,
                args: fields.optional_list()?,
                kwargs: fields.optional_dict()?,
            },
            code::PUBLISHED => Message::Published {
                request: fields.id("request")?,
                publication: fields.id("publication")?,
            },
            code::SUBSCRIBE => Message::Subscribe {
                request: fields.id("request")?,
                options: fields.dict("options")?,
                topic: fields.string("topic")?,
            },
            code::SUBSCRIBED => Message::Subscribed {
                request: fields.id("request")?,
                subscription: fields.id("subscription")?,
            },
            code::UNSUBSCRIBE => Message::Unsubscribe {
                request: fields.id("request")?,
                subscription: fields.id("subscription")?,
            },
            code::UNSUBSCRIBED => Message::Unsubscribed {
                request: fields.id("request")?,
            },
            code::EVENT => Message::Event {
                subscription: fields.id("subscription")?,
                publication: fields.id("publication")?,
                details: fields.dict("details")?,
                args: fields.optional_list()?,
                kwargs: fields.optional_dict()?,
            },
            code::CALL => Message::Call {
                request: fields.id("request")?,
                options: fields.dict("options")?,
                procedure: fields.string("procedure")?,
                args: fields.optional_list()?,
                kwargs: fields.optional_dict()?,
            },
            code::RESULT => Message::Result {
                request: fields.id("request")?,
                details: fields.dict("details")?,
                args: fields.optional_list()?,
                kwargs: fields.optional_dict()?,
            },
            code::REGISTER => Message::Register {
                request: fields.id("request")?,
                options: fields.dict("options")?,
                procedure: fields.string("procedure")?,
            },
            code::REGISTERED => Message::Registered {
                request: fields.id("request")?,
                registration: fields.id("registration")?,
            },
            code::UNREGISTER => Message::Unregister {
                request: fields.id("request")?,
                registration: fields.id("registration")?,
            },
            code::UNREGISTERED => Message::Unregistered {
                request: fields.id("request")?,
            },
            code::INVOCATION => Message::Invocation {
                request: fields.id("request")?,
                registration: fields.id("registration")?,
                details: fields.dict("details")?,
                args: fields.optional_list()?,
                kwargs: fields.optional_dict()?,
            },
            code::YIELD => Message::Yield {
                request: fields.id("request")?,
                options: fields.dict("options")?,
                args: fields.optional_list()?,
                kwargs: fields.optional_dict()?,
            },
            other => {
                return Err(WampError::Protocol(format!(
                    "unsupported message type {other}"
                )))
            }
        };
        Ok(message)
    }
}

fn dict(map: &Dict) -> Value {
    Value::Object(map.clone())
}

/// Trailing args/kwargs are omitted when empty; args is sent as `[]` when only kwargs are present.
fn push_payload(items: &mut Vec<Value>, args: &List, kwargs: &Dict) {
    if args.is_empty() && kwargs.is_empty() {
        return;
    }
    items.push(Value::Array(args.clone()));
    if !kwargs.is_empty() {
        items.push(Value::Object(kwargs.clone()));
    }
}

struct Fields {
    items: std::vec::IntoIter<Value>,
}

impl Fields {
    fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    fn next(&mut self, name: &str) -> Result<Value> {
        self.items
            .next()
            .ok_or_else(|| WampError::Protocol(format!("missing field '{name}'")))
    }

    fn id(&mut self, name: &str) -> Result<u64> {
        self.next(name)?
            .as_u64()
            .ok_or_else(|| WampError::Protocol(format!("field '{name}' is not an id")))
    }

    fn string(&mut self, name: &str) -> Result<String> {
        match self.next(name)? {
            Value::String(s) => Ok(s),
            _ => Err(WampError::Protocol(format!(
                "field '{name}' is not a string"
            ))),
        }
    }

    fn dict(&mut self, name: &str) -> Result<Dict> {
        match self.next(name)? {
            Value::Object(map) => Ok(map),
            _ => Err(WampError::Protocol(format!("field '{name}' is not a dict"))),
        }
    }

    fn optional_list(&mut self) -> Result<List> {
        match self.items.next() {
            None | Some(Value::Null) => Ok(List::new()),
            Some(Value::Array(list)) => Ok(list),
            Some(_) => Err(WampError::Protocol("arguments is not a list".to_string())),
        }
    }

    fn optional_dict(&mut self) -> Result<Dict> {
        match self.items.next() {
            None | Some(Value::Null) => Ok(Dict::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(WampError::Protocol(
                "keyword arguments is not a dict".to_string(),
            )),
        }
    }
}

/// Wire serializer for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Json,
    MsgPack,
}

impl Codec {
    /// Pick the codec for a configured serializer; CBOR has no codec.
    pub fn for_serializer(kind: SerializerKind) -> Result<Self> {
        match kind {
            SerializerKind::Json => Ok(Codec::Json),
            SerializerKind::MsgPack => Ok(Codec::MsgPack),
            SerializerKind::Cbor => Err(WampError::Unsupported(
                "cbor serializer is not supported, use json or msgpack".to_string(),
            )),
        }
    }

    /// WebSocket subprotocol name.
    pub fn subprotocol(&self) -> &'static str {
        match self {
            Codec::Json => "wamp.2.json",
            Codec::MsgPack => "wamp.2.msgpack",
        }
    }

    /// Serializer id used in the raw-socket handshake.
    pub fn rawsocket_id(&self) -> u8 {
        match self {
            Codec::Json => 1,
            Codec::MsgPack => 2,
        }
    }

    /// Whether frames travel as binary WebSocket messages.
    pub fn is_binary(&self) -> bool {
        matches!(self, Codec::MsgPack)
    }

    pub fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        let value = message.to_value();
        match self {
            Codec::Json => {
                serde_json::to_vec(&value).map_err(|e| WampError::Serialization(e.to_string()))
            }
            Codec::MsgPack => {
                let mut buf = Vec::new();
                rmpv::encode::write_value(&mut buf, &json_to_msgpack(&value))
                    .map_err(|e| WampError::Serialization(e.to_string()))?;
                Ok(buf)
            }
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Message> {
        let value = match self {
            Codec::Json => serde_json::from_slice::<Value>(bytes)
                .map_err(|e| WampError::Serialization(e.to_string()))?,
            Codec::MsgPack => {
                let mut reader = bytes;
                let raw = rmpv::decode::read_value(&mut reader)
                    .map_err(|e| WampError::Serialization(e.to_string()))?;
                msgpack_to_json(raw)?
            }
        };
        Message::from_value(value)
    }
}

fn json_to_msgpack(value: &Value) -> rmpv::Value {
    match value {
        Value::Null => rmpv::Value::Nil,
        Value::Bool(b) => rmpv::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                rmpv::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                rmpv::Value::from(u)
            } else {
                rmpv::Value::F64(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => match decode_binary(s) {
            Some(bytes) => rmpv::Value::Binary(bytes),
            None => rmpv::Value::String(s.as_str().into()),
        },
        Value::Array(items) => rmpv::Value::Array(items.iter().map(json_to_msgpack).collect()),
        Value::Object(map) => rmpv::Value::Map(
            map.iter()
                .map(|(k, v)| (rmpv::Value::String(k.as_str().into()), json_to_msgpack(v)))
                .collect(),
        ),
    }
}

fn msgpack_to_json(value: rmpv::Value) -> Result<Value> {
    Ok(match value {
        rmpv::Value::Nil => Value::Null,
        rmpv::Value::Boolean(b) => Value::Bool(b),
        rmpv::Value::Integer(i) => {
            if let Some(n) = i.as_i64() {
                Value::from(n)
            } else if let Some(n) = i.as_u64() {
                Value::from(n)
            } else {
                return Err(WampError::Serialization(format!(
                    "integer {i} does not fit in 64 bits"
                )));
            }
        }
        rmpv::Value::F32(f) => float(f64::from(f)),
        rmpv::Value::F64(f) => float(f),
        rmpv::Value::String(s) => match s.into_str() {
            Some(text) => Value::String(text),
            None => {
                return Err(WampError::Serialization(
                    "string is not valid utf-8".to_string(),
                ))
            }
        },
        rmpv::Value::Binary(bytes) => Value::String(encode_binary(&bytes)),
        rmpv::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(msgpack_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        rmpv::Value::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    rmpv::Value::String(s) => s.into_str().unwrap_or_default(),
                    other => other.to_string(),
                };
                map.insert(key, msgpack_to_json(value)?);
            }
            Value::Object(map)
        }
        rmpv::Value::Ext(kind, _) => {
            return Err(WampError::Serialization(format!(
                "msgpack extension type {kind} is not supported"
            )))
        }
    })
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Dict {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_hello_wire_form() {
        let msg = Message::Hello {
            realm: "realm1".to_string(),
            details: obj(json!({"authid": "alice"})),
        };
        assert_eq!(msg.to_value(), json!([1, "realm1", {"authid": "alice"}]));
    }

    #[test]
    fn test_call_omits_empty_payload() {
        let msg = Message::Call {
            request: 7,
            options: Dict::new(),
            procedure: "foo.bar".to_string(),
            args: vec![],
            kwargs: Dict::new(),
        };
        assert_eq!(msg.to_value(), json!([48, 7, {}, "foo.bar"]));
    }

    #[test]
    fn test_call_with_only_kwargs_sends_empty_args() {
        let msg = Message::Call {
            request: 7,
            options: Dict::new(),
            procedure: "foo.bar".to_string(),
            args: vec![],
            kwargs: obj(json!({"a": 1})),
        };
        assert_eq!(msg.to_value(), json!([48, 7, {}, "foo.bar", [], {"a": 1}]));
    }

    #[test]
    fn test_parse_result_with_missing_payload() {
        let msg = Message::from_value(json!([50, 3, {}])).expect("should parse");
        assert_eq!(
            msg,
            Message::Result {
                request: 3,
                details: Dict::new(),
                args: vec![],
                kwargs: Dict::new(),
            }
        );
        assert_eq!(msg.request_id(), Some(3));
    }

    #[test]
    fn test_parse_error_message() {
        let msg = Message::from_value(json!([8, 48, 9, {}, "wamp.error.no_such_procedure", ["nope"]]))
            .expect("should parse");
        match msg {
            Message::Error {
                request_type,
                request,
                error,
                args,
                ..
            } => {
                assert_eq!(request_type, code::CALL);
                assert_eq!(request, 9);
                assert_eq!(error, "wamp.error.no_such_procedure");
                assert_eq!(args, vec![json!("nope")]);
            }
            other => panic!("expected ERROR, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Message::from_value(json!({"not": "array"})).is_err());
        assert!(Message::from_value(json!([])).is_err());
        assert!(Message::from_value(json!([2, "not-an-id", {}])).is_err());
        assert!(Message::from_value(json!([999])).is_err());
    }

    #[test]
    fn test_json_codec_encodes_compact_array() {
        let msg = Message::Goodbye {
            details: Dict::new(),
            reason: reason::CLOSE_REALM.to_string(),
        };
        let bytes = Codec::Json.encode(&msg).expect("should encode");
        assert_eq!(
            String::from_utf8(bytes).expect("should be utf-8"),
            r#"[6,{},"wamp.close.close_realm"]"#
        );
    }

    #[test]
    fn test_msgpack_codec_carries_binary_as_bin() {
        let payload = encode_binary(b"\x00\x01binary");
        let msg = Message::Publish {
            request: 1,
            options: Dict::new(),
            topic: "t".to_string(),
            args: vec![Value::String(payload.clone())],
            kwargs: Dict::new(),
        };
        let bytes = Codec::MsgPack.encode(&msg).expect("should encode");

        let mut reader = bytes.as_slice();
        let raw = rmpv::decode::read_value(&mut reader).expect("should be msgpack");
        let args = raw.as_array().expect("array")[4].as_array().expect("args");
        assert_eq!(args[0], rmpv::Value::Binary(b"\x00\x01binary".to_vec()));

        let decoded = Codec::MsgPack.decode(&bytes).expect("should decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_binary_helpers() {
        let encoded = encode_binary(b"hello");
        assert!(encoded.starts_with('\0'));
        assert_eq!(decode_binary(&encoded), Some(b"hello".to_vec()));
        assert_eq!(decode_binary("hello"), None);
    }

    #[test]
    fn test_codec_for_serializer() {
        assert_eq!(
            Codec::for_serializer(SerializerKind::Json).expect("json"),
            Codec::Json
        );
        assert_eq!(Codec::MsgPack.subprotocol(), "wamp.2.msgpack");
        assert_eq!(Codec::MsgPack.rawsocket_id(), 2);
        assert!(matches!(
            Codec::for_serializer(SerializerKind::Cbor),
            Err(WampError::Unsupported(_))
        ));
    }
}
