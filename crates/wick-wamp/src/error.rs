// ABOUTME: Error types for the wick-wamp crate.
// ABOUTME: Covers connect, transport, protocol, abort and remote ERROR failures.

use serde_json::Value;
use thiserror::Error;
use wick_auth::AuthError;

/// Errors raised while connecting a session or running an operation on it.
#[derive(Error, Debug)]
pub enum WampError {
    /// Could not open the transport to the router.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Requested transport or serializer is not available.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Raw-socket handshake was refused by the router.
    #[error("raw socket handshake rejected: {0}")]
    HandshakeRejected(String),

    /// I/O or WebSocket failure on an open connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// Message could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Peer sent something that violates the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Router aborted the session during the join handshake.
    #[error("session aborted by router: {reason}")]
    Aborted { reason: String, message: Option<String> },

    /// Challenge could not be answered.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Router replied with an ERROR message.
    #[error("{}", format_remote(.error, .args))]
    Remote {
        error: String,
        args: Vec<Value>,
        kwargs: serde_json::Map<String, Value>,
    },

    /// Session is closed or closed while the request was in flight.
    #[error("session closed")]
    Closed,

    /// Operation refers to a topic or procedure this session does not hold.
    #[error("{kind} '{name}' is not held by this session")]
    NotHeld { kind: &'static str, name: String },
}

fn format_remote(error: &str, args: &[Value]) -> String {
    match args.first() {
        Some(Value::String(text)) => format!("{error}: {text}"),
        Some(other) => format!("{error}: {other}"),
        None => error.to_string(),
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for WampError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        WampError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for WampError {
    fn from(err: std::io::Error) -> Self {
        WampError::Transport(err.to_string())
    }
}

/// Result type alias using WampError.
pub type Result<T> = std::result::Result<T, WampError>;
