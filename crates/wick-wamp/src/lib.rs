// ABOUTME: WAMP v2 client for wick: message model, codecs, transports and live sessions.
// ABOUTME: Exposes the Session/Connector traits the dispatch engine is written against.

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod session;
pub mod transport;

// Client
pub use client::{WampConnector, WampSession, CLOSE_TIMEOUT};

// Connection configuration
pub use config::{ConnectConfig, DEFAULT_CONNECT_TIMEOUT};

// Error types
pub use error::{Result, WampError};

// Messages
pub use message::{decode_binary, encode_binary, reason, Codec, Dict, List, Message};

// Session abstraction
pub use session::{
    CallResult, Connector, Event, EventHandler, Invocation, InvocationError, InvocationFuture,
    InvocationHandler, ProgressHandler, Session, SessionDetails,
};
