// ABOUTME: Session and Connector traits plus the payload types handed to callers and handlers.
// ABOUTME: Anything that can call, publish, subscribe and register behind an Arc<dyn Session> plugs in here.

use crate::config::ConnectConfig;
use crate::error::Result;
use crate::message::{Dict, List};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// What the router told us about the session in WELCOME.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDetails {
    pub session_id: u64,
    pub realm: String,
    pub authid: String,
    pub authrole: String,
    pub authmethod: String,
    pub authprovider: String,
    pub roles: Dict,
}

impl SessionDetails {
    pub fn from_welcome(session_id: u64, realm: &str, details: &Dict) -> Self {
        let text = |key: &str| {
            details
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            session_id,
            realm: realm.to_string(),
            authid: text("authid"),
            authrole: text("authrole"),
            authmethod: text("authmethod"),
            authprovider: text("authprovider"),
            roles: details
                .get("roles")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Comma separated feature names the router advertises for `role` (e.g. "broker").
    pub fn features(&self, role: &str) -> String {
        let mut names: Vec<&str> = self
            .roles
            .get(role)
            .and_then(|r| r.get("features"))
            .and_then(Value::as_object)
            .map(|features| {
                features
                    .iter()
                    .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .unwrap_or_default();
        names.sort_unstable();
        names.join(", ")
    }
}

/// A final or progressive call result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult {
    pub args: List,
    pub kwargs: Dict,
    pub details: Dict,
}

impl CallResult {
    pub fn new(args: List, kwargs: Dict) -> Self {
        Self {
            args,
            kwargs,
            details: Dict::new(),
        }
    }
}

/// An event delivered to a subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub subscription: u64,
    pub publication: u64,
    pub args: List,
    pub kwargs: Dict,
    pub details: Dict,
}

/// An invocation delivered to a registered procedure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub request: u64,
    pub registration: u64,
    pub args: List,
    pub kwargs: Dict,
    pub details: Dict,
}

/// Error a procedure handler returns instead of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationError {
    pub error: String,
    pub args: List,
    pub kwargs: Dict,
}

impl InvocationError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            args: vec![Value::String(message.into())],
            kwargs: Dict::new(),
        }
    }
}

pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

pub type ProgressHandler = Arc<dyn Fn(CallResult) + Send + Sync>;

pub type InvocationFuture =
    Pin<Box<dyn Future<Output = std::result::Result<CallResult, InvocationError>> + Send>>;

pub type InvocationHandler = Arc<dyn Fn(Invocation) -> InvocationFuture + Send + Sync>;

/// An established session on a router realm.
#[async_trait]
pub trait Session: Send + Sync {
    fn id(&self) -> u64;

    fn details(&self) -> &SessionDetails;

    /// Call a procedure. When `progress` is given it receives every
    /// progressive result before the final one is returned.
    async fn call(
        &self,
        procedure: &str,
        options: Dict,
        args: List,
        kwargs: Dict,
        progress: Option<ProgressHandler>,
    ) -> Result<CallResult>;

    /// Publish to a topic; waits for PUBLISHED only when `acknowledge` is set.
    async fn publish(&self, topic: &str, options: Dict, args: List, kwargs: Dict) -> Result<()>;

    async fn subscribe(&self, topic: &str, options: Dict, handler: EventHandler) -> Result<()>;

    async fn unsubscribe(&self, topic: &str) -> Result<()>;

    async fn register(
        &self,
        procedure: &str,
        options: Dict,
        handler: InvocationHandler,
    ) -> Result<()>;

    async fn unregister(&self, procedure: &str) -> Result<()>;

    /// Leave the realm and close the transport. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    /// Resolves once the session has terminated for any reason.
    async fn done(&self);

    /// Reason from a router-initiated GOODBYE, if one was received.
    fn goodbye_reason(&self) -> Option<String>;
}

/// Opens sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: ConnectConfig) -> Result<Arc<dyn Session>>;
}
