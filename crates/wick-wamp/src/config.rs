// ABOUTME: ConnectConfig: everything a Connector needs to open one session.
// ABOUTME: Built from a ClientIdentity after negotiation; keepalive and timeouts use a builder.

use crate::message::Dict;
use std::time::Duration;
use wick_auth::{negotiate, normalize_url, AuthError, AuthVariant, ClientIdentity, Negotiated, SerializerKind};

/// Default time allowed for transport connect plus join.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Router URL with `rs`/`rss` already rewritten to `tcp`/`tcps`.
    pub url: String,
    pub realm: String,
    pub serializer: SerializerKind,
    /// Extra HELLO details from negotiation.
    pub hello: Dict,
    pub variant: AuthVariant,
    /// Ping interval. If None, keepalive is disabled.
    pub keepalive: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

impl ConnectConfig {
    pub fn new(url: &str, realm: impl Into<String>, negotiated: Negotiated) -> Self {
        Self {
            url: normalize_url(url),
            realm: realm.into(),
            serializer: SerializerKind::default(),
            hello: negotiated.hello,
            variant: negotiated.variant,
            keepalive: None,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Negotiate credentials for `identity` and build its config.
    ///
    /// `keepalive_secs == 0` disables keepalive.
    pub fn from_identity(identity: &ClientIdentity, keepalive_secs: u64) -> Result<Self, AuthError> {
        let negotiated = negotiate(identity)?;
        let config = Self::new(&identity.url, identity.realm.clone(), negotiated)
            .with_serializer(identity.serializer);
        Ok(if keepalive_secs > 0 {
            config.with_keepalive(Duration::from_secs(keepalive_secs))
        } else {
            config
        })
    }

    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_keepalive(mut self, interval: Duration) -> Self {
        self.keepalive = Some(interval);
        self
    }

    pub fn without_keepalive(mut self) -> Self {
        self.keepalive = None;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }
}
