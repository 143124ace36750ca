// ABOUTME: ClientIdentity, AuthMethod and SerializerKind describing who connects and how.
// ABOUTME: Credentials are redacted from Debug output; names parse from their wire spelling.

use crate::error::ConfigError;
use crate::responder::{ANONYMOUS, CRYPTOSIGN, TICKET, WAMPCRA};
use std::fmt;
use std::str::FromStr;

/// Authentication method requested by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    #[default]
    Anonymous,
    Ticket,
    WampCra,
    CryptoSign,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Anonymous => ANONYMOUS,
            AuthMethod::Ticket => TICKET,
            AuthMethod::WampCra => WAMPCRA,
            AuthMethod::CryptoSign => CRYPTOSIGN,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | ANONYMOUS => Ok(AuthMethod::Anonymous),
            TICKET => Ok(AuthMethod::Ticket),
            WAMPCRA => Ok(AuthMethod::WampCra),
            CRYPTOSIGN => Ok(AuthMethod::CryptoSign),
            other => Err(ConfigError::InvalidAuthMethod(other.to_string())),
        }
    }
}

/// Message serializer negotiated with the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SerializerKind {
    #[default]
    Json,
    MsgPack,
    Cbor,
}

impl SerializerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerializerKind::Json => "json",
            SerializerKind::MsgPack => "msgpack",
            SerializerKind::Cbor => "cbor",
        }
    }
}

impl fmt::Display for SerializerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SerializerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(SerializerKind::Json),
            "msgpack" => Ok(SerializerKind::MsgPack),
            "cbor" => Ok(SerializerKind::Cbor),
            other => Err(ConfigError::InvalidSerializer(other.to_string())),
        }
    }
}

/// Everything needed to open one session against a router.
#[derive(Clone, Default)]
pub struct ClientIdentity {
    pub url: String,
    pub realm: String,
    pub serializer: SerializerKind,
    pub authid: String,
    pub authrole: String,
    pub auth_method: AuthMethod,
    pub ticket: String,
    pub secret: String,
    pub private_key_hex: String,
}

impl ClientIdentity {
    pub fn new(url: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            realm: realm.into(),
            ..Default::default()
        }
    }

    pub fn serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn authid(mut self, authid: impl Into<String>) -> Self {
        self.authid = authid.into();
        self
    }

    pub fn authrole(mut self, authrole: impl Into<String>) -> Self {
        self.authrole = authrole.into();
        self
    }

    pub fn auth_method(mut self, method: AuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    pub fn ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = ticket.into();
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn private_key(mut self, private_key_hex: impl Into<String>) -> Self {
        self.private_key_hex = private_key_hex.into();
        self
    }

    /// Finish building: fails if the credentials conflict.
    ///
    /// Setters stay infallible so flags can be applied in any order; this is
    /// the construction gate, and [`crate::negotiate`] re-checks it.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.check_exclusive()?;
        Ok(self)
    }

    /// Fail if more than one of ticket, secret and private key is set.
    pub fn check_exclusive(&self) -> Result<(), ConfigError> {
        let populated = [&self.ticket, &self.secret, &self.private_key_hex]
            .iter()
            .filter(|value| !value.is_empty())
            .count();
        if populated > 1 {
            return Err(ConfigError::ConflictingCredentials);
        }
        Ok(())
    }

    /// The explicit method, or the one implied by whichever credential is set.
    pub fn effective_method(&self) -> AuthMethod {
        if self.auth_method != AuthMethod::Anonymous {
            return self.auth_method;
        }
        if !self.private_key_hex.is_empty() {
            AuthMethod::CryptoSign
        } else if !self.ticket.is_empty() {
            AuthMethod::Ticket
        } else if !self.secret.is_empty() {
            AuthMethod::WampCra
        } else {
            AuthMethod::Anonymous
        }
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("url", &self.url)
            .field("realm", &self.realm)
            .field("serializer", &self.serializer)
            .field("authid", &self.authid)
            .field("authrole", &self.authrole)
            .field("auth_method", &self.auth_method)
            .field("ticket", &redact(&self.ticket))
            .field("secret", &redact(&self.secret))
            .field("private_key_hex", &redact(&self.private_key_hex))
            .finish()
    }
}
