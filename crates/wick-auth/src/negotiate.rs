// ABOUTME: AuthNegotiator: turns a ClientIdentity into hello details plus the AuthVariant that answers challenges.
// ABOUTME: Enforces credential exclusivity and required credentials before any connection is attempted.

use crate::error::{ConfigError, Result};
use crate::identity::{AuthMethod, ClientIdentity};
use crate::key::CryptosignKey;
use crate::responder::AuthVariant;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Output of a successful negotiation.
#[derive(Debug, Clone)]
pub struct Negotiated {
    /// Extra HELLO details: `authid`, `authrole` and, for cryptosign, `authextra.pubkey`.
    pub hello: Map<String, Value>,
    pub variant: AuthVariant,
}

impl Negotiated {
    pub fn method(&self) -> &'static str {
        self.variant.method()
    }
}

/// Resolve the auth variant for `identity` and build its hello details.
pub fn negotiate(identity: &ClientIdentity) -> Result<Negotiated> {
    identity.check_exclusive()?;

    let method = identity.effective_method();
    let variant = match method {
        AuthMethod::Anonymous => AuthVariant::Anonymous,
        AuthMethod::Ticket => AuthVariant::Ticket {
            ticket: require(&identity.ticket, method, "ticket")?,
        },
        AuthMethod::WampCra => AuthVariant::ChallengeResponse {
            secret: require(&identity.secret, method, "secret")?,
        },
        AuthMethod::CryptoSign => {
            let private_key = require(&identity.private_key_hex, method, "private key")?;
            AuthVariant::CryptoSign {
                key: CryptosignKey::from_hex(&private_key)?,
            }
        }
    };

    let mut hello = Map::new();
    if !identity.authid.is_empty() {
        hello.insert("authid".to_string(), Value::String(identity.authid.clone()));
    }
    if !identity.authrole.is_empty() {
        hello.insert(
            "authrole".to_string(),
            Value::String(identity.authrole.clone()),
        );
    }
    if let AuthVariant::CryptoSign { key } = &variant {
        hello.insert(
            "authextra".to_string(),
            json!({ "pubkey": key.public_key_hex() }),
        );
    }

    debug!(authmethod = variant.method(), "negotiated auth variant");
    Ok(Negotiated { hello, variant })
}

fn require(value: &str, method: AuthMethod, credential: &'static str) -> Result<String> {
    if value.is_empty() {
        return Err(ConfigError::MissingCredential {
            method: method.as_str(),
            credential,
        }
        .into());
    }
    Ok(value.to_string())
}
