// ABOUTME: Authentication for wick: credential negotiation and challenge responders.
// ABOUTME: Provides ClientIdentity, AuthVariant, negotiate(), cryptosign keys and endpoint validation.

pub mod endpoint;
pub mod error;
pub mod identity;
pub mod key;
pub mod negotiate;
pub mod responder;

// Endpoint validation
pub use endpoint::{is_raw_socket, normalize_url, validate_realm, validate_url, ACCEPTED_SCHEMES};

// Error types
pub use error::{AuthError, ConfigError, Result};

// Identity
pub use identity::{AuthMethod, ClientIdentity, SerializerKind};

// Keys
pub use key::{validate_private_key, CryptosignKey};

// Negotiation
pub use negotiate::{negotiate, Negotiated};

// Challenge responders
pub use responder::{
    derive_cra_key, sign_cra_challenge, AuthVariant, Challenge, ChallengeResponse,
};
