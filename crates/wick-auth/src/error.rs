// ABOUTME: Error types for credential validation and challenge signing using thiserror.
// ABOUTME: ConfigError covers pre-connect validation; AuthError wraps it plus signing failures.

use thiserror::Error;

/// Validation failures detected before any network activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// More than one of ticket, secret and private key was supplied.
    #[error("provide only one of private key, ticket or secret")]
    ConflictingCredentials,

    /// The selected auth method needs a credential that was not supplied.
    #[error("must provide {credential} when authmethod is {method}")]
    MissingCredential {
        method: &'static str,
        credential: &'static str,
    },

    /// A credential was supplied that the selected auth method does not use.
    #[error("{credential} not needed for {method} auth")]
    UnusedCredential {
        method: &'static str,
        credential: &'static str,
    },

    /// Unknown auth method name.
    #[error(
        "invalid authmethod '{0}': value must be one of 'anonymous', 'ticket', 'wampcra', 'cryptosign'"
    )]
    InvalidAuthMethod(String),

    /// Unknown serializer name.
    #[error("invalid serializer '{0}': serializer must be 'json', 'msgpack' or 'cbor'")]
    InvalidSerializer(String),

    /// URL could not be parsed.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// URL parsed but its scheme is not a WAMP transport.
    #[error("invalid url scheme '{0}': scheme must be one of ws, wss, rs, rss, tcp, tcps")]
    InvalidScheme(String),

    /// Realm is empty or not a valid URI.
    #[error("invalid realm '{0}': is unset or not a valid uri")]
    InvalidRealm(String),
}

/// Errors raised while negotiating credentials or answering a challenge.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Endpoint or credential configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cryptosign private key has the wrong raw length.
    #[error("invalid private key: decoded length is {0} bytes, cryptosign keys must be 32 or 64 bytes")]
    KeyLength(usize),

    /// Cryptosign private key is not valid hex.
    #[error("invalid private key: {0}")]
    InvalidKeyHex(#[source] hex::FromHexError),

    /// Challenge extra lacks the `challenge` field.
    #[error("challenge is missing the 'challenge' field")]
    MissingChallenge,

    /// Cryptosign challenge is not valid hex.
    #[error("cryptosign challenge is not valid hex: {0}")]
    InvalidChallengeHex(#[source] hex::FromHexError),

    /// The router asked for a method other than the one configured.
    #[error("router requested authmethod '{requested}' but '{configured}' is configured")]
    MethodMismatch {
        requested: String,
        configured: &'static str,
    },

    /// Anonymous sessions have no challenge handler.
    #[error("received a '{0}' challenge but no credentials are configured")]
    NoChallengeHandler(String),
}

/// Result type alias using AuthError.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_credentials_display() {
        let err = ConfigError::ConflictingCredentials;
        assert_eq!(
            err.to_string(),
            "provide only one of private key, ticket or secret"
        );
    }

    #[test]
    fn test_missing_credential_display() {
        let err = ConfigError::MissingCredential {
            method: "cryptosign",
            credential: "private key",
        };
        assert_eq!(
            err.to_string(),
            "must provide private key when authmethod is cryptosign"
        );
    }

    #[test]
    fn test_key_length_display() {
        let err = AuthError::KeyLength(31);
        let display = err.to_string();
        assert!(display.contains("31 bytes"));
        assert!(display.contains("32 or 64"));
    }

    #[test]
    fn test_config_error_is_labelled() {
        let err: AuthError = ConfigError::InvalidScheme("http".to_string()).into();
        assert!(err
            .to_string()
            .starts_with("configuration error: invalid url scheme 'http'"));
        assert!(matches!(err, AuthError::Config(ConfigError::InvalidScheme(_))));
    }

    #[test]
    fn test_method_mismatch_display() {
        let err = AuthError::MethodMismatch {
            requested: "ticket".to_string(),
            configured: "wampcra",
        };
        assert!(err.to_string().contains("'ticket'"));
        assert!(err.to_string().contains("'wampcra'"));
    }
}
