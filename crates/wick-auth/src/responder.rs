// ABOUTME: Challenge responders for ticket, WAMP-CRA and cryptosign authentication.
// ABOUTME: AuthVariant owns its credential and answers router challenges without shared state.

use crate::error::{AuthError, Result};
use crate::key::CryptosignKey;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

/// Auth method names as they appear on the wire.
pub const ANONYMOUS: &str = "anonymous";
pub const TICKET: &str = "ticket";
pub const WAMPCRA: &str = "wampcra";
pub const CRYPTOSIGN: &str = "cryptosign";

/// PBKDF2 iteration count used when the router sends none.
pub const DEFAULT_CRA_ITERATIONS: u32 = 1000;

/// Derived key length used when the router sends none.
pub const DEFAULT_CRA_KEY_LENGTH: usize = 32;

/// A CHALLENGE received from the router.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Challenge {
    pub auth_method: String,
    pub extra: Map<String, Value>,
}

impl Challenge {
    pub fn new(auth_method: impl Into<String>, extra: Map<String, Value>) -> Self {
        Self {
            auth_method: auth_method.into(),
            extra,
        }
    }

    fn extra_str(&self, field: &str) -> Option<&str> {
        self.extra.get(field).and_then(Value::as_str)
    }

    /// Integer field, 0 when absent, negative, or not an integer.
    fn extra_uint(&self, field: &str) -> u64 {
        self.extra.get(field).and_then(Value::as_u64).unwrap_or(0)
    }
}

/// The signature and extra dictionary sent back in AUTHENTICATE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallengeResponse {
    pub signature: String,
    pub extra: Map<String, Value>,
}

impl ChallengeResponse {
    fn new(signature: String) -> Self {
        Self {
            signature,
            extra: Map::new(),
        }
    }
}

/// One authentication method together with the credential it needs.
#[derive(Clone)]
pub enum AuthVariant {
    Anonymous,
    Ticket { ticket: String },
    ChallengeResponse { secret: String },
    CryptoSign { key: CryptosignKey },
}

impl AuthVariant {
    /// Wire name of this method.
    pub fn method(&self) -> &'static str {
        match self {
            AuthVariant::Anonymous => ANONYMOUS,
            AuthVariant::Ticket { .. } => TICKET,
            AuthVariant::ChallengeResponse { .. } => WAMPCRA,
            AuthVariant::CryptoSign { .. } => CRYPTOSIGN,
        }
    }

    /// Whether this variant can answer a challenge at all.
    pub fn handles_challenges(&self) -> bool {
        !matches!(self, AuthVariant::Anonymous)
    }

    /// Answer a router challenge.
    ///
    /// # Errors
    /// - [`AuthError::NoChallengeHandler`] for anonymous sessions.
    /// - [`AuthError::MethodMismatch`] when the challenge names another method.
    /// - [`AuthError::MissingChallenge`] / [`AuthError::InvalidChallengeHex`]
    ///   when the challenge extra is unusable.
    pub fn respond(&self, challenge: &Challenge) -> Result<ChallengeResponse> {
        if let AuthVariant::Anonymous = self {
            return Err(AuthError::NoChallengeHandler(challenge.auth_method.clone()));
        }
        if !challenge.auth_method.is_empty() && challenge.auth_method != self.method() {
            return Err(AuthError::MethodMismatch {
                requested: challenge.auth_method.clone(),
                configured: self.method(),
            });
        }

        match self {
            AuthVariant::Anonymous => unreachable!("handled above"),
            AuthVariant::Ticket { ticket } => Ok(ChallengeResponse::new(ticket.clone())),
            AuthVariant::ChallengeResponse { secret } => respond_cra(secret, challenge),
            AuthVariant::CryptoSign { key } => respond_cryptosign(key, challenge),
        }
    }
}

impl std::fmt::Debug for AuthVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthVariant::Anonymous => f.write_str("Anonymous"),
            AuthVariant::Ticket { .. } => f
                .debug_struct("Ticket")
                .field("ticket", &"[REDACTED]")
                .finish(),
            AuthVariant::ChallengeResponse { .. } => f
                .debug_struct("ChallengeResponse")
                .field("secret", &"[REDACTED]")
                .finish(),
            AuthVariant::CryptoSign { key } => {
                f.debug_struct("CryptoSign").field("key", key).finish()
            }
        }
    }
}

fn respond_cra(secret: &str, challenge: &Challenge) -> Result<ChallengeResponse> {
    let to_sign = challenge
        .extra_str("challenge")
        .ok_or(AuthError::MissingChallenge)?;

    let signing_key = match challenge.extra_str("salt") {
        Some(salt) if !salt.is_empty() => {
            let iterations = u32::try_from(challenge.extra_uint("iterations")).unwrap_or(0);
            let key_length = usize::try_from(challenge.extra_uint("keylen")).unwrap_or(0);
            derive_cra_key(secret, salt, iterations, key_length).into_bytes()
        }
        _ => secret.as_bytes().to_vec(),
    };

    Ok(ChallengeResponse::new(sign_cra_challenge(
        &signing_key,
        to_sign,
    )))
}

/// Derive the salted WAMP-CRA key.
///
/// Returns the base64 text of the PBKDF2-HMAC-SHA256 output; routers sign
/// with that text, not with the raw derived bytes. Zero `iterations` or
/// `key_length` fall back to 1000 and 32.
pub fn derive_cra_key(secret: &str, salt: &str, iterations: u32, key_length: usize) -> String {
    let iterations = if iterations == 0 {
        DEFAULT_CRA_ITERATIONS
    } else {
        iterations
    };
    let key_length = if key_length == 0 {
        DEFAULT_CRA_KEY_LENGTH
    } else {
        key_length
    };

    let mut derived = vec![0u8; key_length];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), iterations, &mut derived);
    base64::engine::general_purpose::STANDARD.encode(derived)
}

/// base64(HMAC-SHA256(key, challenge)).
pub fn sign_cra_challenge(key: &[u8], challenge: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(challenge.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

fn respond_cryptosign(key: &CryptosignKey, challenge: &Challenge) -> Result<ChallengeResponse> {
    let challenge_hex = challenge
        .extra_str("challenge")
        .ok_or(AuthError::MissingChallenge)?;
    let challenge_bytes = hex::decode(challenge_hex).map_err(AuthError::InvalidChallengeHex)?;

    let signature = key.sign(&challenge_bytes);
    Ok(ChallengeResponse::new(format!(
        "{}{}",
        hex::encode(signature),
        hex::encode(&challenge_bytes)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SEED_HEX: &str = "b99067e6e271ae300f3f5d9809fa09288e96f2bcef8dd54b7aabeb4e579d37ef";
    const PUBLIC_HEX: &str = "22509ce613c8d604305a8134819f8ffb7ed601b3d0d94253f66fc5d81c94e714";
    const CHALLENGE_HEX: &str = "a1d483092ec08960fedbaed2bc1d411568a59077b794210e251bd3abb1563f7c";
    const SIGNATURE_HEX: &str = "906b90ae9b8ebb76c0005e2092ea3c77e3d832d841909c18dd25a9d8c87681337a6fd9938c38f7c77216cd5915e7396e942ed4de2eee71d4068f4cc12cb6a40a";

    fn challenge(method: &str, extra: Value) -> Challenge {
        match extra {
            Value::Object(map) => Challenge::new(method, map),
            _ => panic!("extra must be an object"),
        }
    }

    #[test]
    fn test_ticket_ignores_extra() {
        let variant = AuthVariant::Ticket {
            ticket: "open-sesame".to_string(),
        };
        let response = variant
            .respond(&challenge(TICKET, json!({"challenge": "whatever"})))
            .expect("ticket never fails");
        assert_eq!(response.signature, "open-sesame");
        assert!(response.extra.is_empty());
    }

    #[test]
    fn test_cra_unsalted_signs_with_raw_secret() {
        let variant = AuthVariant::ChallengeResponse {
            secret: "williamsburg".to_string(),
        };
        let response = variant
            .respond(&challenge(WAMPCRA, json!({"challenge": "{\"nonce\":\"abc\"}"})))
            .expect("should sign");
        assert_eq!(
            response.signature,
            "XjhiAjsAxDi1+31SwGUhaLg6zT6noWfGeKiUFBHqYOE="
        );
        assert_eq!(
            response.signature,
            sign_cra_challenge(b"williamsburg", "{\"nonce\":\"abc\"}")
        );
    }

    #[test]
    fn test_cra_empty_salt_is_unsalted() {
        let variant = AuthVariant::ChallengeResponse {
            secret: "williamsburg".to_string(),
        };
        let response = variant
            .respond(&challenge(
                WAMPCRA,
                json!({"challenge": "{\"nonce\":\"abc\"}", "salt": "", "iterations": 5}),
            ))
            .expect("should sign");
        assert_eq!(
            response.signature,
            "XjhiAjsAxDi1+31SwGUhaLg6zT6noWfGeKiUFBHqYOE="
        );
    }

    #[test]
    fn test_cra_salted_defaults() {
        assert_eq!(
            derive_cra_key("williamsburg", "salt123", 0, 0),
            "Be2qU5KofgFo5/DwUVLQfI1pV19YMhdwbD3TxmuGI8U="
        );

        let variant = AuthVariant::ChallengeResponse {
            secret: "williamsburg".to_string(),
        };
        let response = variant
            .respond(&challenge(
                WAMPCRA,
                json!({
                    "challenge": "{\"nonce\":\"abc\"}",
                    "salt": "salt123",
                    "iterations": 0,
                    "keylen": 0
                }),
            ))
            .expect("should sign");
        assert_eq!(
            response.signature,
            "UWhbept/50m1MuUPmiy5e7KrAOsBG3JLURTQRaxVeAY="
        );
    }

    #[test]
    fn test_cra_salted_explicit_parameters() {
        assert_eq!(
            derive_cra_key("secret", "pepper", 100, 16),
            "Q2MiYs0cNb0AXqdnFynWnA=="
        );

        let variant = AuthVariant::ChallengeResponse {
            secret: "secret".to_string(),
        };
        let response = variant
            .respond(&challenge(
                WAMPCRA,
                json!({"challenge": "challenge", "salt": "pepper", "iterations": 100, "keylen": 16}),
            ))
            .expect("should sign");
        assert_eq!(
            response.signature,
            "OiNV/RjxRlzMyFLrddp+vxbp859034xJAZupYkRvF+0="
        );
    }

    #[test]
    fn test_cra_missing_challenge() {
        let variant = AuthVariant::ChallengeResponse {
            secret: "s".to_string(),
        };
        let result = variant.respond(&challenge(WAMPCRA, json!({})));
        assert!(matches!(result, Err(AuthError::MissingChallenge)));
    }

    #[test]
    fn test_cryptosign_known_answer() {
        let variant = AuthVariant::CryptoSign {
            key: CryptosignKey::from_hex(SEED_HEX).expect("should parse seed"),
        };
        let response = variant
            .respond(&challenge(CRYPTOSIGN, json!({"challenge": CHALLENGE_HEX})))
            .expect("should sign");
        assert_eq!(response.signature, format!("{SIGNATURE_HEX}{CHALLENGE_HEX}"));
        assert!(response.extra.is_empty());
    }

    #[test]
    fn test_cryptosign_seed_and_extended_key_agree() {
        let short = AuthVariant::CryptoSign {
            key: CryptosignKey::from_hex(SEED_HEX).expect("should parse seed"),
        };
        let long = AuthVariant::CryptoSign {
            key: CryptosignKey::from_hex(&format!("{SEED_HEX}{PUBLIC_HEX}"))
                .expect("should parse extended key"),
        };
        let c = challenge(CRYPTOSIGN, json!({"challenge": CHALLENGE_HEX}));
        assert_eq!(
            short.respond(&c).expect("should sign").signature,
            long.respond(&c).expect("should sign").signature
        );
    }

    #[test]
    fn test_cryptosign_response_has_no_separator() {
        let variant = AuthVariant::CryptoSign {
            key: CryptosignKey::generate(),
        };
        let response = variant
            .respond(&challenge(CRYPTOSIGN, json!({"challenge": "00ff"})))
            .expect("should sign");
        assert_eq!(response.signature.len(), 128 + 4);
        assert!(response.signature.ends_with("00ff"));
        assert!(response.signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cryptosign_rejects_bad_challenge_hex() {
        let variant = AuthVariant::CryptoSign {
            key: CryptosignKey::generate(),
        };
        let result = variant.respond(&challenge(CRYPTOSIGN, json!({"challenge": "zz"})));
        assert!(matches!(result, Err(AuthError::InvalidChallengeHex(_))));
    }

    #[test]
    fn test_anonymous_has_no_handler() {
        assert!(!AuthVariant::Anonymous.handles_challenges());
        let result = AuthVariant::Anonymous.respond(&challenge(TICKET, json!({})));
        assert!(matches!(result, Err(AuthError::NoChallengeHandler(m)) if m == "ticket"));
    }

    #[test]
    fn test_method_mismatch_is_rejected() {
        let variant = AuthVariant::Ticket {
            ticket: "t".to_string(),
        };
        let result = variant.respond(&challenge(WAMPCRA, json!({"challenge": "x"})));
        assert!(matches!(result, Err(AuthError::MethodMismatch { .. })));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let variant = AuthVariant::ChallengeResponse {
            secret: "hunter2".to_string(),
        };
        assert!(!format!("{variant:?}").contains("hunter2"));
        let variant = AuthVariant::Ticket {
            ticket: "hunter2".to_string(),
        };
        assert!(!format!("{variant:?}").contains("hunter2"));
    }
}
