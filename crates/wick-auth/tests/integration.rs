// ABOUTME: Integration tests for wick-auth.
// ABOUTME: Drives negotiate() end to end and answers challenges with the resulting variant.

use serde_json::{json, Map, Value};
use wick_auth::{
    derive_cra_key, negotiate, sign_cra_challenge, AuthError, AuthMethod, Challenge,
    ClientIdentity, ConfigError,
};

const SEED_HEX: &str = "b99067e6e271ae300f3f5d9809fa09288e96f2bcef8dd54b7aabeb4e579d37ef";
const PUBLIC_HEX: &str = "22509ce613c8d604305a8134819f8ffb7ed601b3d0d94253f66fc5d81c94e714";
const CHALLENGE_HEX: &str = "a1d483092ec08960fedbaed2bc1d411568a59077b794210e251bd3abb1563f7c";
const SIGNATURE_HEX: &str = "906b90ae9b8ebb76c0005e2092ea3c77e3d832d841909c18dd25a9d8c87681337a6fd9938c38f7c77216cd5915e7396e942ed4de2eee71d4068f4cc12cb6a40a";

fn extra(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("extra must be an object"),
    }
}

fn identity() -> ClientIdentity {
    ClientIdentity::new("ws://localhost:8080/ws", "realm1")
}

// ============================================================================
// Negotiate + respond
// ============================================================================

#[test]
fn test_cryptosign_negotiate_and_respond() {
    let negotiated = negotiate(&identity().authid("alice").private_key(SEED_HEX))
        .expect("should negotiate");

    assert_eq!(negotiated.hello["authid"], json!("alice"));
    assert_eq!(negotiated.hello["authextra"]["pubkey"], json!(PUBLIC_HEX));

    let response = negotiated
        .variant
        .respond(&Challenge::new(
            "cryptosign",
            extra(json!({ "challenge": CHALLENGE_HEX })),
        ))
        .expect("should respond");
    assert_eq!(response.signature, format!("{SIGNATURE_HEX}{CHALLENGE_HEX}"));
}

#[test]
fn test_cryptosign_extended_key_matches_seed() {
    let extended = format!("{SEED_HEX}{PUBLIC_HEX}");
    let short = negotiate(&identity().private_key(SEED_HEX)).expect("should negotiate");
    let long = negotiate(&identity().private_key(extended)).expect("should negotiate");

    assert_eq!(short.hello, long.hello);

    let challenge = Challenge::new("cryptosign", extra(json!({ "challenge": CHALLENGE_HEX })));
    assert_eq!(
        short.variant.respond(&challenge).expect("should respond"),
        long.variant.respond(&challenge).expect("should respond")
    );
}

#[test]
fn test_cra_negotiate_and_respond_salted() {
    let negotiated = negotiate(&identity().auth_method(AuthMethod::WampCra).secret("williamsburg"))
        .expect("should negotiate");

    let response = negotiated
        .variant
        .respond(&Challenge::new(
            "wampcra",
            extra(json!({
                "challenge": "{\"nonce\":\"abc\"}",
                "salt": "salt123",
                "iterations": 1000,
                "keylen": 32
            })),
        ))
        .expect("should respond");

    let key = derive_cra_key("williamsburg", "salt123", 1000, 32);
    assert_eq!(
        response.signature,
        sign_cra_challenge(key.as_bytes(), "{\"nonce\":\"abc\"}")
    );
}

#[test]
fn test_ticket_negotiate_and_respond() {
    let negotiated = negotiate(&identity().ticket("let-me-in")).expect("should negotiate");
    let response = negotiated
        .variant
        .respond(&Challenge::new("ticket", Map::new()))
        .expect("should respond");
    assert_eq!(response.signature, "let-me-in");
}

// ============================================================================
// Configuration failures
// ============================================================================

#[test]
fn test_every_credential_pair_conflicts() {
    let builders: [fn(ClientIdentity) -> ClientIdentity; 3] = [
        |i| i.ticket("t"),
        |i| i.secret("s"),
        |i| i.private_key(SEED_HEX),
    ];
    for (a, first) in builders.iter().enumerate() {
        for (b, second) in builders.iter().enumerate() {
            if a == b {
                continue;
            }
            let result = negotiate(&second(first(identity())));
            assert!(
                matches!(
                    result,
                    Err(AuthError::Config(ConfigError::ConflictingCredentials))
                ),
                "pair ({a}, {b}) should conflict"
            );
        }
    }
}

#[test]
fn test_key_length_error_for_odd_lengths() {
    for len in [16usize, 31, 33, 48, 63, 65] {
        let result = negotiate(&identity().private_key("00".repeat(len)));
        assert!(
            matches!(result, Err(AuthError::KeyLength(actual)) if actual == len),
            "{len} bytes should fail"
        );
    }
}
