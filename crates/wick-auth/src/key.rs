// ABOUTME: Ed25519 key handling for cryptosign authentication.
// ABOUTME: Parses 32/64-byte hex private keys, derives public keys, and generates fresh key pairs.

use crate::error::{AuthError, Result};
use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;

/// Raw length of an Ed25519 seed.
pub const SEED_LENGTH: usize = 32;

/// Raw length of a seed followed by its public half.
pub const EXTENDED_KEY_LENGTH: usize = 64;

/// An Ed25519 signing key used to answer cryptosign challenges.
#[derive(Clone)]
pub struct CryptosignKey {
    signing_key: SigningKey,
}

impl CryptosignKey {
    /// Parse a hex-encoded private key.
    ///
    /// Accepts either a 32-byte seed or a 64-byte key whose first 32 bytes
    /// are the seed. Any other decoded length is a [`AuthError::KeyLength`].
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let raw = hex::decode(private_key_hex.trim()).map_err(AuthError::InvalidKeyHex)?;
        Self::from_bytes(&raw)
    }

    /// Build a key from raw bytes (32-byte seed or 64-byte seed-prefixed key).
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let seed: [u8; SEED_LENGTH] = match raw.len() {
            SEED_LENGTH | EXTENDED_KEY_LENGTH => {
                let mut seed = [0u8; SEED_LENGTH];
                seed.copy_from_slice(&raw[..SEED_LENGTH]);
                seed
            }
            other => return Err(AuthError::KeyLength(other)),
        };

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut seed = [0u8; SEED_LENGTH];
        rand::thread_rng().fill_bytes(&mut seed);
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Hex-encoded 32-byte public key, as advertised in `authextra.pubkey`.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Hex-encoded 32-byte seed.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign raw bytes, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for CryptosignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptosignKey")
            .field("public_key", &self.public_key_hex())
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

/// Check that a string is a usable cryptosign private key without keeping it.
pub fn validate_private_key(private_key_hex: &str) -> Result<()> {
    CryptosignKey::from_hex(private_key_hex).map(|_| ())
}
