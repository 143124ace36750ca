// ABOUTME: keygen command: print a fresh ed25519 keypair for cryptosign
// ABOUTME: The private key is the 32-byte seed, both halves hex encoded

use anyhow::Result;
use wick_auth::CryptosignKey;

pub fn run() -> Result<()> {
    let key = CryptosignKey::generate();
    println!("Public Key: {}", key.public_key_hex());
    println!("Private Key: {}", key.seed_hex());
    Ok(())
}
