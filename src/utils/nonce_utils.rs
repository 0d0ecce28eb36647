use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Creates a sign-in nonce: a random UUID hashed with SHA-256, hex encoded.
pub fn create_nonce() -> String {
    hash_nonce(&Uuid::new_v4().to_string())
}

pub fn hash_nonce(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
