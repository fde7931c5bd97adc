//! Salted password hashing for the `users` table
//!
//! `hash = SHA-256(salt_hex || password)`, both stored as lowercase hex.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salted digest ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Generate a random 16-byte salt as 32 hex characters
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash a password with the given salt
///
/// # Examples
///
/// ```
/// use sonalyze_common::password::hash_with_salt;
///
/// let hash = hash_with_salt("secret", "00ff");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_with_salt("secret", "00ff"));
/// ```
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a password with a fresh salt
pub fn hash_password(password: &str) -> PasswordHash {
    let salt = generate_salt();
    let hash = hash_with_salt(password, &salt);
    PasswordHash { hash, salt }
}

/// Check a password against a stored hash and salt
pub fn verify_password(password: &str, stored_hash: &str, salt: &str) -> bool {
    constant_time_eq(hash_with_salt(password, salt).as_bytes(), stored_hash.as_bytes())
}

/// Compare two byte strings without early exit on the first mismatch
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
