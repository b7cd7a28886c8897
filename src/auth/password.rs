//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with the library's default cost parameters.
//! The PHC-formatted output embeds salt and parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

/// Hashing failed for a reason unrelated to the password itself
#[derive(Debug, thiserror::Error)]
#[error("Failed to hash password: {0}")]
pub struct HashingError(String);

impl From<HashingError> for crate::types::QuillError {
    fn from(err: HashingError) -> Self {
        Self::Auth(err.to_string())
    }
}

/// Hash a password using Argon2id with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashingError(e.to_string()))
}

/// Verify a password against a stored hash
///
/// Returns false for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
