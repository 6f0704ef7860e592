//! Credential verification.
//!
//! `expected = SHA-224(salt_bytes || secret_bytes)`, compared with the claimed
//! digest after uppercasing both hex forms. The comparison is a plain string
//! equality and is not constant-time.

use crate::core::message::SALT_LEN;
use crate::credentials::CredentialStore;
use crate::error::AuthFailure;
use sha2::{Digest, Sha224};

/// Uppercase hex SHA-224 of `salt || secret`.
pub fn expected_hash(salt: &[u8], secret: &str) -> String {
    let mut hasher = Sha224::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hex::encode_upper(hasher.finalize())
}

/// Decide authenticity, reporting why a request was refused.
///
/// The reason is for logs only; callers must answer every failure the same way.
pub fn check(
    store: &dyn CredentialStore,
    login: &str,
    salt_hex: &str,
    claimed_hash_hex: &str,
) -> Result<(), AuthFailure> {
    let secret = store.lookup(login).ok_or(AuthFailure::UnknownLogin)?;

    let salt = hex::decode(salt_hex).map_err(|_| AuthFailure::InvalidSalt)?;
    if salt.len() != SALT_LEN {
        return Err(AuthFailure::InvalidSalt);
    }

    if expected_hash(&salt, secret) == claimed_hash_hex.to_ascii_uppercase() {
        Ok(())
    } else {
        Err(AuthFailure::HashMismatch)
    }
}

/// `true` only when the claimed hash matches the stored secret.
pub fn verify(
    store: &dyn CredentialStore,
    login: &str,
    salt_hex: &str,
    claimed_hash_hex: &str,
) -> bool {
    check(store, login, salt_hex, claimed_hash_hex).is_ok()
}
