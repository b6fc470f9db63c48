//! Temporary credentials for newly created accounts.
//!
//! Imported participants get a generated one-time password, hashed for
//! storage and (optionally) delivered by welcome email. The trait is the
//! seam where a production deployment swaps in its own KDF.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated temporary passwords.
const TEMP_PASSWORD_LEN: usize = 12;

/// Hashing and generation of temporary credentials.
pub trait PasswordHasher {
    /// Hash a plaintext password for storage.
    fn hash(&self, plaintext: &str) -> String;

    /// Generate a fresh temporary password.
    fn generate_temp_password(&self) -> String;
}

/// SHA-256 digests, hex-encoded.
#[derive(Debug, Default)]
pub struct Sha256PasswordHasher;

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, plaintext: &str) -> String {
        format!("{:x}", Sha256::digest(plaintext.as_bytes()))
    }

    fn generate_temp_password(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TEMP_PASSWORD_LEN)
            .map(char::from)
            .collect()
    }
}
