//! Deterministic `hash(salt, secret) -> digest` functions.
//!
//! The token checksum binding always uses [`sha256_hex`]. Password storage
//! goes through a [`PasswordDigest`] so deployments can pick the cost.

use argon2::Argon2;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Password hashing failed
#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct DigestError(String);

/// `hex(sha256(salt ‖ secret))`
pub fn sha256_hex(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Deterministic salted digest with no side effects
pub trait PasswordDigest: Send + Sync {
    fn digest(&self, salt: &str, secret: &str) -> Result<String, DigestError>;
}

/// Plain salted SHA-256
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl PasswordDigest for Sha256Digest {
    fn digest(&self, salt: &str, secret: &str) -> Result<String, DigestError> {
        Ok(sha256_hex(salt, secret))
    }
}

/// Argon2id with the stored salt and a server-side pepper
#[derive(Clone, Default)]
pub struct Argon2Digest {
    pepper: String,
}

impl Argon2Digest {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }
}

impl PasswordDigest for Argon2Digest {
    fn digest(&self, salt: &str, secret: &str) -> Result<String, DigestError> {
        let peppered = format!("{}{}", secret, self.pepper);
        let mut out = [0u8; 32];
        Argon2::default()
            .hash_password_into(peppered.as_bytes(), salt.as_bytes(), &mut out)
            .map_err(|e| DigestError(e.to_string()))?;
        Ok(hex::encode(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_is_deterministic_and_salted() {
        assert_eq!(sha256_hex("salt", "pw"), sha256_hex("salt", "pw"));
        assert_ne!(sha256_hex("salt", "pw"), sha256_hex("other", "pw"));
        assert_eq!(sha256_hex("a", "b").len(), 64);
    }

    #[test]
    fn test_argon2_is_deterministic() {
        let digest = Argon2Digest::new("pepper");
        let salt = "0123456789abcdef0123456789abcdef";
        let a = digest.digest(salt, "secret").unwrap();
        let b = digest.digest(salt, "secret").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, digest.digest(salt, "other").unwrap());
    }

    #[test]
    fn test_argon2_pepper_changes_digest() {
        let salt = "0123456789abcdef0123456789abcdef";
        let a = Argon2Digest::new("one").digest(salt, "secret").unwrap();
        let b = Argon2Digest::new("two").digest(salt, "secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_argon2_rejects_short_salt() {
        assert!(Argon2Digest::default().digest("abc", "secret").is_err());
    }
}
