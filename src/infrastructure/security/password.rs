use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;

use crate::domain::error::{AppError, Result};

/// Verified against when the username is unknown, so both failure paths
/// cost one argon2 verification.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| PasswordManager::new().hash("dataloom-dummy-password").ok());

pub struct PasswordManager {
    argon2: Argon2<'static>,
}

impl PasswordManager {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Salted argon2id hash in PHC string form
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::SecurityError(format!("Failed to hash password: {}", e)))
    }

    /// Constant-time check. A malformed stored hash counts as a mismatch.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Burn one verification for a user that does not exist
    pub fn verify_dummy(&self, password: &str) {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = self.verify(password, hash);
        }
    }
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_and_verifiable() {
        let manager = PasswordManager::new();
        let first = manager.hash("correct horse").unwrap();
        let second = manager.hash("correct horse").unwrap();

        assert_ne!(first, second);
        assert!(!first.contains("correct horse"));
        assert!(first.starts_with("$argon2id$"));
        assert!(manager.verify("correct horse", &first));
        assert!(!manager.verify("battery staple", &first));
    }

    #[test]
    fn test_malformed_hash_is_mismatch() {
        assert!(!PasswordManager::new().verify("anything", "plaintext-password"));
    }
}
