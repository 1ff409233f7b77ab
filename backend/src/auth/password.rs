//! Password hashing using argon2
//!
//! Provides secure password hashing and verification.
//!
//! # Performance Considerations
//!
//! Argon2 is intentionally CPU-intensive. Request handlers use the `_async`
//! variants, which run on tokio's blocking pool.

use crate::config::PasswordConfig;
use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use thiserror::Error;

/// Prefix shared by all bcrypt hash variants ($2a$, $2b$, $2y$)
const BCRYPT_PREFIX: &str = "$2";

/// Internal hashing failure or a malformed stored hash
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(String);

impl HashingError {
    fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// Password hashing service
///
/// New hashes are Argon2id PHC strings. Stored bcrypt hashes from older
/// deployments are still accepted by `verify`.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    dummy_hash: Arc<OnceCell<String>>,
}

impl PasswordService {
    /// Build a service with the configured Argon2 cost
    pub fn new(config: &PasswordConfig) -> Result<Self, HashingError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(HashingError::new)?;
        Ok(Self {
            params,
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password using argon2 (blocking operation)
    pub fn hash(&self, password: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(password.as_bytes(), &salt)
            .map_err(HashingError::new)?;
        Ok(hash.to_string())
    }

    /// Hash a password asynchronously (non-blocking)
    pub async fn hash_async(&self, password: String) -> Result<String, HashingError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|e| HashingError::new(format!("task join error: {}", e)))?
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// Returns `Ok(false)` on mismatch. Errors only when the stored hash
    /// cannot be parsed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, HashingError> {
        if hash.starts_with(BCRYPT_PREFIX) {
            return bcrypt::verify(password, hash).map_err(HashingError::new);
        }

        let parsed_hash = PasswordHash::new(hash).map_err(HashingError::new)?;
        // Salt and cost come from the stored hash, not from `self.params`
        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashingError::new(e)),
        }
    }

    /// Verify a password asynchronously (non-blocking)
    pub async fn verify_async(&self, password: String, hash: String) -> Result<bool, HashingError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify(&password, &hash))
            .await
            .map_err(|e| HashingError::new(format!("task join error: {}", e)))?
    }

    /// Spend the same work as a real verification and discard the result
    ///
    /// Used when the account does not exist, so that a failed login takes
    /// about as long whether or not the email is registered.
    pub async fn verify_dummy_async(&self, password: String) -> Result<(), HashingError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || {
            let hash = service
                .dummy_hash
                .get_or_try_init(|| service.hash("dummy-password-for-timing"))?;
            service.verify(&password, hash).map(|_| ())
        })
        .await
        .map_err(|e| HashingError::new(format!("task join error: {}", e)))?
    }
}
