//! JWT session token generation and validation
//!
//! Tokens are HS256-signed claim sets carrying the user id and an absolute
//! expiry. Nothing about a token is stored server side.

use super::clock::{Clock, SystemClock};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Parse the subject as a user id
    pub fn subject(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Token verification and signing failures
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature mismatch, wrong key, or a structurally broken token
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    /// `iat + ttl` does not fit in a timestamp
    #[error("token lifetime out of range")]
    LifetimeOutOfRange,

    #[error("failed to sign token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// Pre-computed JWT keys for efficient token operations
/// These are expensive to create, so we cache them in AppState
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    /// Create new JWT keys from secret
    /// This should be called once at startup
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: Arc::new(EncodingKey::from_secret(bytes)),
            decoding: Arc::new(DecodingKey::from_secret(bytes)),
        }
    }
}

/// JWT service for token operations
///
/// Cloning is cheap: keys, validation rules and the clock are shared.
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    validation: Arc<Validation>,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl JwtService {
    /// Create a new JWT service backed by the system clock
    ///
    /// Call this once at application startup and store in AppState.
    pub fn new(secret: &SecretString, ttl_secs: i64) -> Self {
        Self::with_clock(secret, ttl_secs, Arc::new(SystemClock))
    }

    /// Create a JWT service with an explicit time source
    pub fn with_clock(secret: &SecretString, ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        // Expiry is checked against our own clock with zero leeway, so the
        // library check is turned off. `exp` and `sub` must still be present.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            keys: JwtKeys::new(secret),
            validation: Arc::new(validation),
            ttl_secs,
            clock,
        }
    }

    /// Issue a session token for a user
    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        let iat = self.clock.now().timestamp();
        let exp = iat
            .checked_add(self.ttl_secs)
            .ok_or(TokenError::LifetimeOutOfRange)?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(TokenError::Encoding)
    }

    /// Verify a token and return its claims
    ///
    /// Any token not signed with this service's secret is rejected as
    /// `InvalidSignature`, whatever the underlying decode failure was.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data =
            decode::<Claims>(token, &self.keys.decoding, &self.validation).map_err(|e| {
                debug!(error = %e, "Token failed verification");
                TokenError::InvalidSignature
            })?;

        let claims = token_data.claims;
        if self.clock.now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Token lifetime in seconds
    #[inline]
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }
}
