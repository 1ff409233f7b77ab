//! User service for registration and login
//!
//! # Performance Optimizations
//!
//! - Password hashing/verification runs on blocking thread pool
//! - JWT service is passed by reference (pre-computed keys)

use crate::auth::{JwtService, PasswordService};
use crate::error::ApiError;
use crate::repositories::{CredentialStore, StoreError};
use notes_hub_shared::types::{LoginRequest, RegisterRequest, UserSummary};
use notes_hub_shared::validation::{require_credentials, validate_email, validate_password};
use tracing::{debug, info};

/// A freshly authenticated session: who, plus the token to hand back
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserSummary,
    pub token: String,
}

/// Dependencies shared by the authentication flows
#[derive(Clone, Copy)]
pub struct AuthDeps<'a> {
    pub users: &'a dyn CredentialStore,
    pub passwords: &'a PasswordService,
    pub jwt: &'a JwtService,
}

fn count(name: &'static str, outcome: &'static str) {
    metrics::counter!(name, "outcome" => outcome).increment(1);
}

/// User service for authentication operations
pub struct UserService;

impl UserService {
    /// Register a new user and open a session
    ///
    /// # Performance
    /// Password hashing is offloaded to blocking thread pool via `spawn_blocking`.
    pub async fn register(deps: AuthDeps<'_>, req: RegisterRequest) -> Result<AuthSession, ApiError> {
        let result = Self::register_inner(deps, req).await;
        count(
            "auth_register_total",
            match &result {
                Ok(_) => "success",
                Err(ApiError::DuplicateAccount) => "duplicate",
                Err(ApiError::Validation(_)) => "invalid",
                Err(_) => "error",
            },
        );
        result
    }

    async fn register_inner(deps: AuthDeps<'_>, req: RegisterRequest) -> Result<AuthSession, ApiError> {
        let creds = require_credentials(req.email.as_deref(), req.password.as_deref())?;
        validate_email(&creds.email)?;
        validate_password(&creds.password)?;

        // Cheap pre-check; the store's unique constraint is the real guard
        if deps.users.find_by_email(&creds.email).await?.is_some() {
            return Err(ApiError::DuplicateAccount);
        }

        // Hash password on blocking thread pool (CPU-intensive)
        let password_hash = deps.passwords.hash_async(creds.password).await?;

        let user = match deps.users.insert(&creds.email, &password_hash).await {
            Ok(user) => user,
            Err(StoreError::DuplicateAccount) => {
                debug!("Concurrent registration lost the race for the same email");
                return Err(ApiError::DuplicateAccount);
            }
            Err(e) => return Err(e.into()),
        };

        let token = deps.jwt.issue(user.id)?;
        info!(user_id = %user.id, "User registered");

        Ok(AuthSession {
            user: UserSummary {
                id: user.id,
                email: user.email,
            },
            token,
        })
    }

    /// Login with email and password
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(deps: AuthDeps<'_>, req: LoginRequest) -> Result<AuthSession, ApiError> {
        let result = Self::login_inner(deps, req).await;
        count(
            "auth_login_total",
            match &result {
                Ok(_) => "success",
                Err(ApiError::InvalidCredentials) => "invalid_credentials",
                Err(ApiError::Validation(_)) => "invalid",
                Err(_) => "error",
            },
        );
        result
    }

    async fn login_inner(deps: AuthDeps<'_>, req: LoginRequest) -> Result<AuthSession, ApiError> {
        let creds = require_credentials(req.email.as_deref(), req.password.as_deref())?;

        let Some(user) = deps.users.find_by_email(&creds.email).await? else {
            deps.passwords.verify_dummy_async(creds.password).await?;
            debug!("Login attempt for unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        // Verify password on blocking thread pool (CPU-intensive)
        let valid = deps
            .passwords
            .verify_async(creds.password, user.password_hash.clone())
            .await?;

        if !valid {
            debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        let token = deps.jwt.issue(user.id)?;
        info!(user_id = %user.id, "User logged in");

        Ok(AuthSession {
            user: UserSummary {
                id: user.id,
                email: user.email,
            },
            token,
        })
    }
}
