//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! Nothing in here is mutated while serving requests: the signing key,
//! hashing parameters and configuration are fixed at startup, and the
//! stores are shared handles that do their own synchronization.

use crate::auth::{JwtService, PasswordService, SessionResolver};
use crate::config::AppConfig;
use crate::repositories::{CredentialStore, MemoryCredentialStore, MemoryNoteStore, NoteStore};
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
///
/// All fields are designed for cheap cloning across async tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized JWT service with cached keys
    pub jwt: JwtService,
    pub passwords: PasswordService,
    pub users: Arc<dyn CredentialStore>,
    pub notes: Arc<dyn NoteStore>,
    sessions: SessionResolver,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state
    ///
    /// Derives the JWT keys from the configured secret; call once at startup.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn CredentialStore>,
        notes: Arc<dyn NoteStore>,
    ) -> Result<Self> {
        config.validate()?;
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.token_ttl_secs);
        Self::with_jwt(config, jwt, users, notes)
    }

    /// Create a state around an already-built token service
    pub fn with_jwt(
        config: AppConfig,
        jwt: JwtService,
        users: Arc<dyn CredentialStore>,
        notes: Arc<dyn NoteStore>,
    ) -> Result<Self> {
        let passwords = PasswordService::new(&config.password)?;
        let sessions = SessionResolver::new(jwt.clone(), users.clone(), &config.session.cookie_name);

        Ok(Self {
            config: Arc::new(config),
            jwt,
            passwords,
            users,
            notes,
            sessions,
            metrics: None,
        })
    }

    /// State backed by in-process stores
    pub fn in_memory(config: AppConfig) -> Result<Self> {
        let users: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let notes: Arc<dyn NoteStore> = Arc::new(MemoryNoteStore::new(users.clone()));
        Self::new(config, users, notes)
    }

    /// Attach the Prometheus handle served at `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a reference to the JWT service
    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    #[inline]
    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    /// Session guard shared by all routes
    #[inline]
    pub fn sessions(&self) -> &SessionResolver {
        &self.sessions
    }

    #[inline]
    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}
