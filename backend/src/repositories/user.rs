//! Credential store: user identities and their password hashes

use super::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// User record from the credential store
///
/// The hash stays inside the store/service boundary; handlers only see
/// `ResolvedIdentity` or `UserSummary`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence for user identities
///
/// `insert` must enforce email uniqueness atomically and report a clash as
/// `StoreError::DuplicateAccount` without creating anything.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn insert(&self, email: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    /// Check that the backing storage is reachable
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        // The UNIQUE(email) constraint is the race-free guard
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::db::health_check(&self.pool)
            .await
            .map_err(StoreError::Backend)
    }
}

#[derive(Default)]
struct MemoryUsers {
    by_id: HashMap<Uuid, UserRecord>,
    by_email: HashMap<String, Uuid>,
}

/// In-process credential store
///
/// Used by tests and by `database.backend = "memory"`. Check-and-insert
/// happens under a single write lock.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<MemoryUsers>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove an account, simulating deletion by an external process
    pub async fn remove(&self, id: Uuid) -> Option<UserRecord> {
        let mut users = self.inner.write().await;
        let user = users.by_id.remove(&id)?;
        users.by_email.remove(&user.email);
        Some(user)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.inner.read().await;
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut users = self.inner.write().await;
        if users.by_email.contains_key(email) {
            return Err(StoreError::DuplicateAccount);
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.by_email.insert(user.email.clone(), user.id);
        users.by_id.insert(user.id, user.clone());

        Ok(user)
    }
}
