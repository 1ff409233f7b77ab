//! Database connection and pool management
//!
//! Connection pooling, embedded migrations and a liveness probe for the
//! PostgreSQL storage backend, plus construction of the configured stores.

use crate::config::{DatabaseConfig, StorageBackend};
use crate::repositories::{
    CredentialStore, MemoryCredentialStore, MemoryNoteStore, NoteStore, PgCredentialStore,
    PgNoteStore,
};
use anyhow::Result;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pool timeouts and sizing not exposed through `DatabaseConfig`
pub struct PoolTuning {
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl Default for PoolTuning {
    fn default() -> Self {
        Self {
            min_connections: 2,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

/// Storage handles used by the application state
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub notes: Arc<dyn NoteStore>,
}

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &DatabaseConfig, tuning: &PoolTuning) -> Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(&config.url)?.application_name("notes-hub");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(tuning.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(tuning.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(tuning.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(tuning.max_lifetime_secs))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await?;

    info!(
        "Database pool created: max={}, min={}",
        config.max_connections, tuning.min_connections
    );

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed successfully");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            warn!("Database health check failed: {}", e);
            e.into()
        })
}

/// Build the stores selected by `database.backend`
///
/// Migrations run only when `migrate` is set.
pub async fn connect_stores(config: &DatabaseConfig, migrate: bool) -> Result<Stores> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            let users: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
            let notes: Arc<dyn NoteStore> = Arc::new(MemoryNoteStore::new(users.clone()));
            Ok(Stores { users, notes })
        }
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(config, &PoolTuning::default()).await?;
            if migrate {
                run_migrations(&pool).await?;
            }
            Ok(Stores {
                users: Arc::new(PgCredentialStore::new(pool.clone())),
                notes: Arc::new(PgNoteStore::new(pool)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_tuning() {
        let tuning = PoolTuning::default();
        assert_eq!(tuning.min_connections, 2);
        assert_eq!(tuning.acquire_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_memory_backend_needs_no_database() {
        let config = DatabaseConfig {
            backend: StorageBackend::Memory,
            url: String::new(),
            max_connections: 1,
        };
        let stores = connect_stores(&config, true).await.unwrap();
        assert!(stores.users.health_check().await.is_ok());
        assert!(stores.notes.search(None, 10).await.unwrap().is_empty());
    }
}
