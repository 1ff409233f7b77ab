//! Data repositories
//!
//! Storage traits with PostgreSQL and in-memory implementations.

pub mod note;
pub mod user;

use thiserror::Error;

pub use note::{MemoryNoteStore, NewNote, NoteRecord, NoteStore, PgNoteStore};
pub use user::{CredentialStore, MemoryCredentialStore, PgCredentialStore, UserRecord};

/// Storage failure
#[derive(Error, Debug)]
pub enum StoreError {
    /// Email already taken; nothing was written
    #[error("account already exists")]
    DuplicateAccount,

    #[error("storage backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateAccount,
            _ => StoreError::Backend(err.into()),
        }
    }
}
