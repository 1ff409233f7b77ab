//! Note repository
//!
//! Notes are public. Listing returns newest first; a search returns notes
//! whose title or body contains any of the query words.

use super::{CredentialStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Note record, optionally joined with the author's email
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoteRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub author_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a note
///
/// `author_id` always comes from the resolved caller, never from the body.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
}

/// Persistence for notes
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create(&self, note: NewNote) -> Result<NoteRecord, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError>;

    /// Newest first, at most `limit`, filtered by `query` when given
    async fn search(&self, query: Option<&str>, limit: i64) -> Result<Vec<NoteRecord>, StoreError>;
}

/// PostgreSQL-backed note store
#[derive(Clone)]
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn create(&self, note: NewNote) -> Result<NoteRecord, StoreError> {
        let record = sqlx::query_as::<_, NoteRecord>(
            r#"
            INSERT INTO notes (id, title, body, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, body, author_id, NULL::text AS author_email,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&note.title)
        .bind(&note.body)
        .bind(note.author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError> {
        let record = sqlx::query_as::<_, NoteRecord>(
            r#"
            SELECT n.id, n.title, n.body, n.author_id, u.email AS author_email,
                   n.created_at, n.updated_at
            FROM notes n
            LEFT JOIN users u ON u.id = n.author_id
            WHERE n.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn search(&self, query: Option<&str>, limit: i64) -> Result<Vec<NoteRecord>, StoreError> {
        // plainto_tsquery ANDs the words; swap to OR so any word matches
        let records = sqlx::query_as::<_, NoteRecord>(
            r#"
            SELECT n.id, n.title, n.body, n.author_id, u.email AS author_email,
                   n.created_at, n.updated_at
            FROM notes n
            LEFT JOIN users u ON u.id = n.author_id
            WHERE $1::text IS NULL
               OR to_tsvector('english', n.title || ' ' || n.body)
                  @@ replace(plainto_tsquery('english', $1)::text, ' & ', ' | ')::tsquery
            ORDER BY n.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// Lowercased alphanumeric words of `text`
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn matches_any(note: &NoteRecord, terms: &HashSet<String>) -> bool {
    words(&note.title).chain(words(&note.body)).any(|w| terms.contains(&w))
}

/// In-process note store
///
/// Search matches whole words case-insensitively, without stemming.
pub struct MemoryNoteStore {
    notes: RwLock<Vec<NoteRecord>>,
    users: Arc<dyn CredentialStore>,
}

impl MemoryNoteStore {
    /// `users` is consulted to fill in author emails on reads
    pub fn new(users: Arc<dyn CredentialStore>) -> Self {
        Self {
            notes: RwLock::new(Vec::new()),
            users,
        }
    }

    async fn with_author_email(&self, mut note: NoteRecord) -> Result<NoteRecord, StoreError> {
        note.author_email = self.users.find_by_id(note.author_id).await?.map(|u| u.email);
        Ok(note)
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create(&self, note: NewNote) -> Result<NoteRecord, StoreError> {
        let now = Utc::now();
        let record = NoteRecord {
            id: Uuid::new_v4(),
            title: note.title,
            body: note.body,
            author_id: note.author_id,
            author_email: None,
            created_at: now,
            updated_at: now,
        };
        self.notes.write().await.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError> {
        let found = self.notes.read().await.iter().find(|n| n.id == id).cloned();
        match found {
            Some(note) => Ok(Some(self.with_author_email(note).await?)),
            None => Ok(None),
        }
    }

    async fn search(&self, query: Option<&str>, limit: i64) -> Result<Vec<NoteRecord>, StoreError> {
        let terms: Option<HashSet<String>> = query.map(|q| words(q).collect());
        let limit = usize::try_from(limit).unwrap_or(0);

        let mut selected: Vec<NoteRecord> = {
            let notes = self.notes.read().await;
            notes
                .iter()
                .rev()
                .filter(|n| terms.as_ref().map_or(true, |t| matches_any(n, t)))
                .cloned()
                .collect()
        };
        // Stable sort keeps reverse insertion order for equal timestamps
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected.truncate(limit);

        let mut results = Vec::with_capacity(selected.len());
        for note in selected {
            results.push(self.with_author_email(note).await?);
        }
        Ok(results)
    }
}
