//! Note service
//!
//! Applies the note authorization policy before touching the store.

use crate::auth::policy::{author_for_create, authorize, NoteAction};
use crate::auth::ResolvedIdentity;
use crate::error::ApiError;
use crate::repositories::{NewNote, NoteRecord, NoteStore};
use notes_hub_shared::types::CreateNoteRequest;
use notes_hub_shared::validation::require_note_fields;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Upper bounds on stored note content
#[derive(Debug, Validate)]
struct NoteInput {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    title: String,
    #[validate(length(max = 20000, message = "Body must be at most 20000 characters"))]
    body: String,
}

/// Note service for business logic
pub struct NoteService;

impl NoteService {
    /// Create a note authored by `caller`
    ///
    /// Fails with 401 when there is no caller, before the body is looked at.
    pub async fn create(
        notes: &dyn NoteStore,
        caller: Option<&ResolvedIdentity>,
        req: CreateNoteRequest,
    ) -> Result<NoteRecord, ApiError> {
        let author_id = author_for_create(caller)?;
        let author_email = caller.map(|identity| identity.email.clone());

        let fields = require_note_fields(req.title.as_deref(), req.body.as_deref())?;
        let input = NoteInput {
            title: fields.title,
            body: fields.body,
        };
        input.validate()?;

        let mut note = notes
            .create(NewNote {
                title: input.title,
                body: input.body,
                author_id,
            })
            .await?;
        note.author_email = author_email;

        metrics::counter!("notes_created_total").increment(1);
        info!(note_id = %note.id, author_id = %author_id, "Note created");
        Ok(note)
    }

    /// Fetch one note; unknown and malformed ids are both "not found"
    pub async fn get(
        notes: &dyn NoteStore,
        caller: Option<&ResolvedIdentity>,
        id: &str,
    ) -> Result<NoteRecord, ApiError> {
        authorize(NoteAction::Read, caller)?;

        let not_found = || ApiError::NotFound("Note not found".to_string());
        let id = Uuid::parse_str(id).map_err(|_| not_found())?;

        notes.find_by_id(id).await?.ok_or_else(not_found)
    }

    /// List notes newest first, optionally filtered by search terms
    pub async fn search(
        notes: &dyn NoteStore,
        caller: Option<&ResolvedIdentity>,
        query: Option<&str>,
        limit: i64,
    ) -> Result<Vec<NoteRecord>, ApiError> {
        authorize(NoteAction::Search, caller)?;
        Ok(notes.search(query, limit).await?)
    }
}
