//! Note routes
//!
//! Reading and searching are open to everyone. Creating requires a session;
//! the author is always the caller.

use super::json::ApiJson;
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::ApiResult;
use crate::repositories::NoteRecord;
use crate::services::NoteService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use notes_hub_shared::types::{CreateNoteRequest, NoteResponse, NoteSearchQuery};

/// Create note routes
pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_note).get(list_notes))
        .route("/:id", get(get_note))
}

fn to_response(note: NoteRecord) -> NoteResponse {
    NoteResponse {
        id: note.id,
        title: note.title,
        body: note.body,
        author: note.author_id,
        author_email: note.author_email,
        created_at: note.created_at,
        updated_at: note.updated_at,
    }
}

/// POST /api/notes - Create a note
///
/// The auth extractor runs before the body is parsed, so an anonymous
/// request is a 401 whatever it sends.
async fn create_note(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(req): ApiJson<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<NoteResponse>)> {
    let note = NoteService::create(state.notes.as_ref(), Some(&identity), req).await?;
    Ok((StatusCode::CREATED, Json(to_response(note))))
}

/// GET /api/notes?search= - List or search notes, newest first
async fn list_notes(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Query(query): Query<NoteSearchQuery>,
) -> ApiResult<Json<Vec<NoteResponse>>> {
    let notes = NoteService::search(
        state.notes.as_ref(),
        caller.as_ref(),
        query.terms(),
        state.config().notes.search_limit,
    )
    .await?;

    Ok(Json(notes.into_iter().map(to_response).collect()))
}

/// GET /api/notes/:id - Fetch a single note
async fn get_note(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<NoteResponse>> {
    let note = NoteService::get(state.notes.as_ref(), caller.as_ref(), &id).await?;
    Ok(Json(to_response(note)))
}
