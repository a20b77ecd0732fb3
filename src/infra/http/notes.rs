//! JSON API for per-lesson notes.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::domain::entities::NoteRecord;

use super::{AppState, middleware::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct NoteIn {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteOut {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub content: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NoteRecord> for NoteOut {
    fn from(note: NoteRecord) -> Self {
        Self {
            id: note.id,
            lesson_id: note.lesson_id,
            content: note.content,
            created_at: note.created_at.format(&Rfc3339).unwrap_or_default(),
            updated_at: note.updated_at.format(&Rfc3339).unwrap_or_default(),
        }
    }
}

pub(super) async fn list_notes(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(lesson_id): Path<Uuid>,
) -> Response {
    match state.notes.notes_for_lesson(user.id, lesson_id).await {
        Ok(notes) => Json(
            notes
                .into_iter()
                .map(NoteOut::from)
                .collect::<Vec<NoteOut>>(),
        )
        .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn create_note(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<NoteIn>,
) -> Response {
    match state
        .notes
        .create_note(user.id, lesson_id, payload.content)
        .await
    {
        Ok(Some(note)) => (
            StatusCode::CREATED,
            Json(json!({ "detail": "Note created", "id": note.id })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Lesson not found" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn update_note(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((lesson_id, note_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<NoteIn>,
) -> Response {
    match state
        .notes
        .update_note(user.id, lesson_id, note_id, payload.content)
        .await
    {
        Ok(Some(note)) => Json(json!({ "detail": "Note updated", "id": note.id })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Note not found" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn delete_note(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((lesson_id, note_id)): Path<(Uuid, Uuid)>,
) -> Response {
    match state.notes.delete_note(user.id, lesson_id, note_id).await {
        Ok(true) => Json(json!({ "detail": "Note deleted", "id": note_id })).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Note not found" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
