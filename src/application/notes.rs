//! Per-user lesson notes.

use std::sync::Arc;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::repos::{LessonsRepo, NotesRepo, NoteWithLessonRow, RepoError};
use crate::domain::entities::NoteRecord;

const SOURCE: &str = "application::notes::NoteService";

pub struct NoteService {
    notes: Arc<dyn NotesRepo>,
    lessons: Arc<dyn LessonsRepo>,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NotesRepo>, lessons: Arc<dyn LessonsRepo>) -> Self {
        Self { notes, lessons }
    }

    /// The user's notes for one lesson, newest first.
    pub async fn notes_for_lesson(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Vec<NoteRecord>, HttpError> {
        self.notes
            .list_notes_for_lesson(user_id, lesson_id)
            .await
            .map_err(|err| repo_failure("list_notes_for_lesson", err))
    }

    /// The most recent note for one lesson, shown on the lesson page.
    pub async fn latest_note_for_lesson(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<NoteRecord>, HttpError> {
        let mut notes = self.notes_for_lesson(user_id, lesson_id).await?;
        Ok(if notes.is_empty() {
            None
        } else {
            Some(notes.remove(0))
        })
    }

    /// The user's notes across all lessons, for the dashboard.
    pub async fn notes_overview(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<NoteWithLessonRow>, HttpError> {
        self.notes
            .list_notes_with_lessons(user_id)
            .await
            .map_err(|err| repo_failure("list_notes_with_lessons", err))
    }

    /// Create a note. `Ok(None)` when the lesson does not exist.
    pub async fn create_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        content: Option<String>,
    ) -> Result<Option<NoteRecord>, HttpError> {
        let exists = self
            .lessons
            .lesson_exists(lesson_id)
            .await
            .map_err(|err| repo_failure("lesson_exists", err))?;
        if !exists {
            return Ok(None);
        }

        self.notes
            .create_note(user_id, lesson_id, content)
            .await
            .map(Some)
            .map_err(|err| repo_failure("create_note", err))
    }

    /// Update a note owned by the user. `Ok(None)` when no such note exists.
    pub async fn update_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        note_id: Uuid,
        content: Option<String>,
    ) -> Result<Option<NoteRecord>, HttpError> {
        self.notes
            .update_note(user_id, lesson_id, note_id, content)
            .await
            .map_err(|err| repo_failure("update_note", err))
    }

    /// Delete a note owned by the user. `Ok(false)` when no such note exists.
    pub async fn delete_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        note_id: Uuid,
    ) -> Result<bool, HttpError> {
        self.notes
            .delete_note(user_id, lesson_id, note_id)
            .await
            .map_err(|err| repo_failure("delete_note", err))
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load notes",
        format!("{operation} failed: {err}"),
    )
}
