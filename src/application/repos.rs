//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    CourseRecord, LessonCompletionRecord, LessonRecord, NoteRecord, UserRecord,
};
use crate::domain::types::UserRole;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct CreateCourseParams {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCourseParams {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateLessonParams {
    pub course_id: Uuid,
    pub title: String,
    pub text_content: Option<String>,
    pub video_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateLessonParams {
    pub id: Uuid,
    pub title: String,
    pub text_content: Option<String>,
    pub video_path: Option<String>,
}

/// A completion joined with the title of the completed lesson.
#[derive(Debug, Clone)]
pub struct CompletedLessonRow {
    pub lesson_title: String,
    pub completed_at: OffsetDateTime,
}

/// A note joined with the lesson it annotates.
#[derive(Debug, Clone)]
pub struct NoteWithLessonRow {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub content: Option<String>,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn email_exists(&self, email: &str) -> Result<bool, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait CoursesRepo: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<CourseRecord>, RepoError>;

    async fn find_course(&self, id: Uuid) -> Result<Option<CourseRecord>, RepoError>;

    async fn create_course(&self, params: CreateCourseParams) -> Result<CourseRecord, RepoError>;

    /// Returns the updated record, or `None` when no such course exists.
    async fn update_course(
        &self,
        params: UpdateCourseParams,
    ) -> Result<Option<CourseRecord>, RepoError>;

    /// Returns `true` when a row was deleted.
    async fn delete_course(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait LessonsRepo: Send + Sync {
    /// The lesson joined with its parent course.
    async fn find_lesson_with_course(
        &self,
        id: Uuid,
    ) -> Result<Option<(LessonRecord, CourseRecord)>, RepoError>;

    async fn find_lesson(&self, id: Uuid) -> Result<Option<LessonRecord>, RepoError>;

    async fn lesson_exists(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn list_lessons_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<LessonRecord>, RepoError>;

    async fn count_lessons(&self) -> Result<u64, RepoError>;

    async fn create_lesson(&self, params: CreateLessonParams) -> Result<LessonRecord, RepoError>;

    /// Returns the updated record, or `None` when no such lesson exists.
    async fn update_lesson(
        &self,
        params: UpdateLessonParams,
    ) -> Result<Option<LessonRecord>, RepoError>;

    /// Returns `true` when a row was deleted.
    async fn delete_lesson(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CompletionsRepo: Send + Sync {
    async fn completion_exists(&self, user_id: Uuid, lesson_id: Uuid)
    -> Result<bool, RepoError>;

    /// Insert a completion unless one already exists for the pair.
    ///
    /// Atomic at the store level (unique constraint + conflict-ignoring
    /// insert); returns the new record only when this call created it.
    async fn insert_completion_if_absent(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonCompletionRecord>, RepoError>;

    /// Remove every completion for a lesson, returning how many went.
    async fn delete_completions_for_lesson(&self, lesson_id: Uuid) -> Result<u64, RepoError>;

    async fn count_completions_for_user(&self, user_id: Uuid) -> Result<u64, RepoError>;

    /// Most recent completions for a user, newest first.
    async fn recent_completions_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<CompletedLessonRow>, RepoError>;
}

#[async_trait]
pub trait NotesRepo: Send + Sync {
    /// The user's notes for a lesson, newest first.
    async fn list_notes_for_lesson(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Vec<NoteRecord>, RepoError>;

    /// The user's notes across all lessons joined with lesson titles,
    /// newest first.
    async fn list_notes_with_lessons(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<NoteWithLessonRow>, RepoError>;

    async fn create_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        content: Option<String>,
    ) -> Result<NoteRecord, RepoError>;

    /// Update a note owned by the user. `None` when no such note exists.
    async fn update_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        note_id: Uuid,
        content: Option<String>,
    ) -> Result<Option<NoteRecord>, RepoError>;

    /// Delete a note owned by the user. `true` when a row was deleted.
    async fn delete_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        note_id: Uuid,
    ) -> Result<bool, RepoError>;
}
