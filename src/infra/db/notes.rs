use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NoteWithLessonRow, NotesRepo, RepoError};
use crate::domain::entities::NoteRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: Uuid,
    user_id: Uuid,
    lesson_id: Uuid,
    content: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<NoteRow> for NoteRecord {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            lesson_id: row.lesson_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NoteLessonRow {
    lesson_id: Uuid,
    lesson_title: String,
    content: Option<String>,
    created_at: OffsetDateTime,
}

const NOTE_COLUMNS: &str = "id, user_id, lesson_id, content, created_at, updated_at";

#[async_trait]
impl NotesRepo for PostgresRepositories {
    async fn list_notes_for_lesson(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Vec<NoteRecord>, RepoError> {
        let rows = sqlx::query_as::<_, NoteRow>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE user_id = $1 AND lesson_id = $2 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(lesson_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(NoteRecord::from).collect())
    }

    async fn list_notes_with_lessons(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<NoteWithLessonRow>, RepoError> {
        let rows = sqlx::query_as::<_, NoteLessonRow>(
            "SELECT n.lesson_id, l.title AS lesson_title, n.content, n.created_at \
             FROM notes n \
             INNER JOIN lessons l ON l.id = n.lesson_id \
             WHERE n.user_id = $1 \
             ORDER BY n.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| NoteWithLessonRow {
                lesson_id: row.lesson_id,
                lesson_title: row.lesson_title,
                content: row.content,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn create_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        content: Option<String>,
    ) -> Result<NoteRecord, RepoError> {
        let row = sqlx::query_as::<_, NoteRow>(&format!(
            "INSERT INTO notes (user_id, lesson_id, content) VALUES ($1, $2, $3) \
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(lesson_id)
        .bind(&content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(NoteRecord::from(row))
    }

    async fn update_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        note_id: Uuid,
        content: Option<String>,
    ) -> Result<Option<NoteRecord>, RepoError> {
        let row = sqlx::query_as::<_, NoteRow>(&format!(
            "UPDATE notes SET content = $4, updated_at = now() \
             WHERE id = $3 AND user_id = $1 AND lesson_id = $2 \
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(lesson_id)
        .bind(note_id)
        .bind(&content)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(NoteRecord::from))
    }

    async fn delete_note(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        note_id: Uuid,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "DELETE FROM notes WHERE id = $3 AND user_id = $1 AND lesson_id = $2",
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(note_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
