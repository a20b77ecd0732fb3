use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CompletedLessonRow, CompletionsRepo, RepoError};
use crate::domain::entities::LessonCompletionRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CompletionRow {
    id: Uuid,
    lesson_id: Uuid,
    user_id: Uuid,
    completed_at: OffsetDateTime,
}

impl From<CompletionRow> for LessonCompletionRecord {
    fn from(row: CompletionRow) -> Self {
        Self {
            id: row.id,
            lesson_id: row.lesson_id,
            user_id: row.user_id,
            completed_at: row.completed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecentCompletionRow {
    lesson_title: String,
    completed_at: OffsetDateTime,
}

#[async_trait]
impl CompletionsRepo for PostgresRepositories {
    async fn completion_exists(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM lesson_completions WHERE user_id = $1 AND lesson_id = $2)",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_completion_if_absent(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonCompletionRecord>, RepoError> {
        // The unique (user_id, lesson_id) constraint makes this atomic:
        // concurrent inserts for the same pair agree on a single winner, and
        // RETURNING yields a row only for the insert that won.
        let row = sqlx::query_as::<_, CompletionRow>(
            "INSERT INTO lesson_completions (user_id, lesson_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, lesson_id) DO NOTHING \
             RETURNING id, lesson_id, user_id, completed_at",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LessonCompletionRecord::from))
    }

    async fn delete_completions_for_lesson(&self, lesson_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM lesson_completions WHERE lesson_id = $1")
            .bind(lesson_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn count_completions_for_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM lesson_completions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn recent_completions_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<CompletedLessonRow>, RepoError> {
        let rows = sqlx::query_as::<_, RecentCompletionRow>(
            "SELECT l.title AS lesson_title, lc.completed_at \
             FROM lesson_completions lc \
             INNER JOIN lessons l ON l.id = lc.lesson_id \
             WHERE lc.user_id = $1 \
             ORDER BY lc.completed_at DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| CompletedLessonRow {
                lesson_title: row.lesson_title,
                completed_at: row.completed_at,
            })
            .collect())
    }
}
