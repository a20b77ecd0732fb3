use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateLessonParams, LessonsRepo, RepoError, UpdateLessonParams,
};
use crate::domain::entities::{CourseRecord, LessonRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct LessonRow {
    id: Uuid,
    course_id: Uuid,
    title: String,
    video_path: Option<String>,
    text_content: Option<String>,
}

impl From<LessonRow> for LessonRecord {
    fn from(row: LessonRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            title: row.title,
            video_path: row.video_path,
            text_content: row.text_content,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LessonWithCourseRow {
    id: Uuid,
    course_id: Uuid,
    title: String,
    video_path: Option<String>,
    text_content: Option<String>,
    course_title: String,
    course_description: Option<String>,
    course_created_at: OffsetDateTime,
}

impl From<LessonWithCourseRow> for (LessonRecord, CourseRecord) {
    fn from(row: LessonWithCourseRow) -> Self {
        (
            LessonRecord {
                id: row.id,
                course_id: row.course_id,
                title: row.title,
                video_path: row.video_path,
                text_content: row.text_content,
            },
            CourseRecord {
                id: row.course_id,
                title: row.course_title,
                description: row.course_description,
                created_at: row.course_created_at,
            },
        )
    }
}

const LESSON_COLUMNS: &str = "id, course_id, title, video_path, text_content";

#[async_trait]
impl LessonsRepo for PostgresRepositories {
    async fn find_lesson_with_course(
        &self,
        id: Uuid,
    ) -> Result<Option<(LessonRecord, CourseRecord)>, RepoError> {
        let row = sqlx::query_as::<_, LessonWithCourseRow>(
            "SELECT l.id, l.course_id, l.title, l.video_path, l.text_content, \
                    c.title AS course_title, c.description AS course_description, \
                    c.created_at AS course_created_at \
             FROM lessons l \
             INNER JOIN courses c ON c.id = l.course_id \
             WHERE l.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_lesson(&self, id: Uuid) -> Result<Option<LessonRecord>, RepoError> {
        let row = sqlx::query_as::<_, LessonRow>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LessonRecord::from))
    }

    async fn lesson_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM lessons WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_lessons_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<LessonRecord>, RepoError> {
        let rows = sqlx::query_as::<_, LessonRow>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE course_id = $1 ORDER BY title"
        ))
        .bind(course_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LessonRecord::from).collect())
    }

    async fn count_lessons(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn create_lesson(&self, params: CreateLessonParams) -> Result<LessonRecord, RepoError> {
        let row = sqlx::query_as::<_, LessonRow>(&format!(
            "INSERT INTO lessons (course_id, title, text_content, video_path) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {LESSON_COLUMNS}"
        ))
        .bind(params.course_id)
        .bind(&params.title)
        .bind(&params.text_content)
        .bind(&params.video_path)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(LessonRecord::from(row))
    }

    async fn update_lesson(
        &self,
        params: UpdateLessonParams,
    ) -> Result<Option<LessonRecord>, RepoError> {
        let row = sqlx::query_as::<_, LessonRow>(&format!(
            "UPDATE lessons SET title = $2, text_content = $3, video_path = $4 \
             WHERE id = $1 \
             RETURNING {LESSON_COLUMNS}"
        ))
        .bind(params.id)
        .bind(&params.title)
        .bind(&params.text_content)
        .bind(&params.video_path)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LessonRecord::from))
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
