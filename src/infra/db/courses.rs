use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CoursesRepo, CreateCourseParams, RepoError, UpdateCourseParams,
};
use crate::domain::entities::CourseRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    created_at: OffsetDateTime,
}

impl From<CourseRow> for CourseRecord {
    fn from(row: CourseRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CoursesRepo for PostgresRepositories {
    async fn list_courses(&self) -> Result<Vec<CourseRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT id, title, description, created_at FROM courses ORDER BY created_at",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CourseRecord::from).collect())
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<CourseRecord>, RepoError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, title, description, created_at FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CourseRecord::from))
    }

    async fn create_course(&self, params: CreateCourseParams) -> Result<CourseRecord, RepoError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "INSERT INTO courses (title, description) VALUES ($1, $2) \
             RETURNING id, title, description, created_at",
        )
        .bind(&params.title)
        .bind(&params.description)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CourseRecord::from(row))
    }

    async fn update_course(
        &self,
        params: UpdateCourseParams,
    ) -> Result<Option<CourseRecord>, RepoError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "UPDATE courses SET title = $2, description = $3 WHERE id = $1 \
             RETURNING id, title, description, created_at",
        )
        .bind(params.id)
        .bind(&params.title)
        .bind(&params.description)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CourseRecord::from))
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
