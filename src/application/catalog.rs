//! Course browsing for authenticated students.

use std::sync::Arc;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::repos::{CoursesRepo, LessonsRepo, RepoError};
use crate::domain::entities::{CourseRecord, LessonRecord};

const SOURCE: &str = "application::catalog::CourseCatalogService";

pub struct CourseCatalogService {
    courses: Arc<dyn CoursesRepo>,
    lessons: Arc<dyn LessonsRepo>,
}

impl CourseCatalogService {
    pub fn new(courses: Arc<dyn CoursesRepo>, lessons: Arc<dyn LessonsRepo>) -> Self {
        Self { courses, lessons }
    }

    pub async fn list_courses(&self) -> Result<Vec<CourseRecord>, HttpError> {
        self.courses
            .list_courses()
            .await
            .map_err(|err| repo_failure("list_courses", err))
    }

    /// A course with its lessons. `Ok(None)` when no such course exists.
    pub async fn course_detail(
        &self,
        course_id: Uuid,
    ) -> Result<Option<(CourseRecord, Vec<LessonRecord>)>, HttpError> {
        let Some(course) = self
            .courses
            .find_course(course_id)
            .await
            .map_err(|err| repo_failure("find_course", err))?
        else {
            return Ok(None);
        };

        let lessons = self
            .lessons
            .list_lessons_for_course(course_id)
            .await
            .map_err(|err| repo_failure("list_lessons_for_course", err))?;

        Ok(Some((course, lessons)))
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load course data",
        format!("{operation} failed: {err}"),
    )
}
