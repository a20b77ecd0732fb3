//! Admin course management.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::repos::{
    CoursesRepo, CreateCourseParams, LessonsRepo, RepoError, UpdateCourseParams,
};
use crate::cache::{CacheHandle, keys};
use crate::domain::entities::CourseRecord;
use crate::infra::uploads::VideoStorage;

const SOURCE: &str = "application::admin::courses::AdminCourseService";

pub struct AdminCourseService {
    courses: Arc<dyn CoursesRepo>,
    lessons: Arc<dyn LessonsRepo>,
    storage: Arc<VideoStorage>,
    cache: CacheHandle,
}

impl AdminCourseService {
    pub fn new(
        courses: Arc<dyn CoursesRepo>,
        lessons: Arc<dyn LessonsRepo>,
        storage: Arc<VideoStorage>,
        cache: CacheHandle,
    ) -> Self {
        Self {
            courses,
            lessons,
            storage,
            cache,
        }
    }

    pub async fn list_courses(&self) -> Result<Vec<CourseRecord>, HttpError> {
        self.courses
            .list_courses()
            .await
            .map_err(|err| repo_failure("list_courses", err))
    }

    pub async fn find_course(&self, id: Uuid) -> Result<Option<CourseRecord>, HttpError> {
        self.courses
            .find_course(id)
            .await
            .map_err(|err| repo_failure("find_course", err))
    }

    pub async fn create_course(
        &self,
        title: &str,
        description: Option<String>,
    ) -> Result<CourseRecord, HttpError> {
        let title = validate_title(title)?;
        let course = self
            .courses
            .create_course(CreateCourseParams { title, description })
            .await
            .map_err(|err| repo_failure("create_course", err))?;

        info!(target: "aula::admin", course_id = %course.id, "course created");
        Ok(course)
    }

    /// `Ok(None)` when the course does not exist.
    pub async fn update_course(
        &self,
        id: Uuid,
        title: &str,
        description: Option<String>,
    ) -> Result<Option<CourseRecord>, HttpError> {
        let title = validate_title(title)?;
        self.courses
            .update_course(UpdateCourseParams {
                id,
                title,
                description,
            })
            .await
            .map_err(|err| repo_failure("update_course", err))
    }

    /// Delete a course and its lessons.
    ///
    /// The row delete cascades to lessons, completions, and notes; the
    /// derived state each lesson left behind (cached bundles, cached
    /// completion flags, stored videos) is cleared here first so it cannot
    /// outlive the rows. `Ok(false)` when the course does not exist.
    pub async fn delete_course(&self, id: Uuid) -> Result<bool, HttpError> {
        let lessons = self
            .lessons
            .list_lessons_for_course(id)
            .await
            .map_err(|err| repo_failure("list_lessons_for_course", err))?;

        for lesson in &lessons {
            self.cache.evict(&keys::lesson_content(lesson.id)).await;
            self.cache
                .evict_pattern(&keys::completion_flag_pattern(lesson.id))
                .await;
            if let Some(path) = lesson.video_path.as_deref() {
                if let Err(err) = self.storage.delete(path).await {
                    warn!(
                        target: "aula::admin",
                        lesson_id = %lesson.id,
                        stored_path = path,
                        error = %err,
                        "failed to remove stored video during course delete"
                    );
                }
            }
        }

        let deleted = self
            .courses
            .delete_course(id)
            .await
            .map_err(|err| repo_failure("delete_course", err))?;

        if deleted {
            info!(target: "aula::admin", course_id = %id, lessons = lessons.len(), "course deleted");
        }
        Ok(deleted)
    }
}

fn validate_title(title: &str) -> Result<String, HttpError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Title must not be empty",
            "course title was blank",
        ));
    }
    Ok(title.to_string())
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to manage course",
        format!("{operation} failed: {err}"),
    )
}
