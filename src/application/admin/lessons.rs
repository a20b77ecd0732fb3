//! Admin lesson management.
//!
//! Every mutation here is paired with cache invalidation: an edit evicts the
//! lesson's content bundle so the next read recomputes it, and a delete also
//! clears every cached completion flag for the lesson. Cache work is
//! best-effort; a failed eviction means stale data until TTL expiry, which
//! is an accepted staleness window.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::repos::{
    CompletionsRepo, CoursesRepo, CreateLessonParams, LessonsRepo, RepoError, UpdateLessonParams,
};
use crate::cache::{CacheHandle, keys};
use crate::domain::entities::{CourseRecord, LessonRecord};
use crate::infra::uploads::VideoStorage;

const SOURCE: &str = "application::admin::lessons::AdminLessonService";

pub struct AdminLessonService {
    courses: Arc<dyn CoursesRepo>,
    lessons: Arc<dyn LessonsRepo>,
    completions: Arc<dyn CompletionsRepo>,
    storage: Arc<VideoStorage>,
    cache: CacheHandle,
}

impl AdminLessonService {
    pub fn new(
        courses: Arc<dyn CoursesRepo>,
        lessons: Arc<dyn LessonsRepo>,
        completions: Arc<dyn CompletionsRepo>,
        storage: Arc<VideoStorage>,
        cache: CacheHandle,
    ) -> Self {
        Self {
            courses,
            lessons,
            completions,
            storage,
            cache,
        }
    }

    /// A course and its lessons for the admin list page. `Ok(None)` when the
    /// course does not exist.
    pub async fn course_lessons(
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

    /// A lesson with its parent course for the edit form.
    pub async fn lesson_for_edit(
        &self,
        lesson_id: Uuid,
    ) -> Result<Option<(LessonRecord, CourseRecord)>, HttpError> {
        self.lessons
            .find_lesson_with_course(lesson_id)
            .await
            .map_err(|err| repo_failure("find_lesson_with_course", err))
    }

    /// Create a lesson. `Ok(None)` when the course does not exist. The video
    /// payload, if any, has already been written to storage by the caller.
    pub async fn create_lesson(
        &self,
        course_id: Uuid,
        title: String,
        text_content: Option<String>,
        video_path: Option<String>,
    ) -> Result<Option<LessonRecord>, HttpError> {
        let course_exists = self
            .courses
            .find_course(course_id)
            .await
            .map_err(|err| repo_failure("find_course", err))?
            .is_some();
        if !course_exists {
            self.discard_orphaned_video(video_path.as_deref()).await;
            return Ok(None);
        }

        let lesson = self
            .lessons
            .create_lesson(CreateLessonParams {
                course_id,
                title,
                text_content,
                video_path,
            })
            .await
            .map_err(|err| repo_failure("create_lesson", err))?;

        info!(target: "aula::admin", lesson_id = %lesson.id, %course_id, "lesson created");
        Ok(Some(lesson))
    }

    /// Update a lesson, replacing its video when a new one was uploaded.
    /// Evicts the lesson's cached content bundle so the next read serves the
    /// current row. `Ok(None)` when the lesson does not exist.
    pub async fn update_lesson(
        &self,
        lesson_id: Uuid,
        title: String,
        text_content: Option<String>,
        new_video_path: Option<String>,
    ) -> Result<Option<LessonRecord>, HttpError> {
        let Some(existing) = self
            .lessons
            .find_lesson(lesson_id)
            .await
            .map_err(|err| repo_failure("find_lesson", err))?
        else {
            self.discard_orphaned_video(new_video_path.as_deref()).await;
            return Ok(None);
        };

        let video_path = match new_video_path {
            Some(new_path) => {
                if let Some(old_path) = existing.video_path.as_deref() {
                    self.delete_video_file(lesson_id, old_path).await;
                }
                Some(new_path)
            }
            None => existing.video_path,
        };

        let updated = self
            .lessons
            .update_lesson(UpdateLessonParams {
                id: lesson_id,
                title,
                text_content,
                video_path,
            })
            .await
            .map_err(|err| repo_failure("update_lesson", err))?;

        self.cache.evict(&keys::lesson_content(lesson_id)).await;
        info!(target: "aula::admin", %lesson_id, "lesson updated, content cache evicted");

        Ok(updated)
    }

    /// Delete a lesson and everything derived from it: the cached content
    /// bundle, the stored video, the completion rows, and every cached
    /// completion flag. Returns the parent course id, or `Ok(None)` when the
    /// lesson does not exist.
    pub async fn delete_lesson(&self, lesson_id: Uuid) -> Result<Option<Uuid>, HttpError> {
        let Some(lesson) = self
            .lessons
            .find_lesson(lesson_id)
            .await
            .map_err(|err| repo_failure("find_lesson", err))?
        else {
            return Ok(None);
        };

        self.cache.evict(&keys::lesson_content(lesson_id)).await;

        if let Some(path) = lesson.video_path.as_deref() {
            self.delete_video_file(lesson_id, path).await;
        }

        let removed = self
            .completions
            .delete_completions_for_lesson(lesson_id)
            .await
            .map_err(|err| repo_failure("delete_completions_for_lesson", err))?;

        self.lessons
            .delete_lesson(lesson_id)
            .await
            .map_err(|err| repo_failure("delete_lesson", err))?;

        self.cache
            .evict_pattern(&keys::completion_flag_pattern(lesson_id))
            .await;

        info!(
            target: "aula::admin",
            %lesson_id,
            completions_removed = removed,
            "lesson deleted with completions and cache entries"
        );

        Ok(Some(lesson.course_id))
    }

    async fn delete_video_file(&self, lesson_id: Uuid, stored_path: &str) {
        if let Err(err) = self.storage.delete(stored_path).await {
            warn!(
                target: "aula::admin",
                %lesson_id,
                stored_path,
                error = %err,
                "failed to remove stored video"
            );
        }
    }

    /// A video was streamed to storage for a target that turned out not to
    /// exist; remove it so it cannot leak.
    async fn discard_orphaned_video(&self, stored_path: Option<&str>) {
        if let Some(path) = stored_path {
            if let Err(err) = self.storage.delete(path).await {
                warn!(target: "aula::admin", stored_path = path, error = %err, "failed to discard orphaned video");
            }
        }
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to manage lesson",
        format!("{operation} failed: {err}"),
    )
}
