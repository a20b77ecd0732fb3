//! Lesson content and completion tracking.
//!
//! Two read-through caches live here. Lesson content is expensive to
//! assemble (a joined query plus a markdown render), so the finished bundle
//! is cached under `v1:lesson:<id>`. Completion status is a hot read on
//! every lesson page, cached under `v1:user:<uid>:lesson:<lid>:completed`.
//! The database stays the source of truth; the caches are best-effort and a
//! cache outage degrades to direct reads.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::render::MarkdownRenderService;
use crate::application::repos::{CompletionsRepo, LessonsRepo, RepoError};
use crate::cache::{CacheConfig, CacheHandle, codec, keys};
use crate::domain::entities::{CourseRecord, LessonRecord};
use crate::domain::types::CompletionOutcome;

const SOURCE: &str = "application::lessons::LessonService";

/// Lesson fields as cached and served to the lesson page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonContent {
    pub id: Uuid,
    pub title: String,
    pub text_content: String,
    pub video_url: Option<String>,
    pub course_id: Uuid,
}

/// Parent course summary carried alongside the lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
}

/// The render-ready representation of a lesson: lesson fields, parent course
/// summary, and pre-rendered HTML. This is the exact JSON shape stored in
/// the cache, so existing entries stay readable across deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonContentBundle {
    pub lesson: LessonContent,
    pub course: CourseSummary,
    pub text_html: String,
}

pub struct LessonService {
    lessons: Arc<dyn LessonsRepo>,
    completions: Arc<dyn CompletionsRepo>,
    renderer: Arc<MarkdownRenderService>,
    cache: CacheHandle,
    lesson_ttl: Duration,
    completion_ttl: Duration,
}

impl LessonService {
    pub fn new(
        lessons: Arc<dyn LessonsRepo>,
        completions: Arc<dyn CompletionsRepo>,
        renderer: Arc<MarkdownRenderService>,
        cache: CacheHandle,
        config: &CacheConfig,
    ) -> Self {
        Self {
            lessons,
            completions,
            renderer,
            cache,
            lesson_ttl: config.lesson_ttl,
            completion_ttl: config.completion_ttl,
        }
    }

    /// Load the content bundle for a lesson, serving from cache when a valid
    /// entry exists. `Ok(None)` means no such lesson.
    pub async fn lesson_content(
        &self,
        lesson_id: Uuid,
    ) -> Result<Option<LessonContentBundle>, HttpError> {
        let key = keys::lesson_content(lesson_id);

        if let Some(raw) = self.cache.get(&key).await {
            match codec::decode_json::<LessonContentBundle>(&raw) {
                Ok(bundle) => {
                    debug!(target: "aula::lessons", %lesson_id, "lesson bundle served from cache");
                    return Ok(Some(bundle));
                }
                // A payload we cannot decode is treated as a miss; the entry
                // is rewritten below from the database.
                Err(err) => {
                    warn!(target: "aula::lessons", key, error = %err, "discarding undecodable lesson cache entry");
                }
            }
        }

        let Some((lesson, course)) = self
            .lessons
            .find_lesson_with_course(lesson_id)
            .await
            .map_err(|err| repo_failure("find_lesson_with_course", err))?
        else {
            info!(target: "aula::lessons", %lesson_id, "lesson not found");
            return Ok(None);
        };

        let bundle = self.build_bundle(lesson, course);

        match codec::encode_json(&bundle) {
            Ok(payload) => self.cache.put(&key, &payload, self.lesson_ttl).await,
            Err(err) => {
                warn!(target: "aula::lessons", key, error = %err, "lesson bundle could not be encoded for caching");
            }
        }

        Ok(Some(bundle))
    }

    /// Whether the user has completed the lesson, serving from cache when a
    /// recognizable flag exists.
    pub async fn is_completed(&self, lesson_id: Uuid, user_id: Uuid) -> Result<bool, HttpError> {
        let key = keys::completion_flag(user_id, lesson_id);

        if let Some(raw) = self.cache.get(&key).await {
            match codec::decode_flag(&raw) {
                Some(completed) => return Ok(completed),
                None => {
                    warn!(target: "aula::lessons", key, payload = raw, "unrecognized completion flag, recomputing");
                }
            }
        }

        let completed = self
            .completions
            .completion_exists(user_id, lesson_id)
            .await
            .map_err(|err| repo_failure("completion_exists", err))?;

        self.cache
            .put(&key, codec::encode_flag(completed), self.completion_ttl)
            .await;

        Ok(completed)
    }

    /// Record a completion for the user.
    ///
    /// The insert is conflict-ignoring against the unique (user, lesson)
    /// constraint, so concurrent calls agree on a single winner. On success
    /// the completion flag is refreshed and the lesson bundle is evicted,
    /// both best-effort.
    pub async fn mark_completed(
        &self,
        lesson_id: Uuid,
        user_id: Uuid,
    ) -> Result<CompletionOutcome, HttpError> {
        let exists = self
            .lessons
            .lesson_exists(lesson_id)
            .await
            .map_err(|err| repo_failure("lesson_exists", err))?;
        if !exists {
            info!(target: "aula::lessons", %lesson_id, "completion requested for unknown lesson");
            return Ok(CompletionOutcome::UnknownLesson);
        }

        let Some(completion) = self
            .completions
            .insert_completion_if_absent(user_id, lesson_id)
            .await
            .map_err(|err| repo_failure("insert_completion_if_absent", err))?
        else {
            debug!(target: "aula::lessons", %lesson_id, %user_id, "lesson already completed");
            return Ok(CompletionOutcome::AlreadyCompleted);
        };

        info!(
            target: "aula::lessons",
            %lesson_id,
            %user_id,
            completion_id = %completion.id,
            "lesson completion recorded"
        );

        self.cache
            .put(
                &keys::completion_flag(user_id, lesson_id),
                codec::encode_flag(true),
                self.completion_ttl,
            )
            .await;
        self.cache.evict(&keys::lesson_content(lesson_id)).await;

        Ok(CompletionOutcome::Recorded)
    }

    fn build_bundle(&self, lesson: LessonRecord, course: CourseRecord) -> LessonContentBundle {
        let text_content = lesson.text_content.unwrap_or_default();
        let text_html = self.renderer.render_or_raw(&text_content);
        let video_url = lesson.video_path.map(|path| format!("/media/{path}"));

        LessonContentBundle {
            lesson: LessonContent {
                id: lesson.id,
                title: lesson.title,
                text_content,
                video_url,
                course_id: lesson.course_id,
            },
            course: CourseSummary {
                id: course.id,
                title: course.title,
            },
            text_html,
        }
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load lesson data",
        format!("{operation} failed: {err}"),
    )
}
