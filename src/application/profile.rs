//! Learning-progress statistics for the profile page.

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::repos::{CompletionsRepo, LessonsRepo, RepoError};

const SOURCE: &str = "application::profile::ProfileService";
const RECENT_COMPLETIONS_LIMIT: u32 = 5;
const COMPLETION_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day].[month].[year]");

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletedLessonView {
    pub title: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LearningStats {
    pub progress_percent: f64,
    pub completed_lessons: u64,
    pub total_lessons: u64,
    pub last_lessons: Vec<CompletedLessonView>,
}

pub struct ProfileService {
    lessons: Arc<dyn LessonsRepo>,
    completions: Arc<dyn CompletionsRepo>,
}

impl ProfileService {
    pub fn new(lessons: Arc<dyn LessonsRepo>, completions: Arc<dyn CompletionsRepo>) -> Self {
        Self {
            lessons,
            completions,
        }
    }

    pub async fn learning_stats(&self, user_id: Uuid) -> Result<LearningStats, HttpError> {
        let total_lessons = self
            .lessons
            .count_lessons()
            .await
            .map_err(|err| repo_failure("count_lessons", err))?;

        let completed_lessons = self
            .completions
            .count_completions_for_user(user_id)
            .await
            .map_err(|err| repo_failure("count_completions_for_user", err))?;

        let progress_percent = if total_lessons == 0 {
            0.0
        } else {
            let ratio = completed_lessons as f64 / total_lessons as f64;
            (ratio * 10_000.0).round() / 100.0
        };

        let recent = self
            .completions
            .recent_completions_for_user(user_id, RECENT_COMPLETIONS_LIMIT)
            .await
            .map_err(|err| repo_failure("recent_completions_for_user", err))?;

        let last_lessons = recent
            .into_iter()
            .map(|row| CompletedLessonView {
                title: row.lesson_title,
                date: row
                    .completed_at
                    .format(COMPLETION_DATE_FORMAT)
                    .unwrap_or_default(),
            })
            .collect();

        Ok(LearningStats {
            progress_percent,
            completed_lessons,
            total_lessons,
            last_lessons,
        })
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load profile data",
        format!("{operation} failed: {err}"),
    )
}
