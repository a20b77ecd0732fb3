//! JSON endpoint backing the profile statistics widgets.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::profile::CompletedLessonView;

use super::{AppState, middleware::CurrentUser};

#[derive(Debug, Serialize)]
pub struct ProfileDataResponse {
    pub full_name: Option<String>,
    pub email: String,
    pub progress_percent: f64,
    pub completed_lessons: u64,
    pub total_lessons: u64,
    pub last_lessons: Vec<CompletedLessonView>,
}

pub(super) async fn profile_data(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    match state.profile.learning_stats(user.id).await {
        Ok(stats) => Json(ProfileDataResponse {
            full_name: user.full_name,
            email: user.email,
            progress_percent: stats.progress_percent,
            completed_lessons: stats.completed_lessons,
            total_lessons: stats.total_lessons,
            last_lessons: stats.last_lessons,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
