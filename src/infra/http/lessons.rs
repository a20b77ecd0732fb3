//! The lesson page and completion endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::domain::types::CompletionOutcome;
use crate::presentation::views::{
    LessonPageView, LessonTemplate, UserView, render_not_found_response,
    render_template_response,
};

use super::{AppState, middleware::CurrentUser};

pub(super) async fn lesson_page(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(lesson_id): Path<Uuid>,
) -> Response {
    let bundle = match state.lessons.lesson_content(lesson_id).await {
        Ok(Some(bundle)) => bundle,
        Ok(None) => return render_not_found_response("Lesson not found"),
        Err(err) => return err.into_response(),
    };

    let completed = match state.lessons.is_completed(lesson_id, user.id).await {
        Ok(completed) => completed,
        Err(err) => return err.into_response(),
    };

    let note = match state.notes.latest_note_for_lesson(user.id, lesson_id).await {
        Ok(note) => note,
        Err(err) => return err.into_response(),
    };

    let video_url = bundle.lesson.video_url.unwrap_or_default();
    render_template_response(
        LessonTemplate {
            user: UserView::from(&user),
            lesson: LessonPageView {
                id: bundle.lesson.id,
                title: bundle.lesson.title,
                has_video: !video_url.is_empty(),
                video_url,
                course_id: bundle.course.id,
                course_title: bundle.course.title,
                content_html: bundle.text_html,
                completed,
                note_content: note.and_then(|note| note.content).unwrap_or_default(),
            },
        },
        StatusCode::OK,
    )
}

pub(super) async fn complete_lesson(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(lesson_id): Path<Uuid>,
) -> Response {
    match state.lessons.mark_completed(lesson_id, user.id).await {
        Ok(CompletionOutcome::Recorded) => (
            StatusCode::CREATED,
            Json(json!({ "detail": "Lesson completed" })),
        )
            .into_response(),
        Ok(CompletionOutcome::AlreadyCompleted) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Lesson is already completed" })),
        )
            .into_response(),
        Ok(CompletionOutcome::UnknownLesson) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Lesson not found" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn completion_status(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(lesson_id): Path<Uuid>,
) -> Response {
    match state.lessons.is_completed(lesson_id, user.id).await {
        Ok(completed) => Json(json!({ "completed": completed })).into_response(),
        Err(err) => err.into_response(),
    }
}
