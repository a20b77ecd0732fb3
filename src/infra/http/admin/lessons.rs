//! HTTP handlers for lesson admin, including video upload.

use axum::{
    Extension,
    extract::{Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use futures::StreamExt;
use tracing::warn;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::infra::uploads::{StoredVideo, VideoStorageError};
use crate::presentation::views::{
    AdminLessonFormTemplate, AdminLessonFormView, AdminLessonsTemplate, CourseView,
    LessonLinkView, UserView, render_not_found_response, render_template_response,
};

use super::super::{AppState, middleware::CurrentUser};

const SOURCE: &str = "infra::http::admin_lessons";

pub(in super::super) async fn admin_lessons(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Response {
    match state.admin_lessons.course_lessons(course_id).await {
        Ok(Some((course, lessons))) => render_template_response(
            AdminLessonsTemplate {
                user: UserView::from(&user),
                course: CourseView::from(course),
                lessons: lessons.iter().map(LessonLinkView::from).collect(),
            },
            StatusCode::OK,
        ),
        Ok(None) => render_not_found_response("Course not found"),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_lesson_new(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Response {
    let course = match state.admin_courses.find_course(course_id).await {
        Ok(Some(course)) => course,
        Ok(None) => return render_not_found_response("Course not found"),
        Err(err) => return err.into_response(),
    };

    render_template_response(
        AdminLessonFormTemplate {
            user: UserView::from(&user),
            course: CourseView::from(course),
            heading: "New lesson".to_string(),
            action: format!("/admin/courses/{course_id}/lessons/create"),
            lesson: empty_form_view(),
            is_edit: false,
        },
        StatusCode::OK,
    )
}

pub(in super::super) async fn admin_lesson_create(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_lesson_form(&state, &mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let video_path = form.video.map(|video| video.stored_path);
    match state
        .admin_lessons
        .create_lesson(course_id, form.title, form.text_content, video_path)
        .await
    {
        Ok(Some(_)) => redirect_to_lessons(course_id),
        Ok(None) => render_not_found_response("Course not found"),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_lesson_edit(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(lesson_id): Path<Uuid>,
) -> Response {
    match state.admin_lessons.lesson_for_edit(lesson_id).await {
        Ok(Some((lesson, course))) => {
            let video_url = lesson
                .video_path
                .as_deref()
                .map(|path| format!("/media/{path}"))
                .unwrap_or_default();
            render_template_response(
                AdminLessonFormTemplate {
                    user: UserView::from(&user),
                    course: CourseView::from(course),
                    heading: format!("Edit {}", lesson.title),
                    action: format!("/admin/lessons/{lesson_id}/update"),
                    lesson: AdminLessonFormView {
                        id: lesson.id,
                        title: lesson.title,
                        text_content: lesson.text_content.unwrap_or_default(),
                        has_video: !video_url.is_empty(),
                        video_url,
                    },
                    is_edit: true,
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response("Lesson not found"),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_lesson_update(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_lesson_form(&state, &mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let video_path = form.video.map(|video| video.stored_path);
    match state
        .admin_lessons
        .update_lesson(lesson_id, form.title, form.text_content, video_path)
        .await
    {
        Ok(Some(lesson)) => redirect_to_lessons(lesson.course_id),
        Ok(None) => render_not_found_response("Lesson not found"),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_lesson_delete(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
) -> Response {
    match state.admin_lessons.delete_lesson(lesson_id).await {
        Ok(Some(course_id)) => redirect_to_lessons(course_id),
        Ok(None) => render_not_found_response("Lesson not found"),
        Err(err) => err.into_response(),
    }
}

// ============================================================================
// Multipart form parsing
// ============================================================================

struct LessonFormPayload {
    title: String,
    text_content: Option<String>,
    video: Option<StoredVideo>,
}

/// Read the lesson form fields, streaming any uploaded video straight to
/// storage. A missing or empty file input means "keep the current video".
async fn read_lesson_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<LessonFormPayload, Response> {
    let mut title = String::new();
    let mut text_content: Option<String> = None;
    let mut video: Option<StoredVideo> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!(target: SOURCE, error = %err, "failed to read multipart payload");
                let status = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                return Err(HttpError::new(
                    SOURCE,
                    status,
                    "Invalid upload payload",
                    err.to_string(),
                )
                .into_response());
            }
        };

        match field.name() {
            Some("title") => {
                title = read_text_field(field).await?.trim().to_string();
            }
            Some("text_content") => {
                let value = read_text_field(field).await?;
                text_content = if value.trim().is_empty() {
                    None
                } else {
                    Some(value)
                };
            }
            Some("video_file") => {
                let filename = field
                    .file_name()
                    .map(|value| value.to_string())
                    .filter(|value| !value.trim().is_empty());
                let Some(filename) = filename else {
                    continue;
                };

                let stream = field.map(|result| {
                    result.map_err(|err| {
                        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                            VideoStorageError::PayloadTooLarge {
                                source: Box::new(err),
                            }
                        } else {
                            VideoStorageError::PayloadStream {
                                source: Box::new(err),
                            }
                        }
                    })
                });

                match state.storage.store_stream(&filename, stream).await {
                    Ok(stored) => video = Some(stored),
                    // A selected-but-empty file is treated as no upload.
                    Err(VideoStorageError::EmptyPayload) => {
                        warn!(target: SOURCE, filename, "ignoring empty video upload");
                    }
                    Err(VideoStorageError::PayloadTooLarge { source }) => {
                        return Err(HttpError::new(
                            SOURCE,
                            StatusCode::PAYLOAD_TOO_LARGE,
                            "Video exceeds the upload limit",
                            source.to_string(),
                        )
                        .into_response());
                    }
                    Err(err) => {
                        return Err(HttpError::new(
                            SOURCE,
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Failed to store video",
                            err.to_string(),
                        )
                        .into_response());
                    }
                }
            }
            _ => continue,
        }
    }

    if title.is_empty() {
        return Err(HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Title must not be empty",
            "lesson title was blank",
        )
        .into_response());
    }

    Ok(LessonFormPayload {
        title,
        text_content,
        video,
    })
}

async fn read_text_field(
    field: axum_extra::extract::multipart::Field,
) -> Result<String, Response> {
    field.text().await.map_err(|err| {
        HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid form data",
            err.to_string(),
        )
        .into_response()
    })
}

fn empty_form_view() -> AdminLessonFormView {
    AdminLessonFormView {
        id: Uuid::nil(),
        title: String::new(),
        text_content: String::new(),
        video_url: String::new(),
        has_video: false,
    }
}

fn redirect_to_lessons(course_id: Uuid) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(LOCATION, format!("/admin/courses/{course_id}/lessons"))],
    )
        .into_response()
}
