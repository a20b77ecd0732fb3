//! Server-rendered pages for authenticated students plus the landing page.

use axum::{
    Extension,
    extract::{Path, State},
    http::{
        HeaderMap, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use tracing::warn;
use uuid::Uuid;

use crate::infra::uploads::VideoStorageError;
use crate::presentation::views::{
    CourseDetailTemplate, CourseView, CoursesTemplate, DashboardNoteView, DashboardTemplate,
    IndexTemplate, LessonLinkView, ProfileStatsView, ProfileTemplate, UserView,
    render_not_found_response, render_template_response,
};

use super::{
    AppState, auth,
    db_health_response,
    middleware::CurrentUser,
};

pub(super) async fn index(headers: HeaderMap) -> Response {
    let flash = auth::take_flash(&headers);
    let mut response = render_template_response(
        IndexTemplate {
            flash_error: flash.clone().unwrap_or_default(),
        },
        StatusCode::OK,
    );
    if flash.is_some() {
        auth::append_cookie(&mut response, auth::clear_flash_cookie());
    }
    response
}

pub(super) async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    let notes = match state.notes.notes_overview(user.id).await {
        Ok(notes) => notes,
        Err(err) => return err.into_response(),
    };

    let notes = notes
        .into_iter()
        .map(|row| DashboardNoteView {
            lesson_id: row.lesson_id,
            lesson_title: row.lesson_title,
            content: row.content.unwrap_or_default(),
        })
        .collect();

    render_template_response(
        DashboardTemplate {
            user: UserView::from(&user),
            notes,
        },
        StatusCode::OK,
    )
}

pub(super) async fn courses(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    let courses = match state.catalog.list_courses().await {
        Ok(courses) => courses,
        Err(err) => return err.into_response(),
    };

    render_template_response(
        CoursesTemplate {
            user: UserView::from(&user),
            courses: courses.into_iter().map(CourseView::from).collect(),
        },
        StatusCode::OK,
    )
}

pub(super) async fn course_detail(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Response {
    match state.catalog.course_detail(course_id).await {
        Ok(Some((course, lessons))) => render_template_response(
            CourseDetailTemplate {
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

pub(super) async fn profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    let stats = match state.profile.learning_stats(user.id).await {
        Ok(stats) => stats,
        Err(err) => return err.into_response(),
    };

    render_template_response(
        ProfileTemplate {
            user: UserView::from(&user),
            stats: ProfileStatsView {
                progress_percent: format!("{:.2}", stats.progress_percent),
                completed_lessons: stats.completed_lessons,
                total_lessons: stats.total_lessons,
                last_lessons: stats
                    .last_lessons
                    .into_iter()
                    .map(|item| crate::presentation::views::CompletedLessonItemView {
                        title: item.title,
                        date: item.date,
                    })
                    .collect(),
            },
        },
        StatusCode::OK,
    )
}

pub(super) async fn serve_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    match state.storage.read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, mime.as_ref().to_string()),
                    (CACHE_CONTROL, "private, max-age=3600".to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(VideoStorageError::InvalidPath) => render_not_found_response("File not found"),
        Err(VideoStorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            render_not_found_response("File not found")
        }
        Err(err) => {
            warn!(target: "aula::http", path, error = %err, "failed to read stored video");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(super) async fn db_health(State(state): State<AppState>) -> Response {
    db_health_response(state.db.health_check().await)
}
