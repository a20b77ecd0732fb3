//! Admin back-office routes. Everything here requires an admin session.

mod courses;
mod lessons;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use super::{AppState, middleware};

pub(super) fn build_admin_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/courses", get(courses::admin_courses))
        .route("/admin/courses/new", get(courses::admin_course_new))
        .route("/admin/courses/create", post(courses::admin_course_create))
        .route(
            "/admin/courses/{course_id}/edit",
            get(courses::admin_course_edit),
        )
        .route(
            "/admin/courses/{course_id}/update",
            post(courses::admin_course_update),
        )
        .route(
            "/admin/courses/{course_id}/delete",
            post(courses::admin_course_delete),
        )
        .route(
            "/admin/courses/{course_id}/lessons",
            get(lessons::admin_lessons),
        )
        .route(
            "/admin/courses/{course_id}/lessons/new",
            get(lessons::admin_lesson_new),
        )
        .route(
            "/admin/courses/{course_id}/lessons/create",
            post(lessons::admin_lesson_create),
        )
        .route(
            "/admin/lessons/{lesson_id}/edit",
            get(lessons::admin_lesson_edit),
        )
        .route(
            "/admin/lessons/{lesson_id}/update",
            post(lessons::admin_lesson_update),
        )
        .route(
            "/admin/lessons/{lesson_id}/delete",
            post(lessons::admin_lesson_delete),
        )
        .layer(DefaultBodyLimit::max(state.upload_limit_bytes as usize))
        .layer(from_fn(middleware::require_admin))
        .layer(from_fn_with_state(state.clone(), middleware::require_user))
}
