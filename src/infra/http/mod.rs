mod admin;
mod auth;
mod lessons;
mod middleware;
mod notes;
mod profile;
mod public;

pub use middleware::CurrentUser;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;
use crate::application::{
    admin::{courses::AdminCourseService, lessons::AdminLessonService},
    auth::AuthService,
    catalog::CourseCatalogService,
    lessons::LessonService,
    notes::NoteService,
    profile::ProfileService,
};
use crate::infra::{db::PostgresRepositories, uploads::VideoStorage};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub catalog: Arc<CourseCatalogService>,
    pub lessons: Arc<LessonService>,
    pub notes: Arc<NoteService>,
    pub profile: Arc<ProfileService>,
    pub admin_courses: Arc<AdminCourseService>,
    pub admin_lessons: Arc<AdminLessonService>,
    pub storage: Arc<VideoStorage>,
    pub db: Arc<PostgresRepositories>,
    pub cookie_secure: bool,
    pub token_ttl_seconds: u64,
    pub upload_limit_bytes: u64,
}

pub fn build_router(state: AppState) -> Router {
    let open_routes = Router::new()
        .route("/", get(public::index))
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route(
            "/auth/register",
            get(auth::register_page).post(auth::register),
        )
        .route("/auth/admin-login", post(auth::admin_login))
        .route("/auth/logout", get(auth::logout))
        .route("/_health/db", get(public::db_health));

    let session_routes = Router::new()
        .route("/dashboard", get(public::dashboard))
        .route("/courses", get(public::courses))
        .route("/courses/{course_id}", get(public::course_detail))
        .route("/profile", get(public::profile))
        .route("/api/profile_data", get(profile::profile_data))
        .route("/lessons/{lesson_id}", get(lessons::lesson_page))
        .route(
            "/lessons/{lesson_id}/complete",
            put(lessons::complete_lesson).get(lessons::completion_status),
        )
        .route("/lessons/{lesson_id}/notes", get(notes::list_notes))
        .route("/lessons/{lesson_id}/note", post(notes::create_note))
        .route(
            "/lessons/{lesson_id}/note/{note_id}",
            put(notes::update_note).delete(notes::delete_note),
        )
        .route("/media/{*path}", get(public::serve_media))
        .layer(from_fn_with_state(state.clone(), middleware::require_user));

    let admin_routes = admin::build_admin_router(&state);

    Router::new()
        .merge(open_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .with_state(state)
        .layer(from_fn(middleware::log_responses))
        .layer(from_fn(middleware::set_request_context))
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
