//! HTTP handlers for course admin.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::presentation::views::{
    AdminCourseFormTemplate, AdminCoursesTemplate, CourseView, UserView,
    render_not_found_response, render_template_response,
};

use super::super::{AppState, middleware::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct CourseForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl CourseForm {
    fn description_value(&self) -> Option<String> {
        let trimmed = self.description.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

pub(in super::super) async fn admin_courses(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    match state.admin_courses.list_courses().await {
        Ok(courses) => render_template_response(
            AdminCoursesTemplate {
                user: UserView::from(&user),
                courses: courses.into_iter().map(CourseView::from).collect(),
            },
            StatusCode::OK,
        ),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_course_new(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    render_template_response(
        AdminCourseFormTemplate {
            user: UserView::from(&user),
            heading: "New course".to_string(),
            action: "/admin/courses/create".to_string(),
            title: String::new(),
            description: String::new(),
        },
        StatusCode::OK,
    )
}

pub(in super::super) async fn admin_course_create(
    State(state): State<AppState>,
    Form(form): Form<CourseForm>,
) -> Response {
    match state
        .admin_courses
        .create_course(&form.title, form.description_value())
        .await
    {
        Ok(_) => redirect_to_courses(),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_course_edit(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Response {
    match state.admin_courses.find_course(course_id).await {
        Ok(Some(course)) => render_template_response(
            AdminCourseFormTemplate {
                user: UserView::from(&user),
                heading: format!("Edit {}", course.title),
                action: format!("/admin/courses/{course_id}/update"),
                title: course.title,
                description: course.description.unwrap_or_default(),
            },
            StatusCode::OK,
        ),
        Ok(None) => render_not_found_response("Course not found"),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_course_update(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Form(form): Form<CourseForm>,
) -> Response {
    match state
        .admin_courses
        .update_course(course_id, &form.title, form.description_value())
        .await
    {
        Ok(Some(_)) => redirect_to_courses(),
        Ok(None) => render_not_found_response("Course not found"),
        Err(err) => err.into_response(),
    }
}

pub(in super::super) async fn admin_course_delete(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Response {
    match state.admin_courses.delete_course(course_id).await {
        Ok(true) => redirect_to_courses(),
        Ok(false) => render_not_found_response("Course not found"),
        Err(err) => err.into_response(),
    }
}

fn redirect_to_courses() -> Response {
    (StatusCode::SEE_OTHER, [(LOCATION, "/admin/courses")]).into_response()
}
