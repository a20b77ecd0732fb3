use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(message: &'static str) -> Response {
    let mut response = render_template_response(
        ErrorTemplate {
            status: StatusCode::NOT_FOUND.as_u16(),
            message,
        },
        StatusCode::NOT_FOUND,
    );
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        message,
    )
    .attach(&mut response);
    response
}

pub fn render_forbidden_response(message: &'static str) -> Response {
    let mut response = render_template_response(
        ErrorTemplate {
            status: StatusCode::FORBIDDEN.as_u16(),
            message,
        },
        StatusCode::FORBIDDEN,
    );
    ErrorReport::from_message(
        "presentation::views::render_forbidden_response",
        StatusCode::FORBIDDEN,
        message,
    )
    .attach(&mut response);
    response
}

// ============================================================================
// View models
// ============================================================================

#[derive(Clone)]
pub struct UserView {
    pub display_name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<&crate::domain::entities::UserRecord> for UserView {
    fn from(user: &crate::domain::entities::UserRecord) -> Self {
        Self {
            display_name: user
                .full_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| user.email.clone()),
            email: user.email.clone(),
            is_admin: user.role.is_admin(),
        }
    }
}

#[derive(Clone)]
pub struct CourseView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

impl From<crate::domain::entities::CourseRecord> for CourseView {
    fn from(course: crate::domain::entities::CourseRecord) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description.unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct LessonLinkView {
    pub id: Uuid,
    pub title: String,
    pub has_video: bool,
}

impl From<&crate::domain::entities::LessonRecord> for LessonLinkView {
    fn from(lesson: &crate::domain::entities::LessonRecord) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title.clone(),
            has_video: lesson.video_path.is_some(),
        }
    }
}

#[derive(Clone)]
pub struct LessonPageView {
    pub id: Uuid,
    pub title: String,
    pub video_url: String,
    pub has_video: bool,
    pub course_id: Uuid,
    pub course_title: String,
    pub content_html: String,
    pub completed: bool,
    pub note_content: String,
}

#[derive(Clone)]
pub struct DashboardNoteView {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub content: String,
}

#[derive(Clone)]
pub struct ProfileStatsView {
    pub progress_percent: String,
    pub completed_lessons: u64,
    pub total_lessons: u64,
    pub last_lessons: Vec<CompletedLessonItemView>,
}

#[derive(Clone)]
pub struct CompletedLessonItemView {
    pub title: String,
    pub date: String,
}

#[derive(Clone)]
pub struct AdminLessonFormView {
    pub id: Uuid,
    pub title: String,
    pub text_content: String,
    pub video_url: String,
    pub has_video: bool,
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub flash_error: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub flash_error: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub flash_error: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user: UserView,
    pub notes: Vec<DashboardNoteView>,
}

#[derive(Template)]
#[template(path = "courses.html")]
pub struct CoursesTemplate {
    pub user: UserView,
    pub courses: Vec<CourseView>,
}

#[derive(Template)]
#[template(path = "course_detail.html")]
pub struct CourseDetailTemplate {
    pub user: UserView,
    pub course: CourseView,
    pub lessons: Vec<LessonLinkView>,
}

#[derive(Template)]
#[template(path = "lesson_detail.html")]
pub struct LessonTemplate {
    pub user: UserView,
    pub lesson: LessonPageView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub user: UserView,
    pub stats: ProfileStatsView,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: &'static str,
}

#[derive(Template)]
#[template(path = "admin/courses_list.html")]
pub struct AdminCoursesTemplate {
    pub user: UserView,
    pub courses: Vec<CourseView>,
}

#[derive(Template)]
#[template(path = "admin/course_form.html")]
pub struct AdminCourseFormTemplate {
    pub user: UserView,
    pub heading: String,
    pub action: String,
    pub title: String,
    pub description: String,
}

#[derive(Template)]
#[template(path = "admin/lessons_list.html")]
pub struct AdminLessonsTemplate {
    pub user: UserView,
    pub course: CourseView,
    pub lessons: Vec<LessonLinkView>,
}

#[derive(Template)]
#[template(path = "admin/lesson_form.html")]
pub struct AdminLessonFormTemplate {
    pub user: UserView,
    pub course: CourseView,
    pub heading: String,
    pub action: String,
    pub lesson: AdminLessonFormView,
    pub is_edit: bool,
}
