//! Login, registration, and session cookie plumbing.

use axum::{
    Form,
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, LOCATION, SET_COOKIE},
    },
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;

use crate::application::auth::{LoginOutcome, RegisterOutcome};
use crate::presentation::views::{LoginTemplate, RegisterTemplate, render_template_response};

use super::AppState;

pub(super) const AUTH_COOKIE: &str = "access_token";
const FLASH_COOKIE: &str = "flash_error";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

pub(super) async fn login_page(headers: HeaderMap) -> Response {
    let flash = take_flash(&headers);
    let mut response = render_template_response(
        LoginTemplate {
            flash_error: flash.clone().unwrap_or_default(),
        },
        StatusCode::OK,
    );
    if flash.is_some() {
        append_cookie(&mut response, clear_flash_cookie());
    }
    response
}

pub(super) async fn register_page(headers: HeaderMap) -> Response {
    let flash = take_flash(&headers);
    let mut response = render_template_response(
        RegisterTemplate {
            flash_error: flash.clone().unwrap_or_default(),
        },
        StatusCode::OK,
    );
    if flash.is_some() {
        append_cookie(&mut response, clear_flash_cookie());
    }
    response
}

pub(super) async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.auth.login(&form.email, &form.password).await {
        Ok(LoginOutcome::LoggedIn { token, .. }) => {
            logged_in_redirect(&state, "/courses", &token)
        }
        Ok(LoginOutcome::InvalidCredentials) | Ok(LoginOutcome::Forbidden) => {
            flash_redirect("/auth/login", "Invalid email or password")
        }
        Err(err) => err.into_response(),
    }
}

pub(super) async fn admin_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth.admin_login(&form.email, &form.password).await {
        Ok(LoginOutcome::LoggedIn { token, .. }) => {
            logged_in_redirect(&state, "/admin/courses", &token)
        }
        Ok(LoginOutcome::Forbidden) => flash_redirect("/", "No access to the admin area"),
        Ok(LoginOutcome::InvalidCredentials) => flash_redirect("/", "Invalid email or password"),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    match state
        .auth
        .register(&form.email, &form.full_name, &form.password)
        .await
    {
        Ok(RegisterOutcome::Registered { token, .. }) => {
            logged_in_redirect(&state, "/courses", &token)
        }
        Ok(RegisterOutcome::EmailTaken) => {
            flash_redirect("/auth/register", "Email is already registered")
        }
        Err(err) => err.into_response(),
    }
}

pub(super) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = cookie_value(&headers, AUTH_COOKIE) {
        state.auth.logout(&token).await;
    }

    (
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (LOCATION, "/".to_string()),
            (SET_COOKIE, clear_auth_cookie()),
        ]),
    )
        .into_response()
}

// ============================================================================
// Cookie helpers
// ============================================================================

/// Extract a cookie value from the request headers.
pub(super) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            let Some((key, value)) = pair.trim().split_once('=') else {
                continue;
            };
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn logged_in_redirect(state: &AppState, location: &str, token: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (LOCATION, location.to_string()),
            (
                SET_COOKIE,
                auth_cookie(token, state.cookie_secure, state.token_ttl_seconds),
            ),
        ]),
    )
        .into_response()
}

fn flash_redirect(location: &str, message: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (LOCATION, location.to_string()),
            (SET_COOKIE, flash_cookie(message)),
        ]),
    )
        .into_response()
}

fn auth_cookie(token: &str, secure: bool, max_age_seconds: u64) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}{secure}"
    )
}

fn clear_auth_cookie() -> String {
    format!("{AUTH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn flash_cookie(message: &str) -> String {
    format!(
        "{FLASH_COOKIE}={}; Path=/; SameSite=Lax; Max-Age=60",
        encode_cookie_value(message)
    )
}

pub(super) fn clear_flash_cookie() -> String {
    format!("{FLASH_COOKIE}=; Path=/; SameSite=Lax; Max-Age=0")
}

/// Read and decode the flash message, if any. The caller is responsible for
/// attaching the clearing cookie to its response.
pub(super) fn take_flash(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, FLASH_COOKIE)
        .filter(|value| !value.is_empty())
        .map(|value| decode_cookie_value(&value))
}

pub(super) fn append_cookie(response: &mut Response, cookie: String) {
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

/// Percent-encode a flash message so it survives the cookie value grammar.
fn encode_cookie_value(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push('%');
                encoded.push_str(&format!("{other:02X}"));
            }
        }
    }
    encoded
}

fn decode_cookie_value(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let hex = &encoded[index + 1..index + 3];
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                decoded.push(byte);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_values_parse_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("access_token=abc123; flash_error=oops"),
        );
        assert_eq!(
            cookie_value(&headers, "access_token"),
            Some("abc123".to_string())
        );
        assert_eq!(cookie_value(&headers, "flash_error"), Some("oops".to_string()));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn flash_messages_survive_encoding() {
        let message = "Invalid email or password";
        let decoded = decode_cookie_value(&encode_cookie_value(message));
        assert_eq!(decoded, message);
    }

    #[test]
    fn auth_cookie_is_http_only() {
        let cookie = auth_cookie("tok", false, 3600);
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(auth_cookie("tok", true, 3600).contains("Secure"));
    }
}
