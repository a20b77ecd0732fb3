//! Registration, login, and session tokens.
//!
//! Passwords are hashed with Argon2id (PHC string format, random salt).
//! Sessions are HS256 JWTs carried in an HttpOnly cookie; logout places the
//! token on a cache-backed revocation list until its natural expiry. The
//! revocation check fails open: if the cache is unreachable a token is
//! treated as live, so an outage degrades logout rather than locking every
//! user out.

use std::sync::Arc;
use std::time::Duration;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::http::StatusCode;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::cache::{CacheHandle, keys};
use crate::domain::entities::UserRecord;
use crate::domain::types::UserRole;

const SOURCE: &str = "application::auth::AuthService";

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    /// The user's role name.
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier for revocation and audit.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token (and revocation entry) lifetime.
    pub token_ttl: Duration,
}

#[derive(Debug)]
pub enum LoginOutcome {
    LoggedIn { user: UserRecord, token: String },
    InvalidCredentials,
    /// Credentials were valid but the account lacks the required role.
    Forbidden,
}

#[derive(Debug)]
pub enum RegisterOutcome {
    Registered { user: UserRecord, token: String },
    EmailTaken,
}

pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    cache: CacheHandle,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, cache: CacheHandle, config: AuthConfig) -> Self {
        Self {
            users,
            cache,
            config,
        }
    }

    /// Register a new student account and issue a session token.
    pub async fn register(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<RegisterOutcome, HttpError> {
        let email = normalize_email(email);

        let taken = self
            .users
            .email_exists(&email)
            .await
            .map_err(|err| repo_failure("email_exists", err))?;
        if taken {
            warn!(target: "aula::auth", email, "registration attempted with existing email");
            return Ok(RegisterOutcome::EmailTaken);
        }

        let password_hash = hash_password(password).map_err(hash_failure)?;
        let created = self
            .users
            .create_user(CreateUserParams {
                email: email.clone(),
                password_hash,
                full_name: Some(full_name.trim().to_string()),
                role: UserRole::Student,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same
            // address; same outcome as the pre-check.
            Err(RepoError::Duplicate { .. }) => return Ok(RegisterOutcome::EmailTaken),
            Err(other) => return Err(repo_failure("create_user", other)),
        };

        info!(target: "aula::auth", email, "new user registered");
        let token = self.issue_token(&user)?;
        Ok(RegisterOutcome::Registered { user, token })
    }

    /// Authenticate with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, HttpError> {
        self.login_with_role(email, password, None).await
    }

    /// Authenticate and additionally require the admin role.
    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, HttpError> {
        self.login_with_role(email, password, Some(UserRole::Admin))
            .await
    }

    async fn login_with_role(
        &self,
        email: &str,
        password: &str,
        required_role: Option<UserRole>,
    ) -> Result<LoginOutcome, HttpError> {
        let email = normalize_email(email);

        let Some(user) = self
            .users
            .find_user_by_email(&email)
            .await
            .map_err(|err| repo_failure("find_user_by_email", err))?
        else {
            warn!(target: "aula::auth", email, "login attempted for unknown email");
            return Ok(LoginOutcome::InvalidCredentials);
        };

        if !user.is_active {
            warn!(target: "aula::auth", email, "login attempted for deactivated account");
            return Ok(LoginOutcome::InvalidCredentials);
        }

        let verified = verify_password(password, &user.password_hash).map_err(hash_failure)?;
        if !verified {
            warn!(target: "aula::auth", email, "login attempted with wrong password");
            return Ok(LoginOutcome::InvalidCredentials);
        }

        if let Some(required) = required_role {
            if user.role != required {
                warn!(target: "aula::auth", email, "login lacks required role");
                return Ok(LoginOutcome::Forbidden);
            }
        }

        info!(target: "aula::auth", email, "user logged in");
        let token = self.issue_token(&user)?;
        Ok(LoginOutcome::LoggedIn { user, token })
    }

    /// Resolve the user behind a session token.
    ///
    /// `Ok(None)` covers every rejection: revoked, expired, malformed, or a
    /// user that no longer exists or was deactivated.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, HttpError> {
        if self.is_revoked(token).await {
            debug!(target: "aula::auth", "rejected revoked token");
            return Ok(None);
        }

        let claims = match self.validate_token(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(target: "aula::auth", error = %err, "rejected invalid token");
                return Ok(None);
            }
        };

        let user = self
            .users
            .find_user_by_id(claims.sub)
            .await
            .map_err(|err| repo_failure("find_user_by_id", err))?;

        Ok(user.filter(|user| user.is_active))
    }

    /// Revoke a session token until its natural expiry.
    pub async fn logout(&self, token: &str) {
        self.cache
            .put(&keys::revoked_token(token), "1", self.config.token_ttl)
            .await;
        info!(target: "aula::auth", "token revoked on logout");
    }

    /// Create an admin account directly (operator CLI path).
    pub async fn create_admin(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<UserRecord, HttpError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password).map_err(hash_failure)?;

        self.users
            .create_user(CreateUserParams {
                email,
                password_hash,
                full_name: Some(full_name.trim().to_string()),
                role: UserRole::Admin,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => HttpError::new(
                    SOURCE,
                    StatusCode::CONFLICT,
                    "Email is already registered",
                    "admin account already exists",
                ),
                other => repo_failure("create_user", other),
            })
    }

    fn issue_token(&self, user: &UserRecord) -> Result<String, HttpError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user.id,
            role: user.role.as_str().to_string(),
            exp: now + self.config.token_ttl.as_secs() as i64,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|err| {
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session",
                &err,
            )
        })
    }

    fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    async fn is_revoked(&self, token: &str) -> bool {
        // Fails open: a cache outage yields a miss, so the token stays live.
        self.cache.get(&keys::revoked_token(token)).await.is_some()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(err),
    }
}

fn hash_failure(err: argon2::password_hash::Error) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to process credentials",
        err.to_string(),
    )
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Account lookup failed",
        format!("{operation} failed: {err}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing succeeds");
        assert!(hash.starts_with("$argon2id$"), "expected argon2id PHC prefix");
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
    }

    #[test]
    fn wrong_password_verifies_false() {
        let hash = hash_password("real-password").expect("hashing succeeds");
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn emails_normalize_to_lowercase_trimmed() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
