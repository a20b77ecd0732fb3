//! Registration, login, and token revocation against an in-memory user store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use aula::application::auth::{AuthConfig, AuthService, LoginOutcome, RegisterOutcome};
use aula::application::repos::{CreateUserParams, RepoError, UsersRepo};
use aula::cache::{CacheError, CacheHandle, CacheStore, InMemoryCacheStore};
use aula::domain::entities::UserRecord;
use aula::domain::types::UserRole;

#[derive(Default)]
struct FakeUsers {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

impl FakeUsers {
    fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl UsersRepo for FakeUsers {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|user| user.email == email))
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: params.email,
            password_hash: params.password_hash,
            full_name: params.full_name,
            role: params.role,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

struct UnreachableCacheStore;

#[async_trait]
impl CacheStore for UnreachableCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }

    async fn set_with_ttl(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }
}

fn auth_service(users: &Arc<FakeUsers>, cache: CacheHandle) -> AuthService {
    AuthService::new(
        users.clone(),
        cache,
        AuthConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            token_ttl: Duration::from_secs(3600),
        },
    )
}

#[tokio::test]
async fn register_then_authenticate() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(InMemoryCacheStore::shared()));

    let outcome = auth
        .register("Ada@Example.com", "Ada Lovelace", "analytical-engine")
        .await
        .unwrap();
    let RegisterOutcome::Registered { user, token } = outcome else {
        panic!("expected successful registration");
    };
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.role, UserRole::Student);

    let resolved = auth.authenticate(&token).await.unwrap();
    assert_eq!(resolved.map(|user| user.id), Some(user.id));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(InMemoryCacheStore::shared()));

    auth.register("ada@example.com", "Ada", "password-one")
        .await
        .unwrap();
    let outcome = auth
        .register("ADA@example.com", "Ada again", "password-two")
        .await
        .unwrap();
    assert!(matches!(outcome, RegisterOutcome::EmailTaken));
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(InMemoryCacheStore::shared()));

    auth.register("ada@example.com", "Ada", "correct-password")
        .await
        .unwrap();

    let outcome = auth.login("ada@example.com", "wrong-password").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::InvalidCredentials));

    let outcome = auth.login("nobody@example.com", "whatever").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
}

#[tokio::test]
async fn students_cannot_use_admin_login() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(InMemoryCacheStore::shared()));

    auth.register("ada@example.com", "Ada", "correct-password")
        .await
        .unwrap();

    let outcome = auth
        .admin_login("ada@example.com", "correct-password")
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Forbidden));
}

#[tokio::test]
async fn admins_can_use_admin_login() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(InMemoryCacheStore::shared()));

    auth.create_admin("root@example.com", "Root", "correct-password")
        .await
        .unwrap();

    let outcome = auth
        .admin_login("root@example.com", "correct-password")
        .await
        .unwrap();
    let LoginOutcome::LoggedIn { user, .. } = outcome else {
        panic!("expected admin login to succeed");
    };
    assert_eq!(user.role, UserRole::Admin);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(InMemoryCacheStore::shared()));

    let RegisterOutcome::Registered { token, .. } = auth
        .register("ada@example.com", "Ada", "correct-password")
        .await
        .unwrap()
    else {
        panic!("expected successful registration");
    };

    assert!(auth.authenticate(&token).await.unwrap().is_some());
    auth.logout(&token).await;
    assert!(auth.authenticate(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn revocation_fails_open_when_the_cache_is_down() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(Arc::new(UnreachableCacheStore)));

    let RegisterOutcome::Registered { token, .. } = auth
        .register("ada@example.com", "Ada", "correct-password")
        .await
        .unwrap()
    else {
        panic!("expected successful registration");
    };

    // Logout cannot reach the revocation list, so the token stays live. The
    // degraded mode trades logout strictness for availability.
    auth.logout(&token).await;
    assert!(auth.authenticate(&token).await.unwrap().is_some());
}

#[tokio::test]
async fn garbage_tokens_resolve_to_no_user() {
    let users = FakeUsers::shared();
    let auth = auth_service(&users, CacheHandle::new(InMemoryCacheStore::shared()));

    assert!(auth.authenticate("not-a-jwt").await.unwrap().is_none());
}
