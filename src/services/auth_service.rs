//! Authentication service - registration, login, tokens and the caller's
//! own profile.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{
    Config, DEFAULT_LOCK_TTL_SECONDS, FIRST_ACCOUNT_LOCK_ATTEMPTS, LOCK_RESOURCE_FIRST_ACCOUNT,
    LOCK_RETRY_DELAY_MS, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER,
};
use crate::domain::{
    NewUser, Password, User, UserChanges, UserResponse, UserRole, UserStatus,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, LockGuard, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// JWT claims payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token expiration time in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
    pub user: UserResponse,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new account. The first account ever created is an admin.
    async fn register(&self, email: String, password: String, name: String) -> AppResult<User>;

    /// Login and return JWT token
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Resolve a bearer token to the account as it is now. Role and status
    /// come from the stored profile, not from the token.
    async fn authenticate(&self, token: &str) -> AppResult<UserResponse>;

    async fn get_profile(&self, user_id: Uuid) -> AppResult<UserResponse>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<UserResponse>;

    async fn change_password(
        &self,
        user_id: Uuid,
        current_password: String,
        new_password: String,
    ) -> AppResult<()>;
}

fn generate_token(user: &User, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
        user: UserResponse::from(user.clone()),
    })
}

fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Option<Arc<Cache>>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, cache: Option<Arc<Cache>>, config: Config) -> Self {
        Self { uow, cache, config }
    }

    async fn live_user(&self, user_id: Uuid) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Serialize registrations that may create the first (admin) account.
    /// Without a cache there is nothing to lock against.
    async fn first_account_lock(&self) -> AppResult<Option<LockGuard>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        for _ in 0..FIRST_ACCOUNT_LOCK_ATTEMPTS {
            if let Some(guard) = cache
                .try_acquire_lock(LOCK_RESOURCE_FIRST_ACCOUNT, DEFAULT_LOCK_TTL_SECONDS)
                .await?
            {
                return Ok(Some(guard));
            }
            tokio::time::sleep(std::time::Duration::from_millis(LOCK_RETRY_DELAY_MS)).await;
        }
        Err(AppError::bad_request(
            "Another registration is in progress, try again",
        ))
    }

    async fn forget_profile(&self, user_id: &Uuid) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_user(user_id).await {
                tracing::warn!(user_id = %user_id, error = %e, "Profile cache invalidation failed");
            }
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register(&self, email: String, password: String, name: String) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        // Deleted accounts keep their email reserved
        if self.uow.users().find_by_email_with_deleted(&email).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&password)?.into_string();

        // Accounts are only soft deleted, so a non-zero count stays non-zero
        let mut existing = self.uow.users().count_with_deleted().await?;
        let lock = if existing == 0 {
            let lock = self.first_account_lock().await?;
            existing = self.uow.users().count_with_deleted().await?;
            lock
        } else {
            None
        };
        let role = if existing == 0 {
            UserRole::Admin
        } else {
            UserRole::Viewer
        };

        let created = self
            .uow
            .users()
            .create(NewUser {
                email,
                password_hash,
                name: name.trim().to_string(),
                role,
            })
            .await;
        if let Some(lock) = lock {
            if let Err(e) = lock.release().await {
                tracing::warn!(error = %e, "First-account lock release failed");
            }
        }
        let user = created?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.uow.users().find_by_email(&email).await? else {
            // Same hashing cost whether or not the account exists
            Password::verify_dummy(&password);
            return Err(AppError::InvalidCredentials);
        };

        if !Password::from_hash(user.password_hash.as_str()).verify(&password) {
            return Err(AppError::InvalidCredentials);
        }
        if !user.can_sign_in() {
            tracing::info!(user_id = %user.id, status = %user.status, "Sign-in refused");
            return Err(AppError::InvalidCredentials);
        }

        generate_token(&user, &self.config)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }

    async fn authenticate(&self, token: &str) -> AppResult<UserResponse> {
        let claims = self.verify_token(token)?;
        let profile = match self.get_profile(claims.sub).await {
            Ok(profile) => profile,
            Err(AppError::NotFound) => return Err(AppError::Unauthorized),
            Err(e) => return Err(e),
        };
        if profile.status != UserStatus::Active {
            tracing::info!(user_id = %profile.id, status = %profile.status, "Token of inactive account refused");
            return Err(AppError::Unauthorized);
        }
        Ok(profile)
    }

    async fn get_profile(&self, user_id: Uuid) -> AppResult<UserResponse> {
        if let Some(cache) = &self.cache {
            match cache.get_user(&user_id).await {
                Ok(Some(profile)) => return Ok(profile),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Profile cache read failed"),
            }
        }

        let profile = UserResponse::from(self.live_user(user_id).await?);
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_user(&profile).await {
                tracing::warn!(error = %e, "Profile cache write failed");
            }
        }
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<UserResponse> {
        let user = self.live_user(user_id).await?;

        let email = email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| *e != user.email);
        if let Some(email) = &email {
            if self.uow.users().find_by_email_with_deleted(email).await?.is_some() {
                return Err(AppError::conflict("Email"));
            }
        }

        let changes = UserChanges {
            email,
            name: name.map(|n| n.trim().to_string()),
            ..Default::default()
        };
        if changes.is_empty() {
            return Ok(UserResponse::from(user));
        }

        let updated = self.uow.users().update(user_id, changes).await?;
        self.forget_profile(&user_id).await;
        Ok(UserResponse::from(updated))
    }

    async fn change_password(
        &self,
        user_id: Uuid,
        current_password: String,
        new_password: String,
    ) -> AppResult<()> {
        let user = self.live_user(user_id).await?;
        if !Password::from_hash(user.password_hash.as_str()).verify(&current_password) {
            return Err(AppError::InvalidCredentials);
        }

        let hash = Password::new(&new_password)?.into_string();
        self.uow.users().update_password(user_id, hash).await?;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockUserRepository;
    use crate::services::test_support::{user, TestUnitOfWork};
    use mockall::predicate::eq;

    const SECRET: &str = "a-test-secret-that-is-long-enough!!";

    fn service(users: MockUserRepository) -> Authenticator<TestUnitOfWork> {
        Authenticator::new(
            TestUnitOfWork::new().with_users(users).into_arc(),
            None,
            Config::new(SECRET),
        )
    }

    #[tokio::test]
    async fn first_registered_user_becomes_admin() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email_with_deleted().returning(|_| Ok(None));
        users.expect_count_with_deleted().returning(|| Ok(0));
        users
            .expect_create()
            .withf(|u| u.role == UserRole::Admin && u.email == "owner@tea.local")
            .returning(|u| {
                let mut created = user(u.role);
                created.email = u.email;
                Ok(created)
            });

        let created = service(users)
            .register(" Owner@Tea.local ".into(), "Matcha-2024".into(), "Owner".into())
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn later_users_register_as_viewers() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email_with_deleted().returning(|_| Ok(None));
        users.expect_count_with_deleted().returning(|| Ok(4));
        users
            .expect_create()
            .withf(|u| u.role == UserRole::Viewer)
            .returning(|u| Ok(user(u.role)));

        let created = service(users)
            .register("clerk@tea.local".into(), "Matcha-2024".into(), "Clerk".into())
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::Viewer);
    }

    #[tokio::test]
    async fn register_rejects_reused_email() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email_with_deleted()
            .returning(|_| Ok(Some(user(UserRole::Viewer))));

        let err = service(users)
            .register("clerk@tea.local".into(), "Matcha-2024".into(), "Clerk".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_issues_token_carrying_role() {
        let mut account = user(UserRole::Manager);
        account.password_hash = Password::new("Gyokuro-99").unwrap().into_string();
        let email = account.email.clone();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .with(eq(email.clone()))
            .returning(move |_| Ok(Some(account.clone())));

        let auth = service(users);
        let token = auth.login(email, "Gyokuro-99".into()).await.unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 24 * 3600);

        let claims = auth.verify_token(&token.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Manager);
        assert_eq!(claims.sub, token.user.id);
    }

    #[tokio::test]
    async fn login_refuses_wrong_password_unknown_email_and_blocked_users() {
        let mut blocked = user(UserRole::Operator);
        blocked.password_hash = Password::new("Hojicha-11").unwrap().into_string();
        blocked.status = crate::domain::UserStatus::Blocked;
        let blocked_email = blocked.email.clone();

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(move |email| {
            if email == blocked_email {
                Ok(Some(blocked.clone()))
            } else {
                Ok(None)
            }
        });
        let auth = service(users);

        for (email, password) in [
            ("operator@tea-logistics.local", "wrong-password"),
            ("operator@tea-logistics.local", "Hojicha-11"),
            ("nobody@tea-logistics.local", "Hojicha-11"),
        ] {
            let err = auth.login(email.into(), password.into()).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials), "{}", email);
        }
    }

    #[tokio::test]
    async fn authenticate_uses_the_role_on_record() {
        let manager = user(UserRole::Manager);
        let token = generate_token(&manager, &Config::new(SECRET)).unwrap();
        let mut demoted = manager.clone();
        demoted.role = UserRole::Viewer;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .with(eq(manager.id))
            .returning(move |_| Ok(Some(demoted.clone())));

        let account = service(users)
            .authenticate(&token.access_token)
            .await
            .unwrap();
        assert_eq!(account.id, manager.id);
        assert_eq!(account.role, UserRole::Viewer);
    }

    #[tokio::test]
    async fn authenticate_refuses_blocked_and_deleted_accounts() {
        let blocked = user(UserRole::Operator);
        let deleted = user(UserRole::Manager);
        let config = Config::new(SECRET);
        let blocked_token = generate_token(&blocked, &config).unwrap().access_token;
        let deleted_token = generate_token(&deleted, &config).unwrap().access_token;
        let blocked_id = blocked.id;

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |id| {
            if id == blocked_id {
                let mut account = blocked.clone();
                account.status = UserStatus::Blocked;
                Ok(Some(account))
            } else {
                Ok(None)
            }
        });
        let auth = service(users);

        for token in [blocked_token, deleted_token] {
            let err = auth.authenticate(&token).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized));
        }
    }

    #[tokio::test]
    async fn first_admin_is_only_granted_when_the_recount_is_still_zero() {
        let mut users = MockUserRepository::new();
        // Empty at first look, taken by the time the lock is held
        let mut counts: Vec<u64> = vec![1, 0];
        users.expect_find_by_email_with_deleted().returning(|_| Ok(None));
        users
            .expect_count_with_deleted()
            .times(2)
            .returning(move || Ok(counts.pop().unwrap_or(1)));
        users
            .expect_create()
            .withf(|u| u.role == UserRole::Viewer)
            .returning(|u| Ok(user(u.role)));

        let created = service(users)
            .register("second@tea.local".into(), "Matcha-2024".into(), "Second".into())
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::Viewer);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let auth = service(MockUserRepository::new());
        assert!(matches!(
            auth.verify_token("not.a.token"),
            Err(AppError::Jwt(_))
        ));
    }

    #[tokio::test]
    async fn update_profile_rejects_taken_email() {
        let me = user(UserRole::Viewer);
        let id = me.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(me.clone())));
        users
            .expect_find_by_email_with_deleted()
            .returning(|_| Ok(Some(user(UserRole::Admin))));

        let err = service(users)
            .update_profile(id, None, Some("admin@tea-logistics.local".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn change_password_checks_current_password() {
        let mut me = user(UserRole::Viewer);
        me.password_hash = Password::new("Old-Password").unwrap().into_string();
        let id = me.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(me.clone())));
        users
            .expect_update_password()
            .times(1)
            .returning(|_, _| Ok(()));
        let auth = service(users);

        let err = auth
            .change_password(id, "not-it".into(), "New-Password".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        auth.change_password(id, "Old-Password".into(), "New-Password".into())
            .await
            .unwrap();
    }
}
