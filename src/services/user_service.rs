//! User administration - listing, editing, soft delete and restore.
//!
//! Callers are admins; the guards here stop an admin from locking
//! themself out.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{User, UserChanges, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, UnitOfWork};
use crate::types::{Paginated, PaginationParams};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// By default, operations exclude soft-deleted users.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(
        &self,
        params: PaginationParams,
        include_deleted: bool,
    ) -> AppResult<Paginated<User>>;

    /// Get user by ID including soft-deleted
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Update name, role or status of a live user
    async fn update_user(&self, actor: Uuid, id: Uuid, changes: UserChanges) -> AppResult<User>;

    /// Soft delete user (sets deleted_at timestamp)
    async fn delete_user(&self, actor: Uuid, id: Uuid) -> AppResult<()>;

    async fn restore_user(&self, id: Uuid) -> AppResult<User>;
}

pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Option<Arc<Cache>>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>, cache: Option<Arc<Cache>>) -> Self {
        Self { uow, cache }
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
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn list_users(
        &self,
        params: PaginationParams,
        include_deleted: bool,
    ) -> AppResult<Paginated<User>> {
        let (users, total) = self.uow.users().list(params, include_deleted).await?;
        Ok(Paginated::new(users, &params, total))
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id_with_deleted(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn update_user(&self, actor: Uuid, id: Uuid, changes: UserChanges) -> AppResult<User> {
        if actor == id && changes.role.is_some_and(|r| r != UserRole::Admin) {
            return Err(AppError::bad_request("Admins cannot remove their own admin role"));
        }

        let user = self
            .uow
            .users()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(email) = changes.email.as_deref().filter(|e| *e != user.email) {
            if self.uow.users().find_by_email_with_deleted(email).await?.is_some() {
                return Err(AppError::conflict("Email"));
            }
        }
        if changes.is_empty() {
            return Ok(user);
        }

        let updated = self.uow.users().update(id, changes).await?;
        self.forget_profile(&id).await;
        tracing::info!(user_id = %id, by = %actor, "User updated");
        Ok(updated)
    }

    async fn delete_user(&self, actor: Uuid, id: Uuid) -> AppResult<()> {
        if actor == id {
            return Err(AppError::bad_request("You cannot delete your own account"));
        }
        self.uow.users().delete(id).await?;
        self.forget_profile(&id).await;
        tracing::info!(user_id = %id, by = %actor, "User deleted");
        Ok(())
    }

    async fn restore_user(&self, id: Uuid) -> AppResult<User> {
        let user = self.uow.users().restore(id).await?;
        self.forget_profile(&id).await;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserStatus;
    use crate::infra::repositories::MockUserRepository;
    use crate::services::test_support::{user, TestUnitOfWork};
    use mockall::predicate::eq;

    fn service(users: MockUserRepository) -> UserManager<TestUnitOfWork> {
        UserManager::new(TestUnitOfWork::new().with_users(users).into_arc(), None)
    }

    #[tokio::test]
    async fn get_user_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id_with_deleted().returning(|_| Ok(None));

        let result = service(users).get_user(Uuid::new_v4()).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound));
    }

    #[tokio::test]
    async fn list_users_wraps_page_metadata() {
        let mut users = MockUserRepository::new();
        users
            .expect_list()
            .withf(|_, include_deleted| *include_deleted)
            .returning(|_, _| Ok((vec![user(UserRole::Viewer), user(UserRole::Operator)], 42)));

        let page = service(users)
            .list_users(PaginationParams::new(2, 2), true)
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.total, 42);
        assert_eq!(page.meta.total_pages, 21);
        assert_eq!(page.meta.page, 2);
    }

    #[tokio::test]
    async fn admin_cannot_delete_themself() {
        let id = Uuid::new_v4();
        let err = service(MockUserRepository::new())
            .delete_user(id, id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn admin_cannot_demote_themself() {
        let id = Uuid::new_v4();
        let changes = UserChanges {
            role: Some(UserRole::Manager),
            ..Default::default()
        };
        let err = service(MockUserRepository::new())
            .update_user(id, id, changes)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn update_blocks_another_user() {
        let target = user(UserRole::Operator);
        let target_id = target.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .with(eq(target_id))
            .returning(move |_| Ok(Some(target.clone())));
        users
            .expect_update()
            .withf(|_, c| c.status == Some(UserStatus::Blocked))
            .returning(|_, c| {
                let mut updated = user(UserRole::Operator);
                updated.status = c.status.unwrap_or(UserStatus::Active);
                Ok(updated)
            });

        let changes = UserChanges {
            status: Some(UserStatus::Blocked),
            ..Default::default()
        };
        let updated = service(users)
            .update_user(Uuid::new_v4(), target_id, changes)
            .await
            .unwrap();
        assert_eq!(updated.status, UserStatus::Blocked);
    }
}
