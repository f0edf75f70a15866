//! User repository with soft delete support.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, into_domain, opt_into_domain, page_into_domain, unique_violation};
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::domain::{NewUser, User, UserChanges, UserRole, UserStatus};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Query methods exclude soft-deleted records unless named `*_with_deleted`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Email lookups for uniqueness checks must see deleted rows too
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;

    /// Every row ever created, deleted or not
    async fn count_with_deleted(&self) -> AppResult<u64>;

    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User>;

    async fn update_password(&self, id: Uuid, password_hash: String) -> AppResult<()>;

    /// Soft delete (sets deleted_at)
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn restore(&self, id: Uuid) -> AppResult<User>;

    async fn list(
        &self,
        params: PaginationParams,
        include_deleted: bool,
    ) -> AppResult<(Vec<User>, u64)>;

    /// Live, active users holding any of `roles`
    async fn find_by_roles(&self, roles: Vec<UserRole>) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        find_live(&self.db, id).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        let model = UserEntity::find_by_id(id).one(&self.db).await?;
        opt_into_domain(model)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let model = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        opt_into_domain(model)
    }

    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        let model = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        opt_into_domain(model)
    }

    async fn count_with_deleted(&self) -> AppResult<u64> {
        Ok(UserEntity::find().count(&self.db).await?)
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            name: Set(user.name),
            role: Set(user.role.to_string()),
            status: Set(UserStatus::Active.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(unique_violation("Email"))?;
        User::try_from(model)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User> {
        let user = live_model(&self.db, id).await?;
        let mut active: ActiveModel = user.into();

        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(role) = changes.role {
            active.role = Set(role.to_string());
        }
        if let Some(status) = changes.status {
            active.status = Set(status.to_string());
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active
            .update(&self.db)
            .await
            .map_err(unique_violation("Email"))?;
        User::try_from(model)
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        let user = live_model(&self.db, id).await?;
        let mut active: ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(chrono::Utc::now());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let user = live_model(&self.db, id).await?;
        let mut active: ActiveModel = user.into();
        let now = chrono::Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> AppResult<User> {
        let user = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_not_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::validation("User is not deleted or does not exist"))?;

        let mut active: ActiveModel = user.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        User::try_from(model)
    }

    async fn list(
        &self,
        params: PaginationParams,
        include_deleted: bool,
    ) -> AppResult<(Vec<User>, u64)> {
        let mut query = UserEntity::find().order_by_asc(user::Column::CreatedAt);
        if !include_deleted {
            query = query.filter(user::Column::DeletedAt.is_null());
        }
        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }

    async fn find_by_roles(&self, roles: Vec<UserRole>) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .filter(user::Column::Role.is_in(roles.iter().map(UserRole::as_str)))
            .filter(user::Column::Status.eq(UserStatus::Active.as_str()))
            .filter(user::Column::DeletedAt.is_null())
            .all(&self.db)
            .await?;
        into_domain(models)
    }
}

async fn find_live<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Option<User>> {
    let model = UserEntity::find_by_id(id)
        .filter(user::Column::DeletedAt.is_null())
        .one(conn)
        .await?;
    opt_into_domain(model)
}

async fn live_model<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<user::Model> {
    UserEntity::find_by_id(id)
        .filter(user::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}
