//! Per-user notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, opt_into_domain, page_into_domain};
use super::entities::notification::{self, ActiveModel, Entity as NotificationEntity};
use crate::domain::{NewNotification, Notification, NotificationStatus};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: NewNotification) -> AppResult<Notification>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Notification>>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        params: PaginationParams,
    ) -> AppResult<(Vec<Notification>, u64)>;

    async fn mark_read(&self, id: Uuid) -> AppResult<Notification>;

    /// Returns how many notifications changed
    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64>;

    /// Read notifications last touched before `cutoff`
    async fn delete_read_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

pub struct NotificationStore {
    db: DatabaseConnection,
}

impl NotificationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepository for NotificationStore {
    async fn create(&self, notification: NewNotification) -> AppResult<Notification> {
        insert(&self.db, notification).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Notification>> {
        opt_into_domain(NotificationEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        params: PaginationParams,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let mut query = NotificationEntity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id);
        if unread_only {
            query = query
                .filter(notification::Column::Status.eq(NotificationStatus::Unread.as_str()));
        }
        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<Notification> {
        let model = NotificationEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        active.status = Set(NotificationStatus::Read.to_string());
        active.updated_at = Set(Utc::now());
        Notification::try_from(active.update(&self.db).await?)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = NotificationEntity::update_many()
            .col_expr(
                notification::Column::Status,
                Expr::value(NotificationStatus::Read.as_str()),
            )
            .col_expr(notification::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Status.eq(NotificationStatus::Unread.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = NotificationEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64> {
        Ok(NotificationEntity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Status.eq(NotificationStatus::Unread.as_str()))
            .count(&self.db)
            .await?)
    }

    async fn delete_read_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = NotificationEntity::delete_many()
            .filter(notification::Column::Status.eq(NotificationStatus::Read.as_str()))
            .filter(notification::Column::UpdatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

pub(crate) async fn insert<C: ConnectionTrait>(
    conn: &C,
    notification: NewNotification,
) -> AppResult<Notification> {
    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(notification.user_id),
        notification_type: Set(notification.notification_type.to_string()),
        status: Set(NotificationStatus::Unread.to_string()),
        title: Set(notification.title),
        message: Set(notification.message),
        data: Set(notification.data),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Notification::try_from(active_model.insert(conn).await?)
}
