//! Per-user notifications. Users only ever see their own.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{NewNotification, Notification};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        params: PaginationParams,
    ) -> AppResult<Paginated<Notification>>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<Notification>;

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<Notification>;

    /// Returns how many notifications changed
    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()>;

    /// Send a notification to any live user
    async fn create(&self, notification: NewNotification) -> AppResult<Notification>;
}

pub struct NotificationManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> NotificationManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Another user's notification is reported as missing
    async fn owned(&self, user_id: Uuid, id: Uuid) -> AppResult<Notification> {
        self.uow
            .notifications()
            .find_by_id(id)
            .await?
            .filter(|n| n.user_id == user_id)
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl<U: UnitOfWork> NotificationService for NotificationManager<U> {
    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        params: PaginationParams,
    ) -> AppResult<Paginated<Notification>> {
        let (rows, total) = self
            .uow
            .notifications()
            .list_for_user(user_id, unread_only, params)
            .await?;
        Ok(Paginated::new(rows, &params, total))
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<Notification> {
        self.owned(user_id, id).await
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<Notification> {
        let notification = self.owned(user_id, id).await?;
        if notification.is_read() {
            return Ok(notification);
        }
        self.uow.notifications().mark_read(id).await
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        self.uow.notifications().mark_all_read(user_id).await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        self.owned(user_id, id).await?;
        self.uow.notifications().delete(id).await
    }

    async fn create(&self, notification: NewNotification) -> AppResult<Notification> {
        notification.validate()?;
        if self
            .uow
            .users()
            .find_by_id(notification.user_id)
            .await?
            .is_none()
        {
            return Err(AppError::validation("Recipient does not exist"));
        }
        self.uow.notifications().create(notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NotificationStatus, NotificationType};
    use crate::infra::repositories::MockNotificationRepository;
    use crate::services::test_support::TestUnitOfWork;
    use chrono::Utc;

    fn notification(user_id: Uuid, status: NotificationStatus) -> Notification {
        let now = Utc::now();
        Notification {
            id: Uuid::new_v4(),
            user_id,
            notification_type: NotificationType::LowStock,
            status,
            title: "Low stock alert".into(),
            message: "2 inventory item(s) are below 10 units".into(),
            data: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn someone_elses_notification_is_not_found() {
        let owner = Uuid::new_v4();
        let n = notification(owner, NotificationStatus::Unread);
        let id = n.id;
        let mut repo = MockNotificationRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(n.clone())));
        repo.expect_delete().never();

        let service = NotificationManager::new(TestUnitOfWork::new().with_notifications(repo).into_arc());
        let intruder = Uuid::new_v4();
        assert!(matches!(
            service.get(intruder, id).await.unwrap_err(),
            AppError::NotFound
        ));
        assert!(matches!(
            service.delete(intruder, id).await.unwrap_err(),
            AppError::NotFound
        ));
    }

    #[tokio::test]
    async fn marking_a_read_notification_is_a_no_op() {
        let owner = Uuid::new_v4();
        let n = notification(owner, NotificationStatus::Read);
        let id = n.id;
        let mut repo = MockNotificationRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(n.clone())));
        repo.expect_mark_read().never();

        let service = NotificationManager::new(TestUnitOfWork::new().with_notifications(repo).into_arc());
        let result = service.mark_read(owner, id).await.unwrap();
        assert!(result.is_read());
    }
}
