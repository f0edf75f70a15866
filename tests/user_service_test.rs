//! User administration through the public service API.
//!
//! Run with `cargo test --features test-utils`.

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mockall::predicate::{always, eq};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use tea_logistics::domain::{User, UserChanges, UserRole, UserStatus};
use tea_logistics::errors::{AppError, AppResult};
use tea_logistics::infra::repositories::MockUserRepository;
use tea_logistics::infra::{
    BatchRepository, DeliveryRepository, InventoryRepository, NotificationRepository,
    ProductRepository, ReceivingRepository, StockHistoryRepository, TransactionContext,
    UnitOfWork, UserRepository,
};
use tea_logistics::services::{UserManager, UserService};
use tea_logistics::types::PaginationParams;

fn account(id: Uuid, email: &str, role: UserRole) -> User {
    User {
        id,
        email: email.to_string(),
        password_hash: "hashed".to_string(),
        name: "Kenji Mori".to_string(),
        role,
        status: UserStatus::Active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}

/// Unit of work that only knows about users
struct UsersOnly {
    users: Arc<MockUserRepository>,
}

#[async_trait]
impl UnitOfWork for UsersOnly {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        unreachable!("user administration never reads products")
    }

    fn inventory(&self) -> Arc<dyn InventoryRepository> {
        unreachable!("user administration never reads inventory")
    }

    fn stock_history(&self) -> Arc<dyn StockHistoryRepository> {
        unreachable!("user administration never reads stock history")
    }

    fn deliveries(&self) -> Arc<dyn DeliveryRepository> {
        unreachable!("user administration never reads deliveries")
    }

    fn receivings(&self) -> Arc<dyn ReceivingRepository> {
        unreachable!("user administration never reads receivings")
    }

    fn notifications(&self) -> Arc<dyn NotificationRepository> {
        unreachable!("user administration never reads notifications")
    }

    fn batches(&self) -> Arc<dyn BatchRepository> {
        unreachable!("user administration never reads batches")
    }

    async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(
                TransactionContext<'a>,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        Err(AppError::internal("user administration runs no transactions"))
    }
}

fn service(users: MockUserRepository) -> UserManager<UsersOnly> {
    UserManager::new(
        Arc::new(UsersOnly {
            users: Arc::new(users),
        }),
        None,
    )
}

#[tokio::test]
async fn list_users_reports_total_pages() {
    let mut users = MockUserRepository::new();
    users
        .expect_list()
        .with(always(), eq(true))
        .returning(|_, _| {
            Ok((
                vec![account(Uuid::new_v4(), "a@tea.example", UserRole::Viewer)],
                41,
            ))
        });

    let page = service(users)
        .list_users(PaginationParams::new(1, 20), true)
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.meta.total, 41);
    assert_eq!(page.meta.total_pages, 3);
}

#[tokio::test]
async fn changing_email_to_a_taken_address_conflicts() {
    let id = Uuid::new_v4();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .with(eq(id))
        .returning(move |id| Ok(Some(account(id, "old@tea.example", UserRole::Operator))));
    users
        .expect_find_by_email_with_deleted()
        .with(eq("taken@tea.example"))
        .returning(|email| Ok(Some(account(Uuid::new_v4(), email, UserRole::Viewer))));
    users.expect_update().never();

    let changes = UserChanges {
        email: Some("taken@tea.example".to_string()),
        ..Default::default()
    };
    let result = service(users)
        .update_user(Uuid::new_v4(), id, changes)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn promoting_an_operator_updates_the_role() {
    let admin = Uuid::new_v4();
    let id = Uuid::new_v4();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|id| Ok(Some(account(id, "op@tea.example", UserRole::Operator))));
    users
        .expect_update()
        .withf(move |target, changes| *target == id && changes.role == Some(UserRole::Manager))
        .returning(|id, _| Ok(account(id, "op@tea.example", UserRole::Manager)));

    let changes = UserChanges {
        role: Some(UserRole::Manager),
        ..Default::default()
    };
    let user = service(users).update_user(admin, id, changes).await.unwrap();

    assert_eq!(user.role, UserRole::Manager);
}

#[tokio::test]
async fn empty_update_returns_the_user_unchanged() {
    let id = Uuid::new_v4();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|id| Ok(Some(account(id, "same@tea.example", UserRole::Viewer))));
    users.expect_update().never();

    let user = service(users)
        .update_user(Uuid::new_v4(), id, UserChanges::default())
        .await
        .unwrap();

    assert_eq!(user.email, "same@tea.example");
}

#[tokio::test]
async fn deleting_another_user_soft_deletes() {
    let target = Uuid::new_v4();
    let mut users = MockUserRepository::new();
    users
        .expect_delete()
        .with(eq(target))
        .times(1)
        .returning(|_| Ok(()));

    assert_ok!(service(users).delete_user(Uuid::new_v4(), target).await);
}

#[tokio::test]
async fn restoring_a_missing_user_is_not_found() {
    let mut users = MockUserRepository::new();
    users.expect_restore().returning(|_| Err(AppError::NotFound));

    let err = assert_err!(service(users).restore_user(Uuid::new_v4()).await);
    assert!(matches!(err, AppError::NotFound));
}
