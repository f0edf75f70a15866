//! Service container and parallel helpers.
//!
//! The container owns one instance of every service, all sharing the same
//! `Persistence` unit of work, and hands them out as trait objects.

use std::future::Future;
use std::sync::Arc;

use super::{
    AuthService, BatchService, DeliveryService, ExchangeService, InventoryService,
    NotificationService, ProductService, ReceivingService, ReportService, UserService,
};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{Cache, Persistence};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn products(&self) -> Arc<dyn ProductService>;

    fn inventory(&self) -> Arc<dyn InventoryService>;

    fn deliveries(&self) -> Arc<dyn DeliveryService>;

    fn receivings(&self) -> Arc<dyn ReceivingService>;

    fn notifications(&self) -> Arc<dyn NotificationService>;

    fn batches(&self) -> Arc<dyn BatchService>;

    fn reports(&self) -> Arc<dyn ReportService>;

    fn exchange(&self) -> Arc<dyn ExchangeService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth: Arc<dyn AuthService>,
    users: Arc<dyn UserService>,
    products: Arc<dyn ProductService>,
    inventory: Arc<dyn InventoryService>,
    deliveries: Arc<dyn DeliveryService>,
    receivings: Arc<dyn ReceivingService>,
    notifications: Arc<dyn NotificationService>,
    batches: Arc<dyn BatchService>,
    reports: Arc<dyn ReportService>,
    exchange: Arc<dyn ExchangeService>,
}

impl Services {
    /// Wire every service over one database connection. Without a cache
    /// profiles are read straight from the database and batch runs are
    /// not locked across processes.
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        cache: Option<Arc<Cache>>,
        config: Config,
    ) -> Self {
        use super::{
            Authenticator, BatchManager, DeliveryManager, ExchangeManager, InventoryManager,
            NotificationManager, ProductManager, ReceivingManager, ReportManager, UserManager,
        };
        use crate::jobs::{BatchRunner, JobEnv};

        let threshold = config.low_stock_threshold;
        let uow = Arc::new(Persistence::new(db));

        let deliveries: Arc<dyn DeliveryService> = Arc::new(DeliveryManager::new(uow.clone()));
        let reports: Arc<dyn ReportService> = Arc::new(ReportManager::new(uow.clone(), threshold));
        let runner = BatchRunner::new(JobEnv {
            uow: uow.clone(),
            deliveries: deliveries.clone(),
            reports: reports.clone(),
            low_stock_threshold: threshold,
        });

        Self {
            auth: Arc::new(Authenticator::new(uow.clone(), cache.clone(), config)),
            users: Arc::new(UserManager::new(uow.clone(), cache.clone())),
            products: Arc::new(ProductManager::new(uow.clone())),
            inventory: Arc::new(InventoryManager::new(uow.clone(), threshold)),
            receivings: Arc::new(ReceivingManager::new(uow.clone())),
            notifications: Arc::new(NotificationManager::new(uow.clone())),
            batches: Arc::new(BatchManager::new(uow.clone(), cache, runner)),
            exchange: Arc::new(ExchangeManager::new(uow, deliveries.clone())),
            deliveries,
            reports,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.users.clone()
    }

    fn products(&self) -> Arc<dyn ProductService> {
        self.products.clone()
    }

    fn inventory(&self) -> Arc<dyn InventoryService> {
        self.inventory.clone()
    }

    fn deliveries(&self) -> Arc<dyn DeliveryService> {
        self.deliveries.clone()
    }

    fn receivings(&self) -> Arc<dyn ReceivingService> {
        self.receivings.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationService> {
        self.notifications.clone()
    }

    fn batches(&self) -> Arc<dyn BatchService> {
        self.batches.clone()
    }

    fn reports(&self) -> Arc<dyn ReportService> {
        self.reports.clone()
    }

    fn exchange(&self) -> Arc<dyn ExchangeService> {
        self.exchange.clone()
    }
}

/// Run independent reads concurrently.
///
/// If any of them fails, the first error is returned and the rest are
/// dropped.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// ```ignore
    /// let (product_count, unread) = parallel::join2(
    ///     uow.products().count(),
    ///     uow.notifications().count_unread(user_id),
    /// ).await?;
    /// ```
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }

    pub async fn join3<F1, F2, F3, T1, T2, T3>(
        f1: F1,
        f2: F2,
        f3: F3,
    ) -> AppResult<(T1, T2, T3)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
        F3: Future<Output = AppResult<T3>>,
    {
        try_join!(f1, f2, f3)
    }

    pub async fn join4<F1, F2, F3, F4, T1, T2, T3, T4>(
        f1: F1,
        f2: F2,
        f3: F3,
        f4: F4,
    ) -> AppResult<(T1, T2, T3, T4)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
        F3: Future<Output = AppResult<T3>>,
        F4: Future<Output = AppResult<T4>>,
    {
        try_join!(f1, f2, f3, f4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn join2_returns_both_results() {
        async fn stock() -> AppResult<i64> {
            Ok(640)
        }
        async fn unread() -> AppResult<u64> {
            Ok(3)
        }

        let (a, b) = parallel::join2(stock(), unread()).await.unwrap();
        assert_eq!(a, 640);
        assert_eq!(b, 3);
    }

    #[tokio::test]
    async fn join3_fails_when_any_read_fails() {
        let result = parallel::join3(
            async { Ok::<_, AppError>(1) },
            async { Err::<i32, _>(AppError::NotFound) },
            async { Ok::<_, AppError>(3) },
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn join4_keeps_argument_order() {
        let (a, b, c, d) = parallel::join4(
            async { Ok::<_, AppError>("products") },
            async { Ok::<_, AppError>(2) },
            async { Ok::<_, AppError>(3.5) },
            async { Ok::<_, AppError>(true) },
        )
        .await
        .unwrap();
        assert_eq!((a, b, c, d), ("products", 2, 3.5, true));
    }

    #[test]
    fn mock_container_hands_out_services() {
        let mut container = MockServiceContainer::new();
        container
            .expect_deliveries()
            .returning(|| Arc::new(super::super::MockDeliveryService::new()));
        let _ = container.deliveries();
    }
}
