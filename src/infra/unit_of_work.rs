//! Unit of Work pattern implementation.
//!
//! Centralizes access to all repositories and runs multi-step stock
//! mutations (adjustments, transfers, delivery reservations, receivings)
//! inside one database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::{
    delivery_repository, inventory_repository, notification_repository,
    receiving_repository, stock_history_repository, BatchRepository, BatchStore,
    DeliveryRepository, DeliveryStore, InventoryRepository, InventoryStore,
    NotificationRepository, NotificationStore, ProductRepository, ProductStore,
    ReceivingRepository, ReceivingStore, StockHistoryRepository, StockHistoryStore,
    UserRepository, UserStore,
};
use crate::domain::{
    Delivery, DeliveryStatus, Inventory, InventoryMovement, InventoryStatus, NewDelivery,
    NewInventory, NewMovement, NewNotification, NewStockHistory, Notification, Receiving,
    ReceivingStatus, StockHistory,
};
use crate::errors::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
///
/// Note: This trait is not mockable directly due to generic methods.
/// Tests wrap repository mocks in their own implementation.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn products(&self) -> Arc<dyn ProductRepository>;

    fn inventory(&self) -> Arc<dyn InventoryRepository>;

    fn stock_history(&self) -> Arc<dyn StockHistoryRepository>;

    fn deliveries(&self) -> Arc<dyn DeliveryRepository>;

    fn receivings(&self) -> Arc<dyn ReceivingRepository>;

    fn notifications(&self) -> Arc<dyn NotificationRepository>;

    fn batches(&self) -> Arc<dyn BatchRepository>;

    /// Execute a closure within a transaction.
    ///
    /// Committed on success, rolled back on error. Uses ReadCommitted; stock
    /// rows are locked with `SELECT ... FOR UPDATE` before they are changed.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn inventory(&self) -> TxInventoryRepository<'_> {
        TxInventoryRepository { txn: self.txn }
    }

    pub fn stock_history(&self) -> TxStockHistoryRepository<'_> {
        TxStockHistoryRepository { txn: self.txn }
    }

    pub fn deliveries(&self) -> TxDeliveryRepository<'_> {
        TxDeliveryRepository { txn: self.txn }
    }

    pub fn receivings(&self) -> TxReceivingRepository<'_> {
        TxReceivingRepository { txn: self.txn }
    }

    pub fn notifications(&self) -> TxNotificationRepository<'_> {
        TxNotificationRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    users: Arc<UserStore>,
    products: Arc<ProductStore>,
    inventory: Arc<InventoryStore>,
    stock_history: Arc<StockHistoryStore>,
    deliveries: Arc<DeliveryStore>,
    receivings: Arc<ReceivingStore>,
    notifications: Arc<NotificationStore>,
    batches: Arc<BatchStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(UserStore::new(db.clone())),
            products: Arc::new(ProductStore::new(db.clone())),
            inventory: Arc::new(InventoryStore::new(db.clone())),
            stock_history: Arc::new(StockHistoryStore::new(db.clone())),
            deliveries: Arc::new(DeliveryStore::new(db.clone())),
            receivings: Arc::new(ReceivingStore::new(db.clone())),
            notifications: Arc::new(NotificationStore::new(db.clone())),
            batches: Arc::new(BatchStore::new(db.clone())),
            db,
        }
    }

    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        self.products.clone()
    }

    fn inventory(&self) -> Arc<dyn InventoryRepository> {
        self.inventory.clone()
    }

    fn stock_history(&self) -> Arc<dyn StockHistoryRepository> {
        self.stock_history.clone()
    }

    fn deliveries(&self) -> Arc<dyn DeliveryRepository> {
        self.deliveries.clone()
    }

    fn receivings(&self) -> Arc<dyn ReceivingRepository> {
        self.receivings.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationRepository> {
        self.notifications.clone()
    }

    fn batches(&self) -> Arc<dyn BatchRepository> {
        self.batches.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::ReadCommitted, f).await
    }
}

/// Inventory rows inside a transaction
pub struct TxInventoryRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxInventoryRepository<'_> {
    /// Row for (product, location), locked for the rest of the transaction
    pub async fn find_for_update(
        &self,
        product_id: Uuid,
        location: &str,
    ) -> AppResult<Option<Inventory>> {
        inventory_repository::find_for_update(self.txn, product_id, location).await
    }

    pub async fn create(&self, inventory: NewInventory) -> AppResult<Inventory> {
        inventory_repository::insert(self.txn, inventory).await
    }

    pub async fn set_quantity(
        &self,
        id: Uuid,
        quantity: i32,
        status: InventoryStatus,
    ) -> AppResult<Inventory> {
        inventory_repository::set_quantity(self.txn, id, quantity, status).await
    }

    pub async fn record_movement(&self, movement: NewMovement) -> AppResult<InventoryMovement> {
        inventory_repository::insert_movement(self.txn, movement).await
    }
}

pub struct TxStockHistoryRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxStockHistoryRepository<'_> {
    pub async fn record(&self, entry: NewStockHistory) -> AppResult<StockHistory> {
        stock_history_repository::insert(self.txn, entry).await
    }
}

pub struct TxDeliveryRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxDeliveryRepository<'_> {
    pub async fn find_for_update(&self, id: Uuid) -> AppResult<Option<Delivery>> {
        delivery_repository::find_for_update(self.txn, id).await
    }

    pub async fn create(&self, delivery: NewDelivery) -> AppResult<Delivery> {
        delivery_repository::insert(self.txn, delivery).await
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: DeliveryStatus,
        actual_delivery_date: Option<DateTime<Utc>>,
    ) -> AppResult<Delivery> {
        delivery_repository::set_status(self.txn, id, status, actual_delivery_date).await
    }
}

pub struct TxReceivingRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxReceivingRepository<'_> {
    pub async fn find_for_update(&self, id: Uuid) -> AppResult<Option<Receiving>> {
        receiving_repository::find_for_update(self.txn, id).await
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ReceivingStatus,
        received_date: Option<DateTime<Utc>>,
    ) -> AppResult<Receiving> {
        receiving_repository::set_status(self.txn, id, status, received_date).await
    }
}

pub struct TxNotificationRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxNotificationRepository<'_> {
    pub async fn create(&self, notification: NewNotification) -> AppResult<Notification> {
        notification_repository::insert(self.txn, notification).await
    }
}

/// Run `$body` inside `$uow.transaction`, binding the context to `$ctx`.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
