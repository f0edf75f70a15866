//! Unit of Work backed by repository mocks, for service unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Delivery, DeliveryStatus, Inventory, InventoryStatus, Product, ProductCategory,
    ProductStatus, User, UserRole, UserStatus,
};
use crate::errors::{AppError, AppResult};
use crate::infra::repositories::{
    MockBatchRepository, MockDeliveryRepository, MockInventoryRepository,
    MockNotificationRepository, MockProductRepository, MockReceivingRepository,
    MockStockHistoryRepository, MockUserRepository,
};
use crate::infra::{
    BatchRepository, DeliveryRepository, InventoryRepository, NotificationRepository,
    ProductRepository, ReceivingRepository, StockHistoryRepository, TransactionContext,
    UnitOfWork, UserRepository,
};

/// Each repository is optional; touching one that was not supplied panics
/// with its name, which makes an unexpected call obvious in test output.
#[derive(Default)]
pub(crate) struct TestUnitOfWork {
    pub users: Option<Arc<MockUserRepository>>,
    pub products: Option<Arc<MockProductRepository>>,
    pub inventory: Option<Arc<MockInventoryRepository>>,
    pub stock_history: Option<Arc<MockStockHistoryRepository>>,
    pub deliveries: Option<Arc<MockDeliveryRepository>>,
    pub receivings: Option<Arc<MockReceivingRepository>>,
    pub notifications: Option<Arc<MockNotificationRepository>>,
    pub batches: Option<Arc<MockBatchRepository>>,
}

impl TestUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(mut self, repo: MockUserRepository) -> Self {
        self.users = Some(Arc::new(repo));
        self
    }

    pub fn with_products(mut self, repo: MockProductRepository) -> Self {
        self.products = Some(Arc::new(repo));
        self
    }

    pub fn with_inventory(mut self, repo: MockInventoryRepository) -> Self {
        self.inventory = Some(Arc::new(repo));
        self
    }

    pub fn with_stock_history(mut self, repo: MockStockHistoryRepository) -> Self {
        self.stock_history = Some(Arc::new(repo));
        self
    }

    pub fn with_deliveries(mut self, repo: MockDeliveryRepository) -> Self {
        self.deliveries = Some(Arc::new(repo));
        self
    }

    pub fn with_receivings(mut self, repo: MockReceivingRepository) -> Self {
        self.receivings = Some(Arc::new(repo));
        self
    }

    pub fn with_notifications(mut self, repo: MockNotificationRepository) -> Self {
        self.notifications = Some(Arc::new(repo));
        self
    }

    pub fn with_batches(mut self, repo: MockBatchRepository) -> Self {
        self.batches = Some(Arc::new(repo));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn take<T>(repo: &Option<Arc<T>>, name: &str) -> Arc<T> {
    repo.clone()
        .unwrap_or_else(|| panic!("{} repository not configured for this test", name))
}

#[async_trait]
impl UnitOfWork for TestUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        take::<MockUserRepository>(&self.users, "user")
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        take::<MockProductRepository>(&self.products, "product")
    }

    fn inventory(&self) -> Arc<dyn InventoryRepository> {
        take::<MockInventoryRepository>(&self.inventory, "inventory")
    }

    fn stock_history(&self) -> Arc<dyn StockHistoryRepository> {
        take::<MockStockHistoryRepository>(&self.stock_history, "stock history")
    }

    fn deliveries(&self) -> Arc<dyn DeliveryRepository> {
        take::<MockDeliveryRepository>(&self.deliveries, "delivery")
    }

    fn receivings(&self) -> Arc<dyn ReceivingRepository> {
        take::<MockReceivingRepository>(&self.receivings, "receiving")
    }

    fn notifications(&self) -> Arc<dyn NotificationRepository> {
        take::<MockNotificationRepository>(&self.notifications, "notification")
    }

    fn batches(&self) -> Arc<dyn BatchRepository> {
        take::<MockBatchRepository>(&self.batches, "batch")
    }

    async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        // Transaction not supported in test mock
        Err(AppError::internal("Transactions not supported in test mock"))
    }
}

pub(crate) fn user(role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: format!("{}@tea-logistics.local", role),
        password_hash: String::new(),
        name: "Test User".into(),
        role,
        status: UserStatus::Active,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

pub(crate) fn product(id: Uuid, sku: &str, price: f64) -> Product {
    let now = Utc::now();
    Product {
        id,
        sku: sku.into(),
        name: "Sencha".into(),
        description: None,
        category: ProductCategory::GreenTea,
        price,
        unit: "kg".into(),
        status: ProductStatus::Active,
        image_url: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

pub(crate) fn inventory(product_id: Uuid, location: &str, quantity: i32) -> Inventory {
    let now = Utc::now();
    Inventory {
        id: Uuid::new_v4(),
        product_id,
        location: location.into(),
        quantity,
        status: InventoryStatus::for_new_row(quantity),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn delivery(status: DeliveryStatus) -> Delivery {
    let now = Utc::now();
    Delivery {
        id: Uuid::new_v4(),
        order_number: "ORD-2024-0001".into(),
        product_id: Uuid::new_v4(),
        quantity: 5,
        from_location: "WH-TOKYO-A1".into(),
        customer_name: "Kissa Cafe".into(),
        customer_address: "1-2-3 Shibuya".into(),
        customer_phone: "+81 3-1234-5678".into(),
        status,
        estimated_delivery_date: None,
        actual_delivery_date: None,
        note: None,
        stock_reserved: true,
        created_by: None,
        created_at: now,
        updated_at: now,
    }
}
