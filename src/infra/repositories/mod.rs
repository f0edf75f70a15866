//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

mod base;
mod batch_repository;
pub(crate) mod delivery_repository;
pub(crate) mod entities;
pub(crate) mod inventory_repository;
pub(crate) mod notification_repository;
mod product_repository;
pub(crate) mod receiving_repository;
pub(crate) mod stock_history_repository;
mod user_repository;

pub use batch_repository::{BatchRepository, BatchStore};
pub use delivery_repository::{DeliveryRepository, DeliveryStore};
pub use inventory_repository::{InventoryRepository, InventoryStore};
pub use notification_repository::{NotificationRepository, NotificationStore};
pub use product_repository::{ProductRepository, ProductStore};
pub use receiving_repository::{ReceivingRepository, ReceivingStore};
pub use stock_history_repository::{StockHistoryRepository, StockHistoryStore};
pub use user_repository::{UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use batch_repository::MockBatchRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use delivery_repository::MockDeliveryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use inventory_repository::MockInventoryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use notification_repository::MockNotificationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use product_repository::MockProductRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use receiving_repository::MockReceivingRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use stock_history_repository::MockStockHistoryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
