//! Infrastructure layer - External systems integration
//!
//! - PostgreSQL connection, migrations and repositories
//! - Redis cache, rate limiting and distributed locks
//! - Unit of Work for transaction management

pub mod cache;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, LockGuard, RateLimitStatus};
pub use db::{Database, Migrator};
pub use repositories::{
    BatchRepository, BatchStore, DeliveryRepository, DeliveryStore, InventoryRepository,
    InventoryStore, NotificationRepository, NotificationStore, ProductRepository, ProductStore,
    ReceivingRepository, ReceivingStore, StockHistoryRepository, StockHistoryStore,
    UserRepository, UserStore,
};
pub use unit_of_work::{Persistence, TransactionContext, UnitOfWork};
