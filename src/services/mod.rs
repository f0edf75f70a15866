//! Application services layer - use cases and business rules.
//!
//! Each service is a trait with a `*Manager` (or `Authenticator`)
//! implementation over the unit of work. Multi-step stock mutations go
//! through `stock::apply_change` inside a transaction.

mod auth_service;
mod batch_service;
pub mod container;
mod delivery_service;
mod exchange_service;
mod inventory_service;
mod notification_service;
mod product_service;
mod receiving_service;
mod report_service;
pub(crate) mod stock;
mod user_service;

#[cfg(test)]
pub(crate) mod test_support;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use batch_service::{BatchManager, BatchService};
pub use delivery_service::{DeliveryManager, DeliveryService};
pub use exchange_service::{ExchangeManager, ExchangeService};
pub use inventory_service::{InventoryManager, InventoryService};
pub use notification_service::{NotificationManager, NotificationService};
pub use product_service::{ProductManager, ProductService};
pub use receiving_service::{ReceivingManager, ReceivingService};
pub use report_service::{ReportManager, ReportService};
pub use user_service::{UserManager, UserService};

// Parallel execution utilities
pub use container::parallel;

#[cfg(any(test, feature = "test-utils"))]
pub use {
    auth_service::MockAuthService, batch_service::MockBatchService,
    container::MockServiceContainer, delivery_service::MockDeliveryService,
    exchange_service::MockExchangeService, inventory_service::MockInventoryService,
    notification_service::MockNotificationService, product_service::MockProductService,
    receiving_service::MockReceivingService, report_service::MockReportService,
    user_service::MockUserService,
};
