//! Application state - every service plus the infrastructure the health
//! check and rate limiter talk to directly.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Cache, Database};
use crate::services::{
    AuthService, BatchService, DeliveryService, ExchangeService, InventoryService,
    NotificationService, ProductService, ReceivingService, ReportService, ServiceContainer,
    Services, UserService,
};

/// Application state shared by all handlers.
///
/// `cache` and `database` are optional so the router can be driven with
/// mocked services only; without a cache requests are not rate limited.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub product_service: Arc<dyn ProductService>,
    pub inventory_service: Arc<dyn InventoryService>,
    pub delivery_service: Arc<dyn DeliveryService>,
    pub receiving_service: Arc<dyn ReceivingService>,
    pub notification_service: Arc<dyn NotificationService>,
    pub batch_service: Arc<dyn BatchService>,
    pub report_service: Arc<dyn ReportService>,
    pub exchange_service: Arc<dyn ExchangeService>,
    pub cache: Option<Arc<Cache>>,
    pub database: Option<Arc<Database>>,
    pub cors_allowed_origin: Option<String>,
}

impl AppState {
    /// Build the production state: every service over one connection
    /// sharing the redis cache.
    pub fn from_config(database: Arc<Database>, cache: Arc<Cache>, config: Config) -> Self {
        let cors_allowed_origin = config.cors_allowed_origin.clone();
        let services = Services::from_connection(
            database.get_connection(),
            Some(cache.clone()),
            config,
        );

        Self {
            cors_allowed_origin,
            ..Self::from_services(&services, Some(cache), Some(database))
        }
    }

    /// Build state from any service container
    pub fn from_services(
        services: &dyn ServiceContainer,
        cache: Option<Arc<Cache>>,
        database: Option<Arc<Database>>,
    ) -> Self {
        Self {
            auth_service: services.auth(),
            user_service: services.users(),
            product_service: services.products(),
            inventory_service: services.inventory(),
            delivery_service: services.deliveries(),
            receiving_service: services.receivings(),
            notification_service: services.notifications(),
            batch_service: services.batches(),
            report_service: services.reports(),
            exchange_service: services.exchange(),
            cache,
            database,
            cors_allowed_origin: None,
        }
    }
}
