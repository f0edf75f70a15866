//! OpenAPI documentation served through Swagger UI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    auth_handler, batch_handler, delivery_handler, exchange_handler, inventory_handler,
    notification_handler, product_handler, receiving_handler, report_handler, user_handler,
};
use crate::domain::{
    Availability, Batch, BatchConfig, BatchLogs, BatchStatus, BatchType, DashboardSummary,
    DataFormat, DataType, Delivery, DeliveryReportItem, DeliveryStatus, DeliveryTracking,
    ImportResult, ImportRowError, Inventory, InventoryMovement, InventoryReport,
    InventoryStatus, JobError, MovementReportItem, MovementType, Notification,
    NotificationStatus, NotificationType, Product, ProductCategory, ProductResponse,
    ProductSortField, ProductStatus, Receiving, ReceivingStatus, ReportPeriod, ReportResponse,
    SalesReportItem, SortDirection, StatusCount, StockChangeType, StockHistory, UserResponse,
    UserRole, UserStatus,
};
use crate::services::TokenResponse;
use crate::types::{MessageResponse, PaginationMeta};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tea Logistics API",
        version = "0.1.0",
        description = "Back office for a tea trading business: catalog, stock, shipping, receiving, batch jobs and reports",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        auth_handler::register,
        auth_handler::login,
        auth_handler::get_profile,
        auth_handler::update_profile,
        auth_handler::change_password,
        user_handler::list_users,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        user_handler::restore_user,
        product_handler::list_products,
        product_handler::create_product,
        product_handler::get_product,
        product_handler::update_product,
        product_handler::delete_product,
        product_handler::list_stock_history,
        product_handler::adjust_stock,
        inventory_handler::list_inventory,
        inventory_handler::create_inventory,
        inventory_handler::get_inventory,
        inventory_handler::update_inventory,
        inventory_handler::delete_inventory,
        inventory_handler::inventory_by_product,
        inventory_handler::inventory_by_location,
        inventory_handler::transfer_stock,
        inventory_handler::list_movements,
        inventory_handler::check_availability,
        inventory_handler::low_stock,
        delivery_handler::create_delivery,
        delivery_handler::list_deliveries,
        delivery_handler::get_delivery,
        delivery_handler::update_delivery,
        delivery_handler::update_delivery_status,
        delivery_handler::complete_delivery,
        delivery_handler::add_tracking,
        delivery_handler::list_tracking,
        receiving_handler::create_receiving,
        receiving_handler::list_receivings,
        receiving_handler::get_receiving,
        receiving_handler::update_receiving,
        receiving_handler::update_receiving_status,
        notification_handler::list_notifications,
        notification_handler::create_notification,
        notification_handler::get_notification,
        notification_handler::mark_read,
        notification_handler::mark_all_read,
        notification_handler::delete_notification,
        batch_handler::create_batch,
        batch_handler::list_batches,
        batch_handler::get_batch,
        batch_handler::batch_logs,
        batch_handler::delete_batch,
        batch_handler::execute_batch,
        batch_handler::cancel_batch,
        report_handler::generate_report,
        report_handler::dashboard,
        exchange_handler::export_data,
        exchange_handler::import_data,
    ),
    components(
        schemas(
            // Users and auth
            UserRole,
            UserStatus,
            UserResponse,
            TokenResponse,
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            auth_handler::UpdateProfileRequest,
            auth_handler::ChangePasswordRequest,
            user_handler::UpdateUserRequest,
            // Catalog and stock
            Product,
            ProductResponse,
            ProductCategory,
            ProductStatus,
            ProductSortField,
            SortDirection,
            StockHistory,
            StockChangeType,
            Inventory,
            InventoryStatus,
            InventoryMovement,
            MovementType,
            Availability,
            product_handler::CreateProductRequest,
            product_handler::UpdateProductRequest,
            product_handler::AdjustStockRequest,
            inventory_handler::CreateInventoryRequest,
            inventory_handler::UpdateInventoryRequest,
            inventory_handler::TransferRequest,
            // Shipping and receiving
            Delivery,
            DeliveryStatus,
            DeliveryTracking,
            Receiving,
            ReceivingStatus,
            delivery_handler::CreateDeliveryRequest,
            delivery_handler::UpdateDeliveryRequest,
            delivery_handler::DeliveryStatusRequest,
            delivery_handler::TrackingRequest,
            receiving_handler::CreateReceivingRequest,
            receiving_handler::UpdateReceivingRequest,
            receiving_handler::ReceivingStatusRequest,
            // Notifications
            Notification,
            NotificationType,
            NotificationStatus,
            notification_handler::CreateNotificationRequest,
            notification_handler::MarkAllReadResponse,
            // Batches
            Batch,
            BatchType,
            BatchStatus,
            BatchConfig,
            BatchLogs,
            JobError,
            // Reports
            ReportPeriod,
            ReportResponse,
            SalesReportItem,
            InventoryReport,
            MovementReportItem,
            DeliveryReportItem,
            DashboardSummary,
            StatusCount,
            // Export and import
            DataType,
            DataFormat,
            ImportResult,
            ImportRowError,
            exchange_handler::ExportRequest,
            // Shared
            MessageResponse,
            PaginationMeta,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and the caller's profile"),
        (name = "Users", description = "Account administration"),
        (name = "Products", description = "Tea catalog and stock history"),
        (name = "Inventory", description = "Stock per location, transfers and availability"),
        (name = "Deliveries", description = "Outbound shipping and tracking"),
        (name = "Receivings", description = "Inbound goods from suppliers"),
        (name = "Notifications", description = "Per-user inbox"),
        (name = "Batches", description = "Scheduled and on-demand background jobs"),
        (name = "Reports", description = "Sales, inventory and delivery reports"),
        (name = "Data Exchange", description = "CSV and JSON export and import")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}
