//! Domain layer - core business entities and rules.
//!
//! Everything here is free of I/O: status machines, stock arithmetic,
//! schedule parsing and report aggregation are plain functions over
//! plain types, so the services only orchestrate.

/// Declares a closed set of string-valued states.
///
/// Generates serde and OpenAPI support, `as_str`, `Display`, `FromStr`
/// (rejecting unknown values with a validation error) and `ALL`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize, utoipa::ToSchema,
        )]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $value)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::errors::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(crate::errors::AppError::validation(format!(
                        "Invalid {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        [$($value),+].join(", ")
                    ))),
                }
            }
        }
    };
}

pub mod batch;
pub mod delivery;
pub mod exchange;
pub mod inventory;
pub mod notification;
pub mod password;
pub mod product;
pub mod receiving;
pub mod report;
pub mod schedule;
pub mod user;

pub use batch::{
    Batch, BatchConfig, BatchFilter, BatchLogs, BatchOutcome, BatchStatus, BatchType,
    ConfigViolation, JobError,
};
pub use delivery::{
    Delivery, DeliveryChanges, DeliveryFilter, DeliveryStatus, DeliveryTracking, NewDelivery,
    NewTracking,
};
pub use exchange::{
    DataFormat, DataType, DeliveryRow, ExportFile, ExportOptions, ImportOptions, ImportResult,
    ImportRowError, InventoryRow, ProductRow,
};
pub use inventory::{
    Availability, Inventory, InventoryChanges, InventoryFilter, InventoryMovement,
    InventoryStatus, MovementType, NewInventory, NewMovement, NewStockHistory, StockAdjustment,
    StockChangeType, StockHistory, Transfer,
};
pub use notification::{NewNotification, Notification, NotificationStatus, NotificationType};
pub use password::Password;
pub use product::{
    NewProduct, Product, ProductCategory, ProductChanges, ProductFilter, ProductResponse,
    ProductSortField, ProductStatus, SortDirection,
};
pub use receiving::{NewReceiving, Receiving, ReceivingChanges, ReceivingFilter, ReceivingStatus};
pub use report::{
    DashboardSummary, DeliveryReportItem, InventoryReport, MovementReportItem, ReportPeriod,
    ReportResponse, SalesReportItem, StatusCount,
};
pub use schedule::CronSchedule;
pub use user::{NewUser, User, UserChanges, UserResponse, UserRole, UserStatus};
