//! HTTP request handlers, one module per resource.

pub mod auth_handler;
pub mod batch_handler;
pub mod delivery_handler;
pub mod exchange_handler;
pub mod inventory_handler;
pub mod notification_handler;
pub mod product_handler;
pub mod receiving_handler;
pub mod report_handler;
pub mod user_handler;

pub use auth_handler::{auth_routes, profile_routes};
pub use batch_handler::batch_routes;
pub use delivery_handler::delivery_routes;
pub use exchange_handler::exchange_routes;
pub use inventory_handler::inventory_routes;
pub use notification_handler::notification_routes;
pub use product_handler::product_routes;
pub use receiving_handler::receiving_routes;
pub use report_handler::report_routes;
pub use user_handler::user_routes;
