//! Shared request/response types used across handlers and services.

mod pagination;
mod response;

pub use pagination::{DateRange, Paginated, PaginationMeta, PaginationParams};
pub use response::{Created, MessageResponse, NoContent};
