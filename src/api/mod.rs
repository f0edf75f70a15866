//! API layer - HTTP handlers and middleware
//!
//! - Request handlers, one module per resource
//! - Middleware (JWT authentication, role guards, rate limiting)
//! - Validating extractors
//! - Route definitions and the OpenAPI document

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
