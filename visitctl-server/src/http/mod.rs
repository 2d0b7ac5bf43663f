//! HTTP server layer
//!
//! Axum server with:
//! - POST /api/track-visit and GET /api/statistics over the counter store
//! - CORS (any origin unless configured)
//! - Request tracing
//! - Graceful shutdown
//! - JSON error responses

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerConfig};
