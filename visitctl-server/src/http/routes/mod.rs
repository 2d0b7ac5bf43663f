//! Route handlers organized by resource

use axum::http::{Method, Uri};

use super::error::ApiError;

pub mod health;
pub mod root;
pub mod visits;

/// Fallback for unmatched routes
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    tracing::debug!(%method, %uri, "no route matched");
    ApiError::RouteNotFound {
        method,
        url: uri.to_string(),
    }
}
