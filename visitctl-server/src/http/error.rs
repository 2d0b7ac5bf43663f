//! API error types with IntoResponse
//!
//! Store failures become `{ "erro", "detalhes" }` envelopes. The full error is
//! always logged; `detalhes` carries its text only when details are exposed
//! (non-production).

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::StoreError;

/// `detalhes` value when error details are hidden.
pub const GENERIC_DETAILS: &str = "an unexpected problem occurred";

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Counter store failure (503 when transient, otherwise 500)
    Store {
        operation: &'static str,
        source: StoreError,
        expose_details: bool,
    },

    /// No route matched (404)
    RouteNotFound { method: Method, url: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store { source, .. } if source.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Store {
                operation,
                source,
                expose_details,
            } => {
                tracing::error!(operation, error = %source, "counter store failure");

                let erro = match &source {
                    StoreError::RowMissing { .. } => "visit counter has not been initialized",
                    StoreError::PoolExhausted | StoreError::ConnectTimeout => {
                        "database is busy, try again later"
                    }
                    StoreError::StoreUnavailable(_) => "database communication error",
                };
                let detalhes = if expose_details {
                    source.to_string()
                } else {
                    GENERIC_DETAILS.to_string()
                };
                json!({ "erro": erro, "detalhes": detalhes })
            }
            Self::RouteNotFound { method, url } => json!({
                "error": "route not found",
                "method": method.as_str(),
                "url": url
            }),
        };

        (status, Json(body)).into_response()
    }
}
