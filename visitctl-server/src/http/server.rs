//! Axum server setup
//!
//! Server skeleton with:
//! - Configurable CORS origin (any origin by default)
//! - Tracing middleware
//! - JSON 404 fallback
//! - Graceful shutdown, then pool close

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::routes;
use crate::config::ConfigError;
use crate::db::{DbPool, StoreError};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 7099;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:7099)
    pub bind_addr: SocketAddr,

    /// Allowed CORS origin; `None` or `*` allows any origin.
    pub cors_origin: Option<String>,

    /// Put error text in `detalhes` (default: true).
    ///
    /// Turn off in production so driver errors never reach clients.
    pub expose_error_details: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            cors_origin: None,
            expose_error_details: true,
        }
    }
}

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub expose_error_details: bool,
}

impl AppState {
    /// Wrap a store failure for the response, honouring the details setting.
    pub fn store_error(&self, operation: &'static str, source: StoreError) -> ApiError {
        ApiError::Store {
            operation,
            source,
            expose_details: self.expose_error_details,
        }
    }
}

/// Build the application router with all routes.
///
/// Fails if the CORS origin is not a valid header value.
pub fn build_router(pool: DbPool, config: &ServerConfig) -> Result<Router, ConfigError> {
    let cors = cors_layer(config.cors_origin.as_deref())?;
    let state = AppState {
        pool,
        expose_error_details: config.expose_error_details,
    };

    Ok(Router::new()
        .merge(routes::root::router())
        .merge(routes::health::router())
        .merge(routes::visits::router())
        .fallback(routes::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state)))
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origin.map(str::trim) {
        None | Some("") | Some("*") => Ok(layer.allow_origin(Any)),
        Some(origin) => {
            let value = HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGIN",
                reason: e.to_string(),
            })?;
            Ok(layer.allow_origin(value))
        }
    }
}

/// Run the HTTP server.
///
/// Closes the pool once the server has shut down.
///
/// # Example
///
/// ```ignore
/// let pool = DbPool::connect(&DbConfig::from_env()?).await?;
/// run_server(pool, ServerConfig::default()).await?;
/// ```
pub async fn run_server(pool: DbPool, config: ServerConfig) -> crate::Result<()> {
    if config.cors_origin.as_deref().map_or(true, |o| o.trim() == "*") {
        tracing::warn!("CORS: all origins allowed");
    }
    let app = build_router(pool.clone(), &config)?;

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
