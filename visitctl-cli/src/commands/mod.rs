//! Command implementations for visitctl CLI

pub mod check;
pub mod migrate;
pub mod serve;
pub mod stats;

// Re-export main dispatcher functions for flat access from main.rs
pub use check::run_check;
pub use migrate::run_migrate;
pub use serve::run_serve;
pub use stats::run_stats;

use anyhow::{Context, Result};
use visitctl_server::{DbConfig, DbPool};

/// Load store settings from the environment and open the pool.
pub(crate) async fn connect_from_env() -> Result<DbPool> {
    let config = DbConfig::from_env()
        .context("Database configuration incomplete. Set DB_HOST, DB_USER and DB_DATABASE")?;
    tracing::debug!(?config, "database configuration loaded");

    DbPool::connect(&config)
        .await
        .context("Failed to create database pool")
}
