//! visitctl-server: global visit counter for a portfolio site
//!
//! One Postgres row counts every visit. `POST /api/track-visit` increments it
//! with a single atomic upsert, `GET /api/statistics` reads it.

pub mod config;
pub mod db;
pub mod error;
pub mod http;

pub use config::{ConfigError, DbConfig, WaitPolicy};
pub use db::{CounterRepo, DbPool, GlobalVisitCounter, StoreError};
pub use error::{Error, Result};
pub use http::{run_server, ServerConfig};
