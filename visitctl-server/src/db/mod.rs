//! Database layer - connection pool and the counter repository
//!
//! # Design Principles
//!
//! - Pool is an owned object passed by reference, never a global
//! - Connections are released on drop, on every exit path
//! - Increment is one upsert statement - no read-modify-write
//! - All sqlx errors become `StoreError` at this boundary

pub mod counter;
pub mod error;
pub mod migrations;
pub mod pool;

pub use counter::{CounterRepo, GlobalVisitCounter, GLOBAL_COUNTER_ID};
pub use error::StoreError;
pub use pool::{ConnScope, DbPool, PoolStats, PooledConnection};
