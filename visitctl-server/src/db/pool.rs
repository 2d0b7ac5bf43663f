//! Database connection pool management
//!
//! Wraps a sqlx `PgPool` with explicit connection limits, a wait/fail-fast
//! policy and lease accounting. A lent connection goes back to the pool when
//! its [`PooledConnection`] is dropped, so every exit path releases it,
//! including a cancelled request future.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgConnection, PgPool, Postgres};

use super::StoreError;
use crate::config::{ConfigError, DbConfig, WaitPolicy};

#[derive(Debug, Default)]
struct LeaseCounters {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Open connections, idle or lent out.
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
    /// Handles handed out since the pool was created.
    pub acquired: u64,
    /// Handles returned since the pool was created.
    pub released: u64,
}

impl PoolStats {
    /// Handles currently lent out.
    pub fn in_use(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Bounded PostgreSQL connection pool.
///
/// Cheap to clone; clones share the same connections and counters.
#[derive(Debug, Clone)]
pub struct DbPool {
    pool: PgPool,
    wait_policy: WaitPolicy,
    max_connections: u32,
    leases: Arc<LeaseCounters>,
}

impl DbPool {
    /// Create the pool and open its first connection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] before touching the network if the
    /// config is incomplete, or a store error if the connection fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let pool = DbPool::connect(&DbConfig::from_env()?).await?;
    /// pool.health_check().await?;
    /// ```
    pub async fn connect(config: &DbConfig) -> crate::Result<Self> {
        config.validate()?;

        let pool = pool_options(config)
            .connect_with(connect_options(config))
            .await
            .map_err(StoreError::from)?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "database pool ready"
        );
        Ok(Self::from_parts(pool, config))
    }

    /// Create the pool without opening any connection.
    pub fn connect_lazy(config: &DbConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = pool_options(config).connect_lazy_with(connect_options(config));
        Ok(Self::from_parts(pool, config))
    }

    fn from_parts(pool: PgPool, config: &DbConfig) -> Self {
        Self {
            pool,
            wait_policy: config.wait_policy,
            max_connections: config.max_connections,
            leases: Arc::new(LeaseCounters::default()),
        }
    }

    /// Borrow a connection.
    ///
    /// With [`WaitPolicy::Wait`] a full pool queues the caller until the
    /// connect timeout, then fails with [`StoreError::ConnectTimeout`]. With
    /// [`WaitPolicy::FailFast`] a full pool fails with
    /// [`StoreError::PoolExhausted`] straight away.
    pub async fn acquire(&self) -> Result<PooledConnection, StoreError> {
        let conn = match self.wait_policy {
            WaitPolicy::Wait => self.pool.acquire().await?,
            WaitPolicy::FailFast => match self.pool.try_acquire() {
                Some(conn) => conn,
                // Room to open a new connection; only a full pool fails fast.
                None if self.pool.size() < self.max_connections => self.pool.acquire().await?,
                None => {
                    tracing::warn!(max_connections = self.max_connections, "connection pool exhausted");
                    return Err(StoreError::PoolExhausted);
                }
            },
        };

        self.leases.acquired.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("connection acquired");
        Ok(PooledConnection {
            conn,
            leases: Arc::clone(&self.leases),
        })
    }

    /// Return a connection to the pool.
    ///
    /// Takes the handle by value, so a handle cannot be released twice.
    /// Dropping the handle has the same effect.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Borrow the caller's connection, or acquire one from the pool.
    ///
    /// A pooled scope is released when it is dropped; a borrowed one is left
    /// with its owner.
    pub async fn scope<'c>(
        &self,
        existing: Option<&'c mut PgConnection>,
    ) -> Result<ConnScope<'c>, StoreError> {
        match existing {
            Some(conn) => Ok(ConnScope::Borrowed(conn)),
            None => self.acquire().await.map(ConnScope::Pooled),
        }
    }

    /// Acquire a connection, run `SELECT 1`, release it.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        tracing::debug!("database health check passed");
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max_connections: self.max_connections,
            acquired: self.leases.acquired.load(Ordering::Relaxed),
            released: self.leases.released.load(Ordering::Relaxed),
        }
    }

    /// Close every connection. Pending and later acquires fail.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn pool_options(config: &DbConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
}

fn connect_options(config: &DbConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.database);

    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(schema) = &config.schema {
        options = options.options([("search_path", schema.as_str())]);
    }
    options
}

/// A connection lent out by [`DbPool`].
#[derive(Debug)]
pub struct PooledConnection {
    conn: PoolConnection<Postgres>,
    leases: Arc<LeaseCounters>,
}

impl Deref for PooledConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &*self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut *self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.leases.released.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("connection released");
    }
}

/// Connection used for the duration of one store operation.
#[derive(Debug)]
pub enum ConnScope<'c> {
    /// Held by the caller; not released here.
    Borrowed(&'c mut PgConnection),
    /// Acquired for this operation; released on drop.
    Pooled(PooledConnection),
}

impl ConnScope<'_> {
    pub fn is_pooled(&self) -> bool {
        matches!(self, Self::Pooled(_))
    }
}

impl Deref for ConnScope<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Self::Borrowed(conn) => &**conn,
            Self::Pooled(conn) => &**conn,
        }
    }
}

impl DerefMut for ConnScope<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Self::Borrowed(conn) => &mut **conn,
            Self::Pooled(conn) => &mut **conn,
        }
    }
}
