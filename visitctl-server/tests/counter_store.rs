//! Counter store integration tests
//!
//! Each test runs in its own freshly created schema.
//! Run with: DB_HOST=... DB_USER=... DB_DATABASE=... cargo test -p visitctl-server -- --ignored

use std::time::Duration;

use uuid::Uuid;
use visitctl_server::db::migrations;
use visitctl_server::{CounterRepo, DbConfig, DbPool, StoreError};

struct TestStore {
    pool: DbPool,
    base: DbConfig,
    schema: String,
}

impl TestStore {
    /// Empty schema, counter table created.
    async fn migrated(max_connections: u32) -> Self {
        let store = Self::bare(max_connections).await;
        migrations::run(&store.pool).await.expect("migration failed");
        store
    }

    /// Empty schema, no tables.
    async fn bare(max_connections: u32) -> Self {
        let base = DbConfig::from_env().expect("DB_HOST, DB_USER and DB_DATABASE required");
        let schema = format!("visitctl_test_{}", Uuid::new_v4().simple());

        let admin = DbPool::connect(&base).await.expect("pool creation failed");
        let mut conn = admin.acquire().await.expect("acquire failed");
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&mut *conn)
            .await
            .expect("create schema failed");
        admin.release(conn);
        admin.close().await;

        let mut config = base.clone();
        config.schema = Some(schema.clone());
        config.max_connections = max_connections;
        config.connect_timeout = Duration::from_secs(5);
        let pool = DbPool::connect(&config).await.expect("pool creation failed");

        Self { pool, base, schema }
    }

    fn repo(&self) -> CounterRepo<'_> {
        CounterRepo::new(&self.pool)
    }

    async fn teardown(self) {
        self.pool.close().await;
        let admin = DbPool::connect(&self.base).await.expect("pool creation failed");
        let mut conn = admin.acquire().await.expect("acquire failed");
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&mut *conn)
            .await
            .expect("drop schema failed");
        admin.release(conn);
        admin.close().await;
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn read_before_any_visit_is_row_missing() {
    let store = TestStore::migrated(2).await;

    let err = store.repo().read().await.unwrap_err();
    assert!(matches!(err, StoreError::RowMissing { id: 1 }));

    store.teardown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn first_increment_creates_the_row() {
    let store = TestStore::migrated(2).await;

    let created = store.repo().increment().await.expect("increment failed");
    assert_eq!(created.id, 1);
    assert_eq!(created.total_count, 1);

    let read = store.repo().read().await.expect("read failed");
    assert_eq!(read, created);

    store.teardown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn sequential_increments_count_up() {
    let store = TestStore::migrated(2).await;

    let first = store.repo().increment().await.expect("first increment");
    let second = store.repo().increment().await.expect("second increment");

    assert_eq!(first.total_count, 1);
    assert_eq!(second.total_count, 2);
    assert!(second.last_updated >= first.last_updated);

    store.teardown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn concurrent_increments_lose_nothing() {
    const TASKS: u64 = 200;
    let store = TestStore::migrated(10).await;
    let start = store.repo().increment().await.expect("seed increment").total_count;

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let pool = store.pool.clone();
            tokio::spawn(async move { CounterRepo::new(&pool).increment().await })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task panicked").expect("increment failed");
    }

    let end = store.repo().read().await.expect("read failed");
    assert_eq!(end.total_count, start + TASKS);
    assert_eq!(store.pool.stats().in_use(), 0);

    store.teardown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn failed_operations_release_their_connection() {
    const FAILURES: usize = 25;
    let store = TestStore::migrated(2).await;
    let before = store.pool.stats();

    for _ in 0..FAILURES {
        let err = store.repo().read().await.unwrap_err();
        assert!(matches!(err, StoreError::RowMissing { .. }));
    }

    let after = store.pool.stats();
    assert_eq!(after.acquired - before.acquired, FAILURES as u64);
    assert_eq!(after.released - before.released, FAILURES as u64);
    assert_eq!(after.in_use(), 0);

    // With only two connections, any leak would starve this call.
    store.pool.health_check().await.expect("pool starved");

    store.teardown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn query_failures_are_store_unavailable_and_release() {
    // No migration: the counter table does not exist.
    let store = TestStore::bare(1).await;

    for _ in 0..5 {
        let err = store.repo().increment().await.unwrap_err();
        assert!(matches!(err, StoreError::StoreUnavailable(_)));
    }
    assert_eq!(store.pool.stats().in_use(), 0);

    store.teardown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn caller_held_connection_is_used_and_kept() {
    let store = TestStore::migrated(2).await;
    let mut conn = store.pool.acquire().await.expect("acquire failed");
    let before = store.pool.stats();

    let repo = store.repo();
    repo.increment_on(&mut conn).await.expect("first increment");
    let second = repo.increment_on(&mut conn).await.expect("second increment");
    let read = repo.read_on(&mut conn).await.expect("read failed");
    assert_eq!(second.total_count, 2);
    assert_eq!(read.total_count, 2);

    // Nothing else was taken from the pool, and the caller still holds its handle.
    let after = store.pool.stats();
    assert_eq!(after.acquired, before.acquired);
    assert_eq!(after.in_use(), 1);

    store.pool.release(conn);
    assert_eq!(store.pool.stats().in_use(), 0);

    store.teardown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn cancelled_increment_releases_connection() {
    let store = TestStore::migrated(1).await;

    for _ in 0..10 {
        let _ = tokio::time::timeout(Duration::ZERO, store.repo().increment()).await;
    }
    assert_eq!(store.pool.stats().in_use(), 0);

    // The single connection is usable again.
    store.repo().increment().await.expect("increment after cancellation");

    store.teardown().await;
}
