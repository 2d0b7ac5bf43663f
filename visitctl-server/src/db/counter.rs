//! Visit counter repository
//!
//! The whole domain is one row keyed by [`GLOBAL_COUNTER_ID`]:
//! - increment: single INSERT ... ON CONFLICT statement, then a read of the row
//! - read: point lookup, `RowMissing` until the first increment

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

use super::{DbPool, StoreError};

/// Id of the single counter row.
pub const GLOBAL_COUNTER_ID: i32 = 1;

/// Insert the row with a count of 1, or bump the existing count.
///
/// The conflicting-insert case is serialized by Postgres on the primary key,
/// so concurrent callers never lose an update.
const UPSERT_COUNTER: &str = r#"
    INSERT INTO estatisticas_portfolio_global (id, contador_total, ultima_atualizacao)
    VALUES ($1, 1, NOW())
    ON CONFLICT (id) DO UPDATE
    SET contador_total = estatisticas_portfolio_global.contador_total + 1,
        ultima_atualizacao = NOW()
"#;

const SELECT_COUNTER: &str = r#"
    SELECT id, contador_total, ultima_atualizacao
    FROM estatisticas_portfolio_global
    WHERE id = $1
"#;

/// The global visit counter row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVisitCounter {
    pub id: i32,
    pub total_count: u64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct CounterRow {
    id: i32,
    contador_total: i64,
    ultima_atualizacao: DateTime<Utc>,
}

impl From<CounterRow> for GlobalVisitCounter {
    fn from(row: CounterRow) -> Self {
        Self {
            id: row.id,
            // The column carries CHECK (contador_total >= 0).
            total_count: u64::try_from(row.contador_total).unwrap_or_default(),
            last_updated: row.ultima_atualizacao,
        }
    }
}

/// Counter repository
pub struct CounterRepo<'a> {
    pool: &'a DbPool,
}

impl<'a> CounterRepo<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Record one visit and return the updated row.
    pub async fn increment(&self) -> Result<GlobalVisitCounter, StoreError> {
        self.increment_in(None).await
    }

    /// [`increment`](Self::increment) on a connection the caller already holds.
    pub async fn increment_on(
        &self,
        conn: &mut PgConnection,
    ) -> Result<GlobalVisitCounter, StoreError> {
        self.increment_in(Some(conn)).await
    }

    /// Current state of the counter.
    ///
    /// Returns [`StoreError::RowMissing`] if no visit was ever recorded.
    pub async fn read(&self) -> Result<GlobalVisitCounter, StoreError> {
        self.read_in(None).await
    }

    /// [`read`](Self::read) on a connection the caller already holds.
    pub async fn read_on(&self, conn: &mut PgConnection) -> Result<GlobalVisitCounter, StoreError> {
        self.read_in(Some(conn)).await
    }

    async fn increment_in(
        &self,
        existing: Option<&mut PgConnection>,
    ) -> Result<GlobalVisitCounter, StoreError> {
        let mut conn = self.pool.scope(existing).await?;

        sqlx::query(UPSERT_COUNTER)
            .bind(GLOBAL_COUNTER_ID)
            .execute(&mut *conn)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "counter upsert failed"))?;

        let counter = fetch(&mut conn).await?.ok_or_else(|| {
            tracing::error!(id = GLOBAL_COUNTER_ID, "counter row missing right after upsert");
            StoreError::RowMissing {
                id: GLOBAL_COUNTER_ID,
            }
        })?;

        tracing::debug!(total = counter.total_count, "visit recorded");
        Ok(counter)
    }

    async fn read_in(
        &self,
        existing: Option<&mut PgConnection>,
    ) -> Result<GlobalVisitCounter, StoreError> {
        let mut conn = self.pool.scope(existing).await?;

        let counter = fetch(&mut conn).await?.ok_or_else(|| {
            tracing::warn!(id = GLOBAL_COUNTER_ID, "no visit recorded yet");
            StoreError::RowMissing {
                id: GLOBAL_COUNTER_ID,
            }
        })?;

        Ok(counter)
    }
}

async fn fetch(conn: &mut PgConnection) -> Result<Option<GlobalVisitCounter>, StoreError> {
    let row = sqlx::query_as::<_, CounterRow>(SELECT_COUNTER)
        .bind(GLOBAL_COUNTER_ID)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(GlobalVisitCounter::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn row_converts_to_counter() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let counter = GlobalVisitCounter::from(CounterRow {
            id: GLOBAL_COUNTER_ID,
            contador_total: 42,
            ultima_atualizacao: at,
        });
        assert_eq!(counter.id, 1);
        assert_eq!(counter.total_count, 42);
        assert_eq!(counter.last_updated, at);
    }

    #[test]
    fn upsert_is_a_single_statement() {
        assert_eq!(UPSERT_COUNTER.matches(';').count(), 0);
        assert!(UPSERT_COUNTER.contains("ON CONFLICT (id) DO UPDATE"));
    }
}
