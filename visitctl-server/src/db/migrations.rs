//! Schema setup for the visit counter table

use super::{DbPool, StoreError};

/// Create the counter table if it does not exist yet.
///
/// The primary key on `id` is what lets the increment upsert resolve
/// conflicting inserts.
pub async fn run(pool: &DbPool) -> Result<(), StoreError> {
    tracing::info!("Running visit counter migrations...");

    let mut conn = pool.acquire().await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS estatisticas_portfolio_global (
            id INTEGER PRIMARY KEY,
            contador_total BIGINT NOT NULL DEFAULT 0 CHECK (contador_total >= 0),
            ultima_atualizacao TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    tracing::info!("Visit counter migrations complete");
    Ok(())
}
