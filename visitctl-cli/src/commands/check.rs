//! Check command - verify the store is reachable

use anyhow::{Context, Result};
use clap::Parser;

use super::connect_from_env;

#[derive(Parser, Debug)]
pub struct CheckArgs {}

/// Acquire a connection, round-trip `SELECT 1`, release it.
pub async fn run_check(_args: CheckArgs) -> Result<()> {
    let pool = connect_from_env().await?;
    let result = pool.health_check().await;
    pool.close().await;

    result.context("Database health check failed")?;
    println!("database reachable");
    Ok(())
}
