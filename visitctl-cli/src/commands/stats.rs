//! Stats command - print the current visit count

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use visitctl_server::{CounterRepo, StoreError};

use super::connect_from_env;

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run_stats(args: StatsArgs) -> Result<()> {
    let pool = connect_from_env().await?;
    let result = CounterRepo::new(&pool).read().await;
    pool.close().await;

    let counter = match result {
        Ok(counter) => Some(counter),
        Err(StoreError::RowMissing { .. }) => None,
        Err(e) => return Err(e).context("Failed to read visit counter"),
    };

    match (counter, args.json) {
        (Some(c), true) => println!(
            "{}",
            json!({
                "id": c.id,
                "total_geral_visitas": c.total_count,
                "ultima_atualizacao": c.last_updated.to_rfc3339(),
            })
        ),
        (Some(c), false) => println!(
            "{} visits (last updated {})",
            c.total_count,
            c.last_updated.to_rfc3339()
        ),
        (None, true) => println!("{}", json!({ "total_geral_visitas": 0 })),
        (None, false) => println!("no visits recorded yet"),
    }
    Ok(())
}
