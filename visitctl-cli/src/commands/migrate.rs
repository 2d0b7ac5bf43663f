//! Migrate command - create the counter table

use anyhow::{Context, Result};
use clap::Parser;
use visitctl_server::db::migrations;

use super::connect_from_env;

#[derive(Parser, Debug)]
pub struct MigrateArgs {}

pub async fn run_migrate(_args: MigrateArgs) -> Result<()> {
    let pool = connect_from_env().await?;
    let result = migrations::run(&pool).await;
    pool.close().await;

    result.context("Migration failed")?;
    println!("schema up to date");
    Ok(())
}
