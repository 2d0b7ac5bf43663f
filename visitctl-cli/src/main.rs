//! visitctl CLI - portfolio visit counter service
//!
//! Entry point for the `visitctl` binary:
//! - `serve`: run the HTTP API (track-visit / statistics)
//! - `check`: verify the database is reachable
//! - `migrate`: create the counter table
//! - `stats`: print the current count

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "visitctl",
    author,
    version,
    about = "Global visit counter for a portfolio site, backed by PostgreSQL"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Check that the database is reachable
    Check(commands::check::CheckArgs),
    /// Create the counter table if missing
    Migrate(commands::migrate::MigrateArgs),
    /// Print the current visit count
    Stats(commands::stats::StatsArgs),
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment wins
    dotenvy::dotenv().ok();
    init_tracing().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Check(args) => commands::run_check(args).await?,
        Commands::Migrate(args) => commands::run_migrate(args).await?,
        Commands::Stats(args) => commands::run_stats(args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn stats_accepts_json_flag() {
        let cli = Cli::try_parse_from(["visitctl", "stats", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats(args) if args.json));
    }
}
