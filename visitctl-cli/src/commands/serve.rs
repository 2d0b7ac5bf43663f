//! HTTP server command for the visit counter API
//!
//! Checks the store first and refuses to start if it is unreachable.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use visitctl_server::db::migrations;
use visitctl_server::http::server::DEFAULT_PORT;
use visitctl_server::{run_server, ServerConfig};

use super::connect_from_env;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, env = "LISTEN_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, short = 'p', env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Allowed CORS origin ("*" allows any)
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Production hides error details from API responses
    #[arg(long, env = "APP_ENV", value_enum, default_value = "development")]
    pub app_env: AppEnv,

    /// Do not create the counter table at startup
    #[arg(long)]
    pub skip_migrations: bool,
}

impl ServeArgs {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            cors_origin: Some(self.cors_origin.clone()),
            expose_error_details: self.app_env != AppEnv::Production,
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    tracing::info!("Checking database connection...");
    let pool = connect_from_env().await?;
    pool.health_check()
        .await
        .context("Database unreachable, refusing to start")?;
    tracing::info!("Database connection verified");

    if !args.skip_migrations {
        migrations::run(&pool).await.context("Migration failed")?;
    }

    let config = args.server_config();
    tracing::info!(
        environment = ?args.app_env,
        "Starting visit counter server on {}",
        config.bind_addr
    );

    // Run server (blocks until shutdown, then closes the pool)
    run_server(pool, config).await.context("Server error")?;

    Ok(())
}
