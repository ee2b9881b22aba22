//! HTTP server command for the todo API

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use todoctl_server::Storage;

use super::load_config;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:8080, or [server].bind)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Keep todos in memory instead of PostgreSQL (ignores any database URL)
    #[arg(long)]
    pub in_memory: bool,

    /// Config file (default: ~/.todoctl/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let database_url = if args.in_memory { None } else { args.database_url };
    let mut config = load_config(args.config.as_ref(), database_url)?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.cors_permissive {
        config.server.cors_permissive = true;
    }

    let storage = if args.in_memory {
        Storage::Memory
    } else {
        if config.database.url.is_none() {
            anyhow::bail!(
                "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, \
                 ~/.todoctl/.env, or pass --in-memory"
            );
        }
        Storage::Postgres
    };

    tracing::info!("Starting todoctl server on {}", config.server.bind);

    // Blocks until shutdown
    todoctl_server::serve(config, storage)
        .await
        .context("Server error")?;

    Ok(())
}
