//! Apply the todo schema without starting the server

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use super::load_config;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Config file (default: ~/.todoctl/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let config = load_config(args.config.as_ref(), args.database_url)?;

    let pool = todoctl_server::connect(&config)
        .await
        .context("Failed to connect and migrate")?;
    pool.close().await;

    println!("Migrations applied");
    Ok(())
}
