//! Command implementations for todoctl CLI

pub mod migrate;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use todoctl_server::TodoConfig;

pub use migrate::run_migrate;
pub use serve::run_serve;

/// Load `.env` from the working directory, then `~/.todoctl/.env`.
///
/// Variables already set in the environment are never overwritten.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();

    if let Some(env_file) = dirs::home_dir().map(|home| home.join(".todoctl").join(".env")) {
        if env_file.exists() {
            dotenvy::from_path(&env_file).ok(); // Load but don't fail if parsing errors
        }
    }
}

/// Load config from `path` (or the default location) and apply a
/// command-line database URL on top.
pub(crate) fn load_config(
    path: Option<&PathBuf>,
    database_url: Option<String>,
) -> Result<TodoConfig> {
    let mut config = TodoConfig::load(path.map(PathBuf::as_path))
        .context("Failed to load todoctl configuration")?;

    if let Some(url) = database_url {
        config.database.url = Some(url);
    }

    Ok(config)
}
