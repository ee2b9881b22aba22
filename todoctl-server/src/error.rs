//! Error types for todoctl-server startup

use thiserror::Error;

use crate::config::ConfigError;
use crate::executor::ExecutorConfigError;
use crate::http::ServerError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no database URL configured (set DATABASE_URL, [database].url, or use in-memory storage)")]
    MissingDatabaseUrl,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Executor(#[from] ExecutorConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),
}
