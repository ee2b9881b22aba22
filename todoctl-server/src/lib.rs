//! todoctl-server: todo REST API
//!
//! Todo CRUD over PostgreSQL with a version-checked completion update
//! that falls back to a row lock, plus executor-backed async variants
//! of the mutations.

pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod http;
pub mod models;
pub mod service;

use std::sync::Arc;

use db::{create_pool_with_options, MemoryTodoRepo, PgTodoRepo, TodoRepository};
use executor::TaskExecutor;

pub use config::TodoConfig;
pub use error::{Error, Result};
pub use service::{ServiceError, TodoService};

/// Where todos are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// PostgreSQL at the configured database URL
    Postgres,
    /// Process memory; contents are lost on exit
    Memory,
}

/// Connect to PostgreSQL and apply migrations.
pub async fn connect(config: &TodoConfig) -> Result<sqlx::PgPool> {
    let url = config
        .database
        .url
        .as_deref()
        .ok_or(Error::MissingDatabaseUrl)?;

    let pool = create_pool_with_options(url, config.database.max_connections).await?;
    db::migrations::run(&pool).await?;
    Ok(pool)
}

/// Wire repository, executor and retry policy into a service.
///
/// Must be called from within a Tokio runtime.
pub async fn build_service(config: &TodoConfig, storage: Storage) -> Result<TodoService> {
    let repo: Arc<dyn TodoRepository> = match storage {
        Storage::Postgres => Arc::new(PgTodoRepo::new(connect(config).await?)),
        Storage::Memory => {
            tracing::warn!("Using in-memory storage; todos will not survive a restart");
            Arc::new(MemoryTodoRepo::new())
        }
    };

    let executor = TaskExecutor::new(config.executor_config()?)?;
    Ok(TodoService::new(repo, executor, config.retry_policy()))
}

/// Start the HTTP server and block until shutdown.
pub async fn serve(config: TodoConfig, storage: Storage) -> Result<()> {
    let service = build_service(&config, storage).await?;
    http::run_server(service, config.server_config()).await?;
    Ok(())
}
