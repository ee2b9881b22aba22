//! Repository seam for todo persistence
//!
//! `TodoRepository` is the single persistence dependency injected into the
//! service. The PostgreSQL implementation relies on the database for row
//! locking and isolation; the in-memory one serializes through a mutex.

pub mod todos;

use async_trait::async_trait;

use crate::models::{Todo, TodoId, TodoTitle};

pub use todos::PgTodoRepo;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("version conflict on todo '{id}'")]
    VersionConflict { id: i64 },
}

impl DbError {
    pub fn todo_not_found(id: TodoId) -> Self {
        Self::NotFound {
            resource: "todo",
            id: id.to_string(),
        }
    }

    /// Whether the failure came from a concurrent writer and the operation
    /// may succeed if re-run.
    ///
    /// Covers stale-version writes plus PostgreSQL serialization failures
    /// (`40001`) and deadlocks (`40P01`).
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::VersionConflict { .. } => true,
            Self::Sqlx(sqlx::Error::Database(e)) => {
                matches!(e.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}

/// Todo persistence operations
#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    /// All todos ordered by id.
    async fn list(&self) -> Result<Vec<Todo>, DbError>;

    async fn get(&self, id: TodoId) -> Result<Option<Todo>, DbError>;

    /// Insert a new, not-completed todo at version 0.
    async fn insert(&self, title: TodoTitle) -> Result<Todo, DbError>;

    /// Conditional update: set `completed` and bump the version only if the
    /// row still carries `expected_version`. `None` when no row matched.
    async fn update_completed_if_version(
        &self,
        id: TodoId,
        completed: bool,
        expected_version: i64,
    ) -> Result<Option<Todo>, DbError>;

    /// Update `completed` while holding an exclusive lock on the row.
    ///
    /// Fails with `NotFound` if the row does not exist.
    async fn update_completed_locked(&self, id: TodoId, completed: bool) -> Result<Todo, DbError>;

    /// Delete a todo; `false` when nothing was removed.
    async fn delete(&self, id: TodoId) -> Result<bool, DbError>;

    async fn count(&self) -> Result<i64, DbError>;
}
