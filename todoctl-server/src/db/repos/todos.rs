//! PostgreSQL todo repository
//!
//! - completion update, fast path: one conditional UPDATE keyed on id + version
//! - completion update, fallback: SELECT ... FOR UPDATE inside a transaction

use async_trait::async_trait;
use sqlx::PgPool;

use super::{DbError, TodoRepository};
use crate::models::{Todo, TodoId, TodoTitle};

/// Todo repository over a shared connection pool
#[derive(Clone)]
pub struct PgTodoRepo {
    pool: PgPool,
}

impl PgTodoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TodoRepository for PgTodoRepo {
    async fn list(&self) -> Result<Vec<Todo>, DbError> {
        let todos = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, title, completed, version
            FROM todos
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(todos)
    }

    async fn get(&self, id: TodoId) -> Result<Option<Todo>, DbError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, title, completed, version
            FROM todos
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn insert(&self, title: TodoTitle) -> Result<Todo, DbError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (title)
            VALUES ($1)
            RETURNING id, title, completed, version
            "#,
        )
        .bind(title.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn update_completed_if_version(
        &self,
        id: TodoId,
        completed: bool,
        expected_version: i64,
    ) -> Result<Option<Todo>, DbError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
            SET completed = $2, version = version + 1
            WHERE id = $1 AND version = $3
            RETURNING id, title, completed, version
            "#,
        )
        .bind(id.get())
        .bind(completed)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn update_completed_locked(&self, id: TodoId, completed: bool) -> Result<Todo, DbError> {
        // Dropping `tx` on any early return rolls back and releases the lock.
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;

        let current = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, title, completed, version
            FROM todos
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::todo_not_found(id))?;

        let updated = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
            SET completed = $2, version = version + 1
            WHERE id = $1 AND version = $3
            RETURNING id, title, completed, version
            "#,
        )
        .bind(id.get())
        .bind(completed)
        .bind(current.version)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::VersionConflict { id: id.get() })?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: TodoId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM todos")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
