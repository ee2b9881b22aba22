//! In-memory todo repository
//!
//! Backs `serve --in-memory` and the test suite. A single async mutex over
//! the whole table stands in for row locks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::repos::{DbError, TodoRepository};
use crate::models::{Todo, TodoId, TodoTitle};

#[derive(Default)]
struct Table {
    rows: BTreeMap<i64, Todo>,
    last_id: i64,
}

/// Mutex-guarded todo table
#[derive(Default)]
pub struct MemoryTodoRepo {
    table: Mutex<Table>,
}

impl MemoryTodoRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoRepository for MemoryTodoRepo {
    async fn list(&self) -> Result<Vec<Todo>, DbError> {
        let table = self.table.lock().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn get(&self, id: TodoId) -> Result<Option<Todo>, DbError> {
        let table = self.table.lock().await;
        Ok(table.rows.get(&id.get()).cloned())
    }

    async fn insert(&self, title: TodoTitle) -> Result<Todo, DbError> {
        let mut table = self.table.lock().await;
        table.last_id += 1;
        let todo = Todo {
            id: table.last_id,
            title: title.into_string(),
            completed: false,
            version: 0,
        };
        table.rows.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn update_completed_if_version(
        &self,
        id: TodoId,
        completed: bool,
        expected_version: i64,
    ) -> Result<Option<Todo>, DbError> {
        let mut table = self.table.lock().await;
        match table.rows.get_mut(&id.get()) {
            Some(todo) if todo.version == expected_version => {
                todo.completed = completed;
                todo.version += 1;
                Ok(Some(todo.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_completed_locked(&self, id: TodoId, completed: bool) -> Result<Todo, DbError> {
        let mut table = self.table.lock().await;
        let todo = table
            .rows
            .get_mut(&id.get())
            .ok_or_else(|| DbError::todo_not_found(id))?;

        todo.completed = completed;
        todo.version += 1;
        Ok(todo.clone())
    }

    async fn delete(&self, id: TodoId) -> Result<bool, DbError> {
        let mut table = self.table.lock().await;
        Ok(table.rows.remove(&id.get()).is_some())
    }

    async fn count(&self) -> Result<i64, DbError> {
        let table = self.table.lock().await;
        Ok(table.rows.len() as i64)
    }
}
