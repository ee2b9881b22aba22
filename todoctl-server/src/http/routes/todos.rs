//! Todo endpoints
//!
//! `/todos/async/...` variants run the same operation on the task executor
//! and await its handle.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidQuery, ValidTodoId};
use crate::http::server::AppState;
use crate::models::{Todo, TodoTitle};

/// Create todo request
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
}

impl CreateTodoRequest {
    /// Reject blank or missing titles before touching the service.
    fn validate(&self) -> Result<&str, ApiError> {
        let title = self.title.as_deref().unwrap_or_default();
        TodoTitle::new(title)?;
        Ok(title)
    }
}

/// Query string for completion updates (`?completed=true`)
#[derive(Debug, Deserialize)]
pub struct CompletedParams {
    pub completed: bool,
}

/// Todo response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoResponse {
    pub id: i64,
    pub title: String,
    pub completed: bool,
}

impl From<Todo> for TodoResponse {
    fn from(t: Todo) -> Self {
        Self {
            id: t.id,
            title: t.title,
            completed: t.completed,
        }
    }
}

/// GET /todos - list all todos
async fn list_todos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let todos = state.service.list_todos().await?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

/// GET /todos/{id} - get a single todo
async fn get_todo(
    State(state): State<Arc<AppState>>,
    ValidTodoId(id): ValidTodoId,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state.service.get_todo(id).await?;
    Ok(Json(TodoResponse::from(todo)))
}

/// POST /todos - create a todo
async fn create_todo(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let title = req.validate()?;
    let todo = state.service.create_todo(title).await?;

    Ok((StatusCode::CREATED, Json(TodoResponse::from(todo))))
}

/// POST /todos/async - create a todo on the executor
async fn create_todo_async(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let title = req.validate()?;
    let handle = state.service.create_todo_async(title).await;
    let todo = handle.await??;

    Ok((StatusCode::CREATED, Json(TodoResponse::from(todo))))
}

/// PATCH /todos/{id}/completed?completed=bool
async fn update_completed(
    State(state): State<Arc<AppState>>,
    ValidTodoId(id): ValidTodoId,
    ValidQuery(params): ValidQuery<CompletedParams>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state.service.update_completed(id, params.completed).await?;
    Ok(Json(TodoResponse::from(todo)))
}

/// PATCH /todos/async/{id}/completed?completed=bool
async fn update_completed_async(
    State(state): State<Arc<AppState>>,
    ValidTodoId(id): ValidTodoId,
    ValidQuery(params): ValidQuery<CompletedParams>,
) -> Result<Json<TodoResponse>, ApiError> {
    let handle = state
        .service
        .update_completed_async(id, params.completed)
        .await;
    let todo = handle.await??;

    Ok(Json(TodoResponse::from(todo)))
}

/// DELETE /todos/{id}
async fn delete_todo(
    State(state): State<Arc<AppState>>,
    ValidTodoId(id): ValidTodoId,
) -> Result<StatusCode, ApiError> {
    state.service.delete_todo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Todo routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/async", post(create_todo_async))
        .route("/todos/{id}", get(get_todo).delete(delete_todo))
        .route("/todos/{id}/completed", patch(update_completed))
        .route("/todos/async/{id}/completed", patch(update_completed_async))
}
