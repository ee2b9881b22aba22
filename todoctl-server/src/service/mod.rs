//! Todo service - business operations over the repository
//!
//! Every mutation has a direct form (awaited on the caller's task) and an
//! `_async` form submitted to the bounded [`TaskExecutor`].

pub mod retry;

use std::sync::Arc;

use tracing::{debug, info};

use crate::db::{DbError, TodoRepository};
use crate::executor::{TaskAborted, TaskExecutor, TaskHandle};
use crate::models::{Todo, TodoId, TodoTitle, ValidationError};

pub use retry::{retry_with_backoff, RetryPolicy};

/// Service-level failures
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("todo '{id}' not found")]
    NotFound { id: TodoId },

    #[error("todo '{id}' kept changing underneath the update; gave up after {attempts} attempts")]
    Conflict { id: TodoId, attempts: u32 },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    TaskAborted(#[from] TaskAborted),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    fn for_todo(err: DbError, id: TodoId, attempts: u32) -> Self {
        match err {
            DbError::NotFound { .. } => Self::NotFound { id },
            err if err.is_conflict() => Self::Conflict { id, attempts },
            err => Self::Database(err),
        }
    }
}

/// Todo operations shared by the HTTP handlers
#[derive(Clone)]
pub struct TodoService {
    repo: Arc<dyn TodoRepository>,
    executor: TaskExecutor,
    retry: RetryPolicy,
}

impl TodoService {
    pub fn new(repo: Arc<dyn TodoRepository>, executor: TaskExecutor, retry: RetryPolicy) -> Self {
        Self {
            repo,
            executor,
            retry,
        }
    }

    pub async fn list_todos(&self) -> ServiceResult<Vec<Todo>> {
        Ok(self.repo.list().await?)
    }

    pub async fn get_todo(&self, id: TodoId) -> ServiceResult<Todo> {
        self.repo
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound { id })
    }

    pub async fn count_todos(&self) -> ServiceResult<i64> {
        Ok(self.repo.count().await?)
    }

    /// Create a todo. Blank or oversized titles fail with `Validation`.
    pub async fn create_todo(&self, title: &str) -> ServiceResult<Todo> {
        let title = TodoTitle::new(title)?;
        let todo = self.repo.insert(title).await?;
        debug!(id = todo.id, "todo created");
        Ok(todo)
    }

    /// Set the completed flag.
    ///
    /// Tries a version-checked update first and falls back to a row lock
    /// when the version moved or the row is missing. Version conflicts are
    /// retried per the service's [`RetryPolicy`].
    pub async fn update_completed(&self, id: TodoId, completed: bool) -> ServiceResult<Todo> {
        let repo: &dyn TodoRepository = self.repo.as_ref();

        let todo = retry_with_backoff(
            move || update_completed_once(repo, id, completed),
            &self.retry,
            DbError::is_conflict,
        )
        .await
        .map_err(|err| ServiceError::for_todo(err, id, self.retry.max_attempts.max(1)))?;

        debug!(id = todo.id, completed, version = todo.version, "completion updated");
        Ok(todo)
    }

    pub async fn delete_todo(&self, id: TodoId) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound { id });
        }
        debug!(%id, "todo deleted");
        Ok(())
    }

    pub async fn create_todo_async(&self, title: &str) -> TaskHandle<ServiceResult<Todo>> {
        let service = self.clone();
        let title = title.to_owned();
        self.executor
            .submit(async move { service.create_todo(&title).await })
            .await
    }

    pub async fn update_completed_async(
        &self,
        id: TodoId,
        completed: bool,
    ) -> TaskHandle<ServiceResult<Todo>> {
        let service = self.clone();
        self.executor
            .submit(async move { service.update_completed(id, completed).await })
            .await
    }

    pub async fn delete_todo_async(&self, id: TodoId) -> TaskHandle<ServiceResult<()>> {
        let service = self.clone();
        self.executor
            .submit(async move { service.delete_todo(id).await })
            .await
    }

    /// Drain the executor. Returns `false` if it timed out.
    pub async fn shutdown(&self) -> bool {
        info!("draining async todo executor");
        self.executor.shutdown().await
    }
}

async fn update_completed_once(
    repo: &dyn TodoRepository,
    id: TodoId,
    completed: bool,
) -> Result<Todo, DbError> {
    if let Some(current) = repo.get(id).await? {
        if let Some(updated) = repo
            .update_completed_if_version(id, completed, current.version)
            .await?
        {
            return Ok(updated);
        }
        debug!(%id, version = current.version, "version moved, falling back to row lock");
    }

    repo.update_completed_locked(id, completed).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::db::MemoryTodoRepo;
    use crate::executor::ExecutorConfig;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::fixed(3, Duration::from_millis(1))
    }

    fn service_over(repo: Arc<dyn TodoRepository>) -> TodoService {
        let executor = TaskExecutor::new(ExecutorConfig::default()).unwrap();
        TodoService::new(repo, executor, fast_retry())
    }

    fn memory_service() -> TodoService {
        service_over(Arc::new(MemoryTodoRepo::new()))
    }

    fn id(raw: i64) -> TodoId {
        TodoId::new(raw).unwrap()
    }

    /// Memory repo whose writes report a version conflict a fixed number of
    /// times before delegating.
    struct ConflictingRepo {
        inner: MemoryTodoRepo,
        conflicts_left: AtomicU32,
        locked_calls: AtomicU32,
    }

    impl ConflictingRepo {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: MemoryTodoRepo::new(),
                conflicts_left: AtomicU32::new(conflicts),
                locked_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TodoRepository for ConflictingRepo {
        async fn list(&self) -> Result<Vec<Todo>, DbError> {
            self.inner.list().await
        }

        async fn get(&self, id: TodoId) -> Result<Option<Todo>, DbError> {
            self.inner.get(id).await
        }

        async fn insert(&self, title: TodoTitle) -> Result<Todo, DbError> {
            self.inner.insert(title).await
        }

        async fn update_completed_if_version(
            &self,
            _id: TodoId,
            _completed: bool,
            _expected_version: i64,
        ) -> Result<Option<Todo>, DbError> {
            // Always lose the race so the locked path runs.
            Ok(None)
        }

        async fn update_completed_locked(
            &self,
            id: TodoId,
            completed: bool,
        ) -> Result<Todo, DbError> {
            self.locked_calls.fetch_add(1, Ordering::SeqCst);
            let left = self.conflicts_left.load(Ordering::SeqCst);
            if left > 0 {
                self.conflicts_left.store(left - 1, Ordering::SeqCst);
                return Err(DbError::VersionConflict { id: id.get() });
            }
            self.inner.update_completed_locked(id, completed).await
        }

        async fn delete(&self, id: TodoId) -> Result<bool, DbError> {
            self.inner.delete(id).await
        }

        async fn count(&self) -> Result<i64, DbError> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn create_returns_increasing_ids() {
        let service = memory_service();
        let a = service.create_todo("a").await.unwrap();
        let b = service.create_todo("b").await.unwrap();

        assert!(b.id > a.id);
        assert!(!a.completed);
    }

    #[tokio::test]
    async fn repeated_update_is_idempotent_but_advances_version() {
        let service = memory_service();
        let todo = service.create_todo("twice").await.unwrap();

        let first = service.update_completed(id(todo.id), true).await.unwrap();
        let second = service.update_completed(id(todo.id), true).await.unwrap();

        assert!(first.completed && second.completed);
        assert_eq!(first.title, second.title);
        assert!(second.version > first.version);
        assert!(first.version > todo.version);
    }

    #[tokio::test]
    async fn update_of_missing_todo_is_not_found() {
        let service = memory_service();

        let err = service.update_completed(id(404), true).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { id } if id.get() == 404));

        let err = service
            .update_completed_async(id(404), true)
            .await
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let repo = Arc::new(ConflictingRepo::new(2));
        let service = service_over(repo.clone());
        let todo = service.create_todo("contested").await.unwrap();

        let updated = service.update_completed(id(todo.id), true).await.unwrap();

        assert!(updated.completed);
        assert_eq!(repo.locked_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_conflict() {
        let repo = Arc::new(ConflictingRepo::new(u32::MAX));
        let service = service_over(repo.clone());
        let todo = service.create_todo("hopeless").await.unwrap();

        let err = service.update_completed(id(todo.id), true).await.unwrap_err();

        assert!(matches!(err, ServiceError::Conflict { attempts: 3, .. }));
        assert_eq!(repo.locked_calls.load(Ordering::SeqCst), 3);
        let stored = service.get_todo(id(todo.id)).await.unwrap();
        assert!(!stored.completed);
    }

    #[tokio::test]
    async fn blank_title_is_a_validation_error() {
        let service = memory_service();

        let err = service.create_todo("   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::Empty { .. })));

        let err = service
            .create_todo_async(&"x".repeat(256))
            .await
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::TooLong { .. })));

        assert_eq!(service.count_todos().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_all_land_and_bump_version() {
        const WRITERS: i64 = 50;

        let service = memory_service();
        let todo = service.create_todo("contended").await.unwrap();
        let todo_id = id(todo.id);

        let mut direct = Vec::new();
        for n in 0..WRITERS {
            let service = service.clone();
            direct.push(tokio::spawn(async move {
                service.update_completed(todo_id, n % 2 == 0).await
            }));
        }

        let mut queued = Vec::new();
        for n in 0..WRITERS {
            queued.push(service.update_completed_async(todo_id, n % 2 == 1).await);
        }

        for writer in direct {
            writer.await.unwrap().unwrap();
        }
        for handle in queued {
            handle.await.unwrap().unwrap();
        }

        let stored = service.get_todo(todo_id).await.unwrap();
        assert_eq!(stored.version, 2 * WRITERS);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_reports_the_attempt_made() {
        let repo = Arc::new(ConflictingRepo::new(u32::MAX));
        let executor = TaskExecutor::new(ExecutorConfig::default()).unwrap();
        let service = TodoService::new(repo.clone(), executor, RetryPolicy::fixed(0, Duration::ZERO));
        let todo = service.create_todo("once").await.unwrap();

        let err = service.update_completed(id(todo.id), true).await.unwrap_err();

        assert!(matches!(err, ServiceError::Conflict { attempts: 1, .. }));
        assert_eq!(repo.locked_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delete_then_delete_again_is_not_found() {
        let service = memory_service();
        let todo = service.create_todo("gone").await.unwrap();

        service.delete_todo(id(todo.id)).await.unwrap();
        let err = service.delete_todo(id(todo.id)).await.unwrap_err();

        assert!(matches!(err, ServiceError::NotFound { .. }));
        assert!(service.list_todos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn async_variants_reach_the_same_store() {
        let service = memory_service();

        let created = service
            .create_todo_async("async")
            .await
            .await
            .unwrap()
            .unwrap();
        let updated = service
            .update_completed_async(id(created.id), true)
            .await
            .await
            .unwrap()
            .unwrap();
        assert!(updated.completed);

        service
            .delete_todo_async(id(created.id))
            .await
            .await
            .unwrap()
            .unwrap();
        assert_eq!(service.count_todos().await.unwrap(), 0);
    }
}
