use async_trait::async_trait;

use super::api_store::ApiTodoStore;
use super::sqlite_store::SqliteTodoStore;
use super::types::StorageType;
use crate::errors::Result;
use crate::todo::{Todo, TodoId, TodoStatus};

/// Capability set every todo backend provides.
///
/// Callers filter and paginate the result of [`get_all_todos`](Self::get_all_todos)
/// in memory; backends do neither.
#[async_trait]
pub trait TodoStorage: Send + Sync {
    /// Returns every todo currently persisted.
    async fn get_all_todos(&self) -> Result<Vec<Todo>>;

    /// Persists a new todo with status `todo` and returns the stored record.
    ///
    /// The text is trimmed; blank text is rejected with `StorageError::EmptyText`.
    async fn add_todo(&self, text: &str) -> Result<Todo>;

    /// Fails with `StorageError::NotFound` when `id` is absent.
    async fn get_todo_by_id(&self, id: TodoId) -> Result<Todo>;

    /// Overwrites the status, recomputes `completed_time`, and returns the updated record.
    async fn update_todo_status(&self, id: TodoId, status: TodoStatus) -> Result<Todo>;

    /// Removes the todo. Deleting an absent id fails with `StorageError::NotFound`.
    async fn delete_todo(&self, id: TodoId) -> Result<()>;
}

/// A constructed backend, tagged by kind.
pub enum TodoBackend {
    Embedded(SqliteTodoStore),
    Api(ApiTodoStore),
}

impl TodoBackend {
    pub fn storage_type(&self) -> StorageType {
        match self {
            TodoBackend::Embedded(_) => StorageType::Embedded,
            TodoBackend::Api(_) => StorageType::Api,
        }
    }

    fn inner(&self) -> &dyn TodoStorage {
        match self {
            TodoBackend::Embedded(s) => s,
            TodoBackend::Api(s) => s,
        }
    }
}

impl std::fmt::Debug for TodoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TodoBackend::Embedded(s) => f.debug_tuple("Embedded").field(s).finish(),
            TodoBackend::Api(s) => f.debug_tuple("Api").field(s).finish(),
        }
    }
}

impl From<SqliteTodoStore> for TodoBackend {
    fn from(s: SqliteTodoStore) -> Self {
        TodoBackend::Embedded(s)
    }
}

impl From<ApiTodoStore> for TodoBackend {
    fn from(s: ApiTodoStore) -> Self {
        TodoBackend::Api(s)
    }
}

#[async_trait]
impl TodoStorage for TodoBackend {
    async fn get_all_todos(&self) -> Result<Vec<Todo>> {
        self.inner().get_all_todos().await
    }

    async fn add_todo(&self, text: &str) -> Result<Todo> {
        self.inner().add_todo(text).await
    }

    async fn get_todo_by_id(&self, id: TodoId) -> Result<Todo> {
        self.inner().get_todo_by_id(id).await
    }

    async fn update_todo_status(&self, id: TodoId, status: TodoStatus) -> Result<Todo> {
        self.inner().update_todo_status(id, status).await
    }

    async fn delete_todo(&self, id: TodoId) -> Result<()> {
        self.inner().delete_todo(id).await
    }
}
