//! HTTP-backed todo store.
//!
//! `ApiTodoStore` talks to an external todo service rooted at a configurable
//! base URL:
//!
//! | operation              | request                  | body                  |
//! |------------------------|--------------------------|-----------------------|
//! | `get_all_todos`        | `GET /todos`             |                       |
//! | `add_todo`             | `POST /todos`            | `{"text": "..."}`     |
//! | `update_todo_status`   | `PUT /todos/{id}`        | `{"status": "..."}`   |
//! | `delete_todo`          | `DELETE /todos/{id}`     |                       |
//!
//! Responses are a JSON `Todo` or an array of them. Any non-success status
//! becomes `StorageError::Persistence` with a generic message for the
//! operation, except `404` on an id route, which becomes
//! `StorageError::NotFound`. Nothing is retried here.
//!
//! The service has no single-todo route, so `get_todo_by_id` lists and picks.

use async_trait::async_trait;
use http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::StorageConfig;
use crate::errors::{Result, StorageError};
use crate::storage::backend::TodoStorage;
use crate::todo::{normalize_text, Todo, TodoId, TodoStatus};

#[derive(Serialize)]
struct NewTodo<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: TodoStatus,
}

#[derive(Debug, Clone)]
pub struct ApiTodoStore {
    client: Client,
    /// Base URL without a trailing slash, e.g. `http://localhost:8080/api/v1`.
    base_url: String,
}

impl ApiTodoStore {
    /// Creates a client for the service at `base_url`. Does not touch the network.
    pub fn new(base_url: &Url, user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from `config` and, if `config.api_probe` is set, checks
    /// that the service answers `GET /todos`.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let store = Self::new(&config.api_base_url, &config.user_agent)?;
        if config.api_probe {
            let count = store.get_all_todos().await?.len();
            log::info!("connected to todo service at {} ({count} todos)", store.base_url);
        }
        Ok(store)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends `req` and returns the buffered body of a successful response.
    ///
    /// `id` marks requests addressed to a single todo, for which a `404` means
    /// the todo does not exist.
    async fn execute(&self, req: RequestBuilder, op: &'static str, id: Option<TodoId>) -> Result<Vec<u8>> {
        let res = req.send().await.map_err(|e| {
            log::debug!("{op}: request failed: {e}");
            StorageError::persistence(format!("{op}: {e}"))
        })?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StorageError::NotFound(id));
            }
        }
        if !status.is_success() {
            log::debug!("{op}: {} answered {status}", res.url());
            return Err(StorageError::persistence(format!(
                "{op} (HTTP {})",
                status.as_u16()
            )));
        }

        // We don't stream; todo payloads are small.
        Ok(res.bytes().await?.to_vec())
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        op: &'static str,
        id: Option<TodoId>,
    ) -> Result<T> {
        let body = self.execute(req, op, id).await?;
        serde_json::from_slice(&body)
            .map_err(|e| StorageError::persistence(format!("{op}: unexpected response body: {e}")))
    }
}

#[async_trait]
impl TodoStorage for ApiTodoStore {
    async fn get_all_todos(&self) -> Result<Vec<Todo>> {
        let req = self.client.get(self.url("todos"));
        self.execute_json(req, "failed to fetch todos", None).await
    }

    async fn add_todo(&self, text: &str) -> Result<Todo> {
        let text = normalize_text(text).ok_or(StorageError::EmptyText)?;
        let req = self.client.post(self.url("todos")).json(&NewTodo { text });
        let todo: Todo = self.execute_json(req, "failed to create todo", None).await?;
        log::debug!("service created todo {}", todo.id);
        Ok(todo)
    }

    async fn get_todo_by_id(&self, id: TodoId) -> Result<Todo> {
        self.get_all_todos()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StorageError::NotFound(id))
    }

    async fn update_todo_status(&self, id: TodoId, status: TodoStatus) -> Result<Todo> {
        let req = self
            .client
            .put(self.url(&format!("todos/{id}")))
            .json(&StatusUpdate { status });
        self.execute_json(req, "failed to update todo", Some(id)).await
    }

    async fn delete_todo(&self, id: TodoId) -> Result<()> {
        let req = self.client.delete(self.url(&format!("todos/{id}")));
        self.execute(req, "failed to delete todo", Some(id)).await?;
        Ok(())
    }
}
