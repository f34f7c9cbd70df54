//! In-process fake of the remote todo service, served with axum.
//!
//! Mirrors the service contract: ids are assigned by the server starting at 1,
//! `POST` answers `201`, unknown ids answer `404`, and a configurable failure
//! status can be forced on every route.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use todo_store::{Todo, TodoId, TodoStatus};

#[derive(Default)]
pub struct FakeService {
    pub todos: Vec<Todo>,
    pub next_id: TodoId,
    pub requests: usize,
    pub fail_with: Option<StatusCode>,
}

pub type SharedService = Arc<Mutex<FakeService>>;

#[derive(Deserialize)]
struct NewTodo {
    text: String,
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: TodoStatus,
}

fn begin(s: &SharedService) -> Result<std::sync::MutexGuard<'_, FakeService>, StatusCode> {
    let mut svc = s.lock().unwrap();
    svc.requests += 1;
    match svc.fail_with {
        Some(code) => Err(code),
        None => Ok(svc),
    }
}

async fn list(State(s): State<SharedService>) -> Result<Json<Vec<Todo>>, StatusCode> {
    let svc = begin(&s)?;
    Ok(Json(svc.todos.clone()))
}

async fn create(
    State(s): State<SharedService>,
    Json(body): Json<NewTodo>,
) -> Result<(StatusCode, Json<Todo>), StatusCode> {
    let mut svc = begin(&s)?;
    svc.next_id += 1;
    let todo = Todo::new(svc.next_id, body.text);
    svc.todos.push(todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update(
    State(s): State<SharedService>,
    Path(id): Path<TodoId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Todo>, StatusCode> {
    let mut svc = begin(&s)?;
    let todo = svc.todos.iter_mut().find(|t| t.id == id).ok_or(StatusCode::NOT_FOUND)?;
    todo.set_status(body.status);
    Ok(Json(todo.clone()))
}

async fn remove(
    State(s): State<SharedService>,
    Path(id): Path<TodoId>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut svc = begin(&s)?;
    let before = svc.todos.len();
    svc.todos.retain(|t| t.id != id);
    if svc.todos.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(serde_json::json!({ "message": "deleted" })))
}

async fn not_json() -> &'static str {
    "definitely not json"
}

/// Routes library logs through the test harness; `RUST_LOG=debug` shows them.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Starts the fake service on an ephemeral port.
///
/// Returns the API base URL (`http://127.0.0.1:<port>/api/v1`) and the shared state.
/// `GET http://127.0.0.1:<port>/garbage/todos` answers `200` with a non-JSON body.
pub async fn spawn_service() -> (String, SharedService) {
    init_logging();
    let state = SharedService::default();

    let app = Router::new()
        .route("/api/v1/todos", get(list).post(create))
        .route("/api/v1/todos/:id", axum::routing::put(update).delete(remove))
        .route("/garbage/todos", get(not_json))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api/v1"), state)
}
