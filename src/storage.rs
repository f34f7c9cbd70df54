//! Todo storage.
//!
//! This module defines the capability interface every todo backend provides,
//! the two backends, and the factory that decides which one is live.
//!
//! # Concepts
//!
//! - **Embedded storage**: a local SQLite file, opened once and shared for
//!   the lifetime of the backend. Backed by [`SqliteTodoStore`].
//! - **API storage**: an external todo service reached over HTTP. Backed by
//!   [`ApiTodoStore`].
//!
//! Both implement [`TodoStorage`] (`get_all_todos`, `add_todo`,
//! `get_todo_by_id`, `update_todo_status`, `delete_todo`) and are wrapped in
//! the tagged [`TodoBackend`] enum.
//!
//! A [`TodoStorageFactory`] owns the choice between them: it constructs the
//! requested backend through a [`BackendProvider`], retries failed
//! construction, never runs two initializations at once, and lets the caller
//! switch backends later.
//!
//! # Available types
//!
//! - [`StorageType`]: Which backend to use.
//! - [`TodoStorage`]: Trait for any todo backend.
//! - [`TodoBackend`]: A constructed backend of either kind.
//! - [`TodoStorageFactory`]: Lifecycle manager handing out [`TodoStorageHandle`]s.
//! - [`BackendProvider`], [`ConfiguredBackends`]: Backend construction seam.
//!
//! # Example: initialize and use storage
//!
//! ```no_run
//! use todo_store::config::StorageConfig;
//! use todo_store::storage::{StorageType, TodoStorage, TodoStorageFactory};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = TodoStorageFactory::new(StorageConfig::default());
//!
//! let storage = match factory.initialize(StorageType::Embedded).await {
//!     Ok(storage) => storage,
//!     // Falling back is up to the caller.
//!     Err(_) => factory.initialize(StorageType::Api).await?,
//! };
//!
//! let todo = storage.add_todo("buy milk").await?;
//! storage.update_todo_status(todo.id, todo.status.next()).await?;
//! # Ok(()) }
//! ```

/// HTTP-backed todo store.
pub mod api_store;
/// Capability interface and tagged backend enum.
pub mod backend;
/// Single-flight lifecycle manager for the active backend.
pub mod factory;
/// Backend construction seam used by the factory.
pub mod provider;
/// SQLite-backed todo store.
pub mod sqlite_store;
/// Storage types
pub mod types;

pub use api_store::ApiTodoStore;
pub use backend::{TodoBackend, TodoStorage};
pub use factory::{Initialization, Lifecycle, TodoStorageFactory, TodoStorageHandle};
pub use provider::{BackendProvider, BackendProviderHandle, ConfiguredBackends};
pub use sqlite_store::SqliteTodoStore;
pub use types::StorageType;
