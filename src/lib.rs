pub mod config;
pub mod errors;
pub mod storage;
pub mod todo;

pub use config::StorageConfig;
pub use errors::StorageError;
pub use storage::{StorageType, TodoStorage, TodoStorageFactory};
pub use todo::{Todo, TodoId, TodoStatus};
