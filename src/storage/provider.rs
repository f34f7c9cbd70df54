use std::sync::Arc;

use async_trait::async_trait;

use super::api_store::ApiTodoStore;
use super::backend::TodoBackend;
use super::sqlite_store::SqliteTodoStore;
use super::types::StorageType;
use crate::config::StorageConfig;
use crate::errors::Result;

/// Constructs backends on behalf of the [`TodoStorageFactory`](super::TodoStorageFactory).
///
/// One call is one construction attempt; retrying is the factory's job.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn connect(&self, storage_type: StorageType) -> Result<TodoBackend>;
}

pub type BackendProviderHandle = Arc<dyn BackendProvider>;

/// Builds the real backends described by a [`StorageConfig`].
#[derive(Debug, Clone)]
pub struct ConfiguredBackends {
    config: StorageConfig,
}

impl ConfiguredBackends {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendProvider for ConfiguredBackends {
    async fn connect(&self, storage_type: StorageType) -> Result<TodoBackend> {
        match storage_type {
            StorageType::Embedded => {
                let path = self.config.database_path.clone();
                let store = tokio::task::spawn_blocking(move || SqliteTodoStore::open(path)).await??;
                Ok(store.into())
            }
            StorageType::Api => Ok(ApiTodoStore::connect(&self.config).await?.into()),
        }
    }
}
