//! Storage configuration.
//!
//! `StorageConfig` controls which backend the factory prefers, where the
//! embedded database lives, which remote service the API backend talks to, and
//! how hard the factory tries before giving up on initialization.
//!
//! `StorageConfig` provides defaults via [`Default`], a fluent
//! [`StorageConfig::builder()`] with validation, and [`StorageConfig::from_env`]
//! for deployment-time overrides.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use todo_store::config::StorageConfig;
//! let cfg = StorageConfig::default();
//! assert_eq!(cfg.retry_count, 3);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use std::time::Duration;
//! use todo_store::config::StorageConfig;
//! use todo_store::storage::StorageType;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = StorageConfig::builder()
//!     .default_storage(StorageType::Api)
//!     .api_base_url("http://todo.internal:8080/api/v1")
//!     .retry_count(5)
//!     .retry_backoff(Duration::from_millis(250))
//!     .build()?;
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `default_storage`: Backend used when the caller has no preference (default: embedded).
//! - `database_path`: SQLite file for the embedded backend (default: `todo-db.sqlite3`).
//! - `api_base_url`: Base URL of the remote todo service (default: `http://localhost:8080/api/v1`).
//! - `user_agent`: `User-Agent` sent by the API backend.
//! - `retry_count`: Retries after the first failed backend construction (default: 3).
//! - `retry_backoff`: Fixed wait between construction attempts (default: 1s).
//! - `api_probe`: Issue one `GET /todos` when constructing the API backend (default: true).
//!
//! # Environment
//!
//! [`StorageConfig::from_env`] reads `TODO_STORAGE`, `TODO_DB_PATH`,
//! `TODO_API_URL`, `TODO_RETRY_COUNT` and `TODO_RETRY_BACKOFF_MS`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::storage::types::{StorageType, UnknownStorageType};

const DEFAULT_USER_AGENT: &str = concat!("todo-store/", env!("CARGO_PKG_VERSION"));
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_DATABASE_PATH: &str = "todo-db.sqlite3";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub default_storage: StorageType,
    pub database_path: PathBuf,
    pub api_base_url: Url,
    pub user_agent: String,
    pub retry_count: u32,
    pub retry_backoff: Duration,
    pub api_probe: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_storage: StorageType::Embedded,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default API URL is valid"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_count: 3,
            retry_backoff: Duration::from_secs(1),
            api_probe: true,
        }
    }
}

impl StorageConfig {
    pub fn builder() -> StorageConfigBuilder {
        StorageConfigBuilder::default()
    }

    /// Builds a config from the defaults overridden by `TODO_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Some(v) = lookup("TODO_STORAGE") {
            builder = builder.default_storage(v.parse()?);
        }
        if let Some(v) = lookup("TODO_DB_PATH") {
            builder = builder.database_path(v);
        }
        if let Some(v) = lookup("TODO_API_URL") {
            builder = builder.api_base_url(v);
        }
        if let Some(v) = lookup("TODO_RETRY_COUNT") {
            let n = v.parse().map_err(|_| ConfigError::InvalidNumber { key: "TODO_RETRY_COUNT", value: v })?;
            builder = builder.retry_count(n);
        }
        if let Some(v) = lookup("TODO_RETRY_BACKOFF_MS") {
            let ms = v.parse().map_err(|_| ConfigError::InvalidNumber { key: "TODO_RETRY_BACKOFF_MS", value: v })?;
            builder = builder.retry_backoff(Duration::from_millis(ms));
        }

        builder.build()
    }
}

/// Builder for [`StorageConfig`].
#[derive(Debug, Clone, Default)]
pub struct StorageConfigBuilder {
    inner: StorageConfig,
    // URL text is parsed during build() so errors surface there.
    api_base_url: Option<String>,
}

impl StorageConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut StorageConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn default_storage(self, t: StorageType) -> Self { self.map(|c| c.default_storage = t) }
    pub fn database_path<P: Into<PathBuf>>(self, p: P) -> Self { self.map(|c| c.database_path = p.into()) }
    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn retry_count(self, n: u32) -> Self { self.map(|c| c.retry_count = n) }
    pub fn retry_backoff(self, d: Duration) -> Self { self.map(|c| c.retry_backoff = d) }
    pub fn api_probe(self, on: bool) -> Self { self.map(|c| c.api_probe = on) }

    pub fn api_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut StorageConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(mut self) -> Result<StorageConfig, ConfigError> {
        if let Some(raw) = self.api_base_url.take() {
            self.inner.api_base_url = Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(raw, e))?;
        }
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API base URL {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("API base URL must use http or https, got {0:?}")]
    UnsupportedScheme(String),

    #[error("API base URL {0} cannot be used as a base")]
    NotABase(String),

    #[error("database path must not be empty")]
    EmptyDatabasePath,

    #[error("user agent must not be empty")]
    EmptyUserAgent,

    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error(transparent)]
    UnknownStorageType(#[from] UnknownStorageType),
}

fn validate(c: &StorageConfig) -> Result<(), ConfigError> {
    let scheme = c.api_base_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::UnsupportedScheme(scheme.to_string()));
    }
    if c.api_base_url.cannot_be_a_base() {
        return Err(ConfigError::NotABase(c.api_base_url.to_string()));
    }
    if c.database_path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyDatabasePath);
    }
    if c.user_agent.trim().is_empty() {
        return Err(ConfigError::EmptyUserAgent);
    }
    Ok(())
}
