use crate::todo::TodoId;

/// Errors surfaced by todo storage backends and the storage factory.
///
/// The type is `Clone` so that a single initialization result can be handed to
/// every caller that joined the same in-flight initialization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Todo {0} not found")]
    NotFound(TodoId),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Storage initialization failed after {attempts} attempt(s): {source}")]
    Initialization {
        attempts: u32,
        #[source]
        source: Box<StorageError>,
    },

    #[error("Storage is initializing, try again later")]
    ConcurrentOperation,

    #[error("Storage is not initialized")]
    NotInitialized,

    #[error("Todo text must not be empty")]
    EmptyText,
}

impl StorageError {
    pub(crate) fn persistence(msg: impl Into<String>) -> Self {
        StorageError::Persistence(msg.into())
    }

    /// True for errors that mean "no such todo", regardless of backend.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<r2d2_sqlite::rusqlite::Error> for StorageError {
    fn from(e: r2d2_sqlite::rusqlite::Error) -> Self {
        StorageError::Persistence(format!("sqlite: {e}"))
    }
}

impl From<r2d2::Error> for StorageError {
    fn from(e: r2d2::Error) -> Self {
        StorageError::Persistence(format!("connection pool: {e}"))
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Persistence(format!("http: {e}"))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Persistence(format!("invalid json: {e}"))
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        StorageError::Persistence(format!("storage task failed: {e}"))
    }
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_error_keeps_last_cause() {
        let err = StorageError::Initialization {
            attempts: 4,
            source: Box::new(StorageError::persistence("disk full")),
        };

        let msg = err.to_string();
        assert!(msg.contains("4 attempt(s)"));
        assert!(msg.contains("disk full"));

        let source = std::error::Error::source(&err).expect("has source");
        assert_eq!(source.to_string(), "Persistence error: disk full");
    }

    #[test]
    fn not_found_is_detectable() {
        assert!(StorageError::NotFound(7).is_not_found());
        assert!(!StorageError::NotInitialized.is_not_found());
    }
}
