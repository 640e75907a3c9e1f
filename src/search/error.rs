//! Error types for search operations
//!
//! Only conditions that indicate a deployment problem become errors. Lock
//! timeouts, stale searchers and a missing index degrade to slower but
//! correct paths and never show up here.

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Index not found or not completely built
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Queue, signature or lock file could not be accessed
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Page name that cannot be stored as a single queue entry
    #[error("Invalid page name: {0:?}")]
    InvalidPageName(String),

    /// A background worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    TantivyError(String),
}

impl SearchError {
    /// Wrap an I/O failure on one of the files owned by the index
    pub fn storage(path: &std::path::Path, source: std::io::Error) -> Self {
        SearchError::Storage {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::TantivyError(err.to_string())
    }
}

impl From<tantivy::directory::error::OpenDirectoryError> for SearchError {
    fn from(err: tantivy::directory::error::OpenDirectoryError) -> Self {
        SearchError::IndexInitFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SearchError {
    fn from(err: tokio::task::JoinError) -> Self {
        SearchError::TaskFailed(err.to_string())
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        SearchError::InvalidConfiguration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_names_path() {
        let err = SearchError::storage(
            std::path::Path::new("/var/cache/wiki/update-queue"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("/var/cache/wiki/update-queue"));
    }
}
