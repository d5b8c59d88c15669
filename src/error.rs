//! Error types for the encdb bootstrap

use thiserror::Error;

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, EncDbError>;

/// Errors that can occur while provisioning the key artifact or
/// patching connection pools
#[derive(Error, Debug)]
pub enum EncDbError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pool object did not have the type its adapter expected
    #[error("Pool type mismatch: expected {0}")]
    TypeMismatch(String),

    /// Adapter could not read or write a pool field
    #[error("Pool access error: {0}")]
    PoolAccess(String),
}

impl From<std::io::Error> for EncDbError {
    fn from(err: std::io::Error) -> Self {
        EncDbError::Io(err.to_string())
    }
}
