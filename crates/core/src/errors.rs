//! Error types for the core crate.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by core collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The secret store could not be read or written.
    #[error("Secret store error: {0}")]
    Secret(String),
}

impl Error {
    /// Create a secret store error
    pub fn secret(message: impl Into<String>) -> Self {
        Self::Secret(message.into())
    }
}
