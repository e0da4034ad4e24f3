//! Common error types for nsense

use thiserror::Error;

/// Common result type for nsense operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across nsense crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Label name not part of a closed label space
    #[error("Unknown label: {0}")]
    UnknownLabel(String),
}
