//! Error types for shepherd.

use thiserror::Error;

/// Main error type for shepherd.
#[derive(Error, Debug)]
pub enum ShepherdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Supervisor error: {0}")]
    Supervisor(String),

    #[error("System call failed: {0}")]
    Sys(#[from] nix::Error),
}

/// Result type alias for shepherd operations.
pub type Result<T> = std::result::Result<T, ShepherdError>;
