//! Error types shared across imex crates

use thiserror::Error;

/// Result type alias for imex configuration and setup code
pub type Result<T> = std::result::Result<T, ImexError>;

/// Errors raised while configuring or bootstrapping a process
#[derive(Error, Debug)]
pub enum ImexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ImexError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a logging setup error
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }
}
