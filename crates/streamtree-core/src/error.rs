//! Error types for streamtree

use thiserror::Error;

/// Main error type for streamtree operations.
///
/// Parsing itself never fails; errors only surface from configuration
/// loading and from caller-supplied hooks.
#[derive(Error, Debug)]
pub enum StreamtreeError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A token hook failed
    #[error("Hook '{name}' failed: {message}")]
    Hook {
        /// Name of the hook that failed
        name: String,
        /// Failure description
        message: String,
    },
}

impl StreamtreeError {
    /// Build a hook error.
    pub fn hook(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for streamtree operations
pub type Result<T> = std::result::Result<T, StreamtreeError>;
