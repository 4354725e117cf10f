//! Backend connector error types
//!
//! Failures a storage connector reports while initializing or listing.

/// Storage backend error types
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Backend not initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Unreachable(_) => true,
            BackendError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}
