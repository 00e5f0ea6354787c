//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key or item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The key already holds a value and objects are write-once.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The key is malformed or escapes the backend root.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A local I/O operation failed.
    #[error("I/O error on {key}: {source}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A temporary failure (timeout, connection reset, throttling).
    ///
    /// Retrying may succeed; callers must not report it as tampering.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// Backend could not be configured or reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other backend failure.
    #[error("storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether the key does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Map an I/O error on `key` to the closest storage error.
    pub(crate) fn from_io(key: &str, source: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => Self::NotFound(key.to_owned()),
            ErrorKind::AlreadyExists => Self::AlreadyExists(key.to_owned()),
            ErrorKind::TimedOut
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused => Self::Transient(format!("{key}: {source}")),
            _ => Self::Io {
                key: key.to_owned(),
                source,
            },
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
