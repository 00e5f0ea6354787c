//! Audit-related error types.

use std::path::PathBuf;

use chainwarden_storage::StorageError;
use thiserror::Error;

use crate::result::ViolationKind;

/// Errors from reading, writing and reporting on audit chains.
///
/// The verifier never returns these; it folds them into violations via
/// [`AuditError::violation_kind`].
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored content could not be parsed into the expected shape.
    #[error("corrupt entry {key}: {reason}")]
    CorruptEntry {
        /// Key of the unreadable object.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No chain manifest at the requested location.
    #[error("chain manifest not found: {location}")]
    ManifestNotFound {
        /// Where the manifest was looked for.
        location: String,
    },

    /// The chain found differs from the one requested.
    #[error("chain id mismatch: expected {expected}, found {found}")]
    ChainIdMismatch {
        /// Requested chain id.
        expected: String,
        /// Chain id found in storage.
        found: String,
    },

    /// Entry label unusable in a key.
    #[error("invalid entry label: {0}")]
    InvalidLabel(String),

    /// An anchor was requested for a chain with no entries.
    #[error("chain {chain_id} has no entries to anchor")]
    EmptyChain {
        /// The empty chain.
        chain_id: String,
    },

    /// Refused to write a report inside a chain's storage root.
    #[error("refusing to write report inside chain storage: {}", .0.display())]
    ProtectedPath(PathBuf),

    /// Local file I/O failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl AuditError {
    /// The violation kind this error is reported as during verification.
    #[must_use]
    pub fn violation_kind(&self) -> ViolationKind {
        match self {
            Self::Storage(StorageError::NotFound(_) | StorageError::InvalidKey(_))
            | Self::ManifestNotFound { .. } => ViolationKind::NotFound,
            Self::Storage(_) => ViolationKind::BackendUnavailable,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ViolationKind::NotFound
            },
            Self::Io { .. } => ViolationKind::BackendUnavailable,
            Self::ChainIdMismatch { .. } => ViolationKind::ChainIdMismatch,
            Self::Serialization(_)
            | Self::CorruptEntry { .. }
            | Self::InvalidLabel(_)
            | Self::EmptyChain { .. }
            | Self::ProtectedPath(_) => ViolationKind::CorruptEntry,
        }
    }
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
