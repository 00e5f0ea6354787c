//! The [`StorageBackend`] trait and key helpers shared by every backend.
//!
//! Keys are `/`-separated names relative to the backend root, mirroring
//! object-store keys. The filesystem backend maps them onto paths.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Which family of storage a backend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local filesystem directory.
    Filesystem,
    /// S3-compatible object storage.
    ObjectStore,
}

impl BackendKind {
    /// Short name used on the command line (`fs` or `s3`).
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Filesystem => "fs",
            Self::ObjectStore => "s3",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => write!(f, "filesystem"),
            Self::ObjectStore => write!(f, "object_store"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fs" | "filesystem" | "file" => Ok(Self::Filesystem),
            "s3" | "object_store" | "objectstore" => Ok(Self::ObjectStore),
            other => Err(StorageError::Connection(format!(
                "unknown backend '{other}'; expected fs or s3"
            ))),
        }
    }
}

/// Uniform byte-level access to a chain's storage root.
///
/// Implementations must be thread-safe. Objects are write-once: `put` on an
/// existing key fails with [`StorageError::AlreadyExists`].
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// The backend family.
    fn kind(&self) -> BackendKind;

    /// Human-readable location (path or URI) for logs and reports.
    fn describe(&self) -> String;

    /// Read an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key does not exist.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// List every object key under `prefix`, recursively.
    ///
    /// `prefix` names a directory-like scope (`""` for the whole backend).
    /// Keys are returned sorted lexicographically. A missing prefix yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be listed.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Write a new object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the key is taken.
    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Check whether an object exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Local path backing `key`, for backends that live on this machine.
    fn local_path(&self, _key: &str) -> Option<PathBuf> {
        None
    }
}

/// Join a prefix and a relative name into a key.
#[must_use]
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_owned()
    } else if name.is_empty() {
        prefix.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Final path component of a key.
#[must_use]
pub fn key_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Normalize a listing prefix: no surrounding slashes.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

/// Validate that a key is safe for storage.
///
/// Keys must be non-empty, relative, free of null bytes, and must not
/// contain `.` or `..` segments.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] describing the first problem found.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "key must be relative: {key}"
        )));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "key has an empty, '.' or '..' segment: {key}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("", "MANIFEST.json"), "MANIFEST.json");
        assert_eq!(join_key("chains/a/", "MANIFEST.json"), "chains/a/MANIFEST.json");
        assert_eq!(join_key("/chains/a", "/anchors"), "chains/a/anchors");
        assert_eq!(join_key("chains", ""), "chains");
    }

    #[test]
    fn test_key_name() {
        assert_eq!(key_name("a/b/000001_x.json"), "000001_x.json");
        assert_eq!(key_name("MANIFEST.json"), "MANIFEST.json");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("chain/000000_start.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("chain/../../etc").is_err());
        assert!(validate_key("chain//x").is_err());
        assert!(validate_key("a\0b").is_err());
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("fs".parse::<BackendKind>().unwrap(), BackendKind::Filesystem);
        assert_eq!("S3".parse::<BackendKind>().unwrap(), BackendKind::ObjectStore);
        assert_eq!(
            "object_store".parse::<BackendKind>().unwrap(),
            BackendKind::ObjectStore
        );
        assert!("ftp".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_serde() {
        let json = serde_json::to_string(&BackendKind::ObjectStore).unwrap();
        assert_eq!(json, "\"object_store\"");
        let kind: BackendKind = serde_json::from_str("\"filesystem\"").unwrap();
        assert_eq!(kind, BackendKind::Filesystem);
    }
}
