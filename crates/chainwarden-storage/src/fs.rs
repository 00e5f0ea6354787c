//! Local filesystem backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::backend::{BackendKind, StorageBackend, normalize_prefix, validate_key};
use crate::error::{StorageError, StorageResult};

/// A [`StorageBackend`] rooted at a local directory.
///
/// Keys map to paths under the root. Keys that would resolve outside the
/// root are rejected before touching the filesystem.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Create a backend rooted at `root` without checking that it exists.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a backend rooted at an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StorageError::NotFound(root.display().to_string()));
        }
        Ok(Self { root })
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let mut resolved = self.root.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "key resolves outside backend root: {key}"
                    )));
                },
            }
        }
        Ok(resolved)
    }

    fn key_for(root: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        let meta = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        if meta.file_type().is_symlink() {
            return Err(StorageError::InvalidKey(format!(
                "{key} is a symbolic link; links are not followed"
            )));
        }
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::from_io(key, e))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = normalize_prefix(prefix);
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.resolve(prefix)?
        };
        let root = self.root.clone();
        let scope = prefix.to_owned();

        // walkdir is blocking; keep it off the async workers.
        let keys = tokio::task::spawn_blocking(move || -> StorageResult<Vec<String>> {
            if !dir.is_dir() {
                return Ok(Vec::new());
            }
            let mut keys = Vec::new();
            for entry in walkdir::WalkDir::new(&dir).follow_links(false) {
                let entry = entry.map_err(|e| {
                    let key = e
                        .path()
                        .and_then(|p| Self::key_for(&root, p))
                        .unwrap_or_else(|| scope.clone());
                    match e.into_io_error() {
                        Some(io) => StorageError::from_io(&key, io),
                        None => StorageError::Internal(format!("filesystem loop under {key}")),
                    }
                })?;
                // Links are listed so reads can reject them by name.
                let kind = entry.file_type();
                if (kind.is_file() || kind.is_symlink())
                    && let Some(key) = Self::key_for(&root, entry.path())
                {
                    keys.push(key);
                }
            }
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| StorageError::Internal(e.to_string()))??;

        debug!(root = %self.root.display(), prefix, count = keys.len(), "Listed keys");
        Ok(keys)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from_io(key, e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        file.write_all(&value)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::from_io(key, e))
    }

    fn local_path(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() {
            return Some(self.root.clone());
        }
        self.resolve(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();

        backend
            .put("chain/000000_start.json", b"{}".to_vec())
            .await
            .unwrap();

        assert_eq!(backend.get("chain/000000_start.json").await.unwrap(), b"{}");
        assert!(backend.exists("chain/000000_start.json").await.unwrap());
        assert!(!backend.exists("chain/000001_next.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();

        backend.put("a.json", b"1".to_vec()).await.unwrap();
        let err = backend.put("a.json", b"2".to_vec()).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(backend.get("a.json").await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();
        let err = backend.get("missing.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();

        for key in [
            "c/000002_b.json",
            "c/000000_a.json",
            "c/anchors/2026/01/02/c_root.json",
            "other/x.json",
        ] {
            backend.put(key, Vec::new()).await.unwrap();
        }

        let keys = backend.list("c").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "c/000000_a.json",
                "c/000002_b.json",
                "c/anchors/2026/01/02/c_root.json",
            ]
        );
        assert_eq!(backend.list("").await.unwrap().len(), 4);
        assert!(backend.list("nope").await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_file_listed_but_not_read() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("elsewhere.json");
        std::fs::write(&target, b"{}").unwrap();

        let backend = FsBackend::open(dir.path()).unwrap();
        backend.put("c/000000_a.json", Vec::new()).await.unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("c/000001_b.json")).unwrap();

        let keys = backend.list("c").await.unwrap();
        assert_eq!(keys, vec!["c/000000_a.json", "c/000001_b.json"]);

        let err = backend.get("c/000001_b.json").await.unwrap_err();
        assert!(matches!(&err, StorageError::InvalidKey(m) if m.contains("symbolic link")));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();
        let err = backend.get("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn test_open_missing_root() {
        let err = FsBackend::open("/nonexistent/chainwarden/root").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_local_path() {
        let backend = FsBackend::new("/data/chains");
        assert_eq!(
            backend.local_path("a/MANIFEST.json"),
            Some(PathBuf::from("/data/chains/a/MANIFEST.json"))
        );
        assert_eq!(backend.local_path(""), Some(PathBuf::from("/data/chains")));
    }
}
