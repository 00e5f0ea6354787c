//! Backends under test, with raw write access for tampering.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chainwarden_storage::{
    FsBackend, MemoryBackend, ObjectStoreBackend, StorageBackend, StorageError, StorageResult,
};
use tempfile::TempDir;

/// Writes that bypass the write-once rule, as an attacker with storage
/// access could.
#[async_trait]
pub trait RawAccess: Send + Sync + fmt::Debug {
    /// Replace (or create) the object at `key`.
    async fn overwrite_raw(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()>;

    /// Delete the object at `key`.
    async fn remove_raw(&self, key: &str) -> StorageResult<()>;
}

#[async_trait]
impl RawAccess for MemoryBackend {
    async fn overwrite_raw(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.overwrite(key, bytes).await;
        Ok(())
    }

    async fn remove_raw(&self, key: &str) -> StorageResult<()> {
        self.remove(key)
            .await
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_owned()))
    }
}

#[async_trait]
impl RawAccess for FsBackend {
    async fn overwrite_raw(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        let path = self
            .local_path(key)
            .ok_or_else(|| StorageError::InvalidKey(key.to_owned()))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| io(key, source))?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|source| io(key, source))
    }

    async fn remove_raw(&self, key: &str) -> StorageResult<()> {
        let path = self
            .local_path(key)
            .ok_or_else(|| StorageError::InvalidKey(key.to_owned()))?;
        tokio::fs::remove_file(&path).await.map_err(|source| io(key, source))
    }
}

#[async_trait]
impl RawAccess for ObjectStoreBackend {
    async fn overwrite_raw(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.operator()
            .write(key, bytes)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    async fn remove_raw(&self, key: &str) -> StorageResult<()> {
        self.operator()
            .delete(key)
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

fn io(key: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_owned(),
        source,
    }
}

/// A backend for a test, plus raw access to the same objects.
#[derive(Debug, Clone)]
pub struct TestStore {
    name: &'static str,
    backend: Arc<dyn StorageBackend>,
    raw: Arc<dyn RawAccess>,
    _dir: Option<Arc<TempDir>>,
}

impl TestStore {
    /// A filesystem backend in a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn fs() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let fs = Arc::new(FsBackend::new(dir.path()));
        Self {
            name: "fs",
            backend: Arc::clone(&fs) as Arc<dyn StorageBackend>,
            raw: fs,
            _dir: Some(Arc::new(dir)),
        }
    }

    /// The opendal in-memory object store.
    ///
    /// # Panics
    ///
    /// Panics if the operator cannot be built.
    #[must_use]
    pub fn object_store() -> Self {
        let store = Arc::new(ObjectStoreBackend::memory().expect("failed to build memory operator"));
        Self {
            name: "object_store",
            backend: Arc::clone(&store) as Arc<dyn StorageBackend>,
            raw: store,
            _dir: None,
        }
    }

    /// The fault-injecting [`MemoryBackend`].
    #[must_use]
    pub fn memory() -> Self {
        Self::with_memory(Arc::new(MemoryBackend::new()))
    }

    /// Wrap a configured [`MemoryBackend`] (latency, failures).
    #[must_use]
    pub fn with_memory(memory: Arc<MemoryBackend>) -> Self {
        Self {
            name: "memory",
            backend: Arc::clone(&memory) as Arc<dyn StorageBackend>,
            raw: memory,
            _dir: None,
        }
    }

    /// One of each backend.
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![Self::fs(), Self::object_store(), Self::memory()]
    }

    /// Short backend name, for assertion messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The backend as the verifier sees it.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.backend)
    }

    /// Raw access to the same objects.
    #[must_use]
    pub fn raw(&self) -> &dyn RawAccess {
        self.raw.as_ref()
    }

    /// Local directory backing `key`, for the filesystem backend.
    #[must_use]
    pub fn local_path(&self, key: &str) -> Option<PathBuf> {
        self.backend.local_path(key)
    }
}
