//! In-memory backend with fault injection, for tests.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{BackendKind, StorageBackend, normalize_prefix, validate_key};
use crate::error::{StorageError, StorageResult};

/// An in-memory [`StorageBackend`].
///
/// Behaves like an object store by default. Latency and transient failures
/// can be injected to exercise cancellation, timeouts and error
/// classification without a network.
#[derive(Debug)]
pub struct MemoryBackend {
    kind: BackendKind,
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    get_delay: Option<Duration>,
    failures: RwLock<HashMap<String, u32>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: BackendKind::ObjectStore,
            data: RwLock::new(BTreeMap::new()),
            get_delay: None,
            failures: RwLock::new(HashMap::new()),
        }
    }

    /// Report a different backend kind.
    #[must_use]
    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sleep for `delay` before every `get`.
    #[must_use]
    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    /// Make the next `times` reads of `key` fail with
    /// [`StorageError::Transient`].
    pub async fn fail_transiently(&self, key: impl Into<String>, times: u32) {
        self.failures.write().await.insert(key.into(), times);
    }

    /// Replace an object, bypassing write-once. Simulates tampering.
    pub async fn overwrite(&self, key: impl Into<String>, value: Vec<u8>) {
        self.data.write().await.insert(key.into(), value);
    }

    /// Delete an object. Simulates tampering.
    pub async fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.data.write().await.remove(key)
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    async fn take_failure(&self, key: &str) -> bool {
        let mut failures = self.failures.write().await;
        match failures.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining = remaining.saturating_sub(1);
                true
            },
            _ => false,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn describe(&self) -> String {
        "memory://".to_owned()
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_failure(key).await {
            return Err(StorageError::Transient(format!(
                "{key}: injected failure"
            )));
        }
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_owned()))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = normalize_prefix(prefix);
        let scope = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        let data = self.data.read().await;
        Ok(data
            .keys()
            .filter(|key| key.starts_with(&scope))
            .cloned()
            .collect())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        let mut data = self.data.write().await;
        if data.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_owned()));
        }
        data.insert(key.to_owned(), value);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.data.read().await.contains_key(key))
    }
}
