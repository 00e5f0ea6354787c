//! Typed chain access over a raw [`StorageBackend`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chainwarden_storage::{StorageBackend, join_key, normalize_prefix};
use tracing::debug;

use crate::anchor::{Anchor, AnchorStore};
use crate::entry::{ChainEntry, EntryLocator, EntryRecord};
use crate::error::{AuditError, AuditResult};
use crate::manifest::{ChainManifest, MANIFEST_FILE};

/// Read access to one chain.
///
/// Every method is read-only. Implementations may block on network I/O;
/// the verifier bounds each call with its cancellation token and deadline.
#[async_trait]
pub trait ChainStorage: Send + Sync + fmt::Debug {
    /// Human-readable location of the chain root.
    fn location(&self) -> String;

    /// Load the chain's manifest.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ManifestNotFound`] if absent, or
    /// [`AuditError::CorruptEntry`] if unparseable.
    async fn load_manifest(&self) -> AuditResult<ChainManifest>;

    /// Entry locators ordered by sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain root cannot be listed.
    async fn list_entries(&self) -> AuditResult<Vec<EntryLocator>>;

    /// Read one entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::CorruptEntry`] if the stored content does not
    /// have the entry shape, or a storage error if it cannot be read.
    async fn read_entry(&self, locator: &EntryLocator) -> AuditResult<ChainEntry>;

    /// Anchors for `chain_id`, ordered by `sequence_at_anchor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the anchor namespace cannot be read.
    async fn list_anchors(&self, chain_id: &str) -> AuditResult<Vec<Anchor>>;
}

/// A chain stored as JSON objects under a key prefix of any backend.
#[derive(Debug, Clone)]
pub struct BlobChainStorage {
    backend: Arc<dyn StorageBackend>,
    root: String,
    anchors: AnchorStore,
}

impl BlobChainStorage {
    /// Chain rooted at `root` on `backend`, anchors under `<root>/anchors`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, root: &str) -> Self {
        let root = normalize_prefix(root).to_owned();
        let anchors = AnchorStore::for_chain_root(Arc::clone(&backend), &root);
        Self {
            backend,
            root,
            anchors,
        }
    }

    /// Read anchors from a different store.
    #[must_use]
    pub fn with_anchor_store(mut self, anchors: AnchorStore) -> Self {
        self.anchors = anchors;
        self
    }

    /// Locate a chain under `root`.
    ///
    /// Uses `<root>/MANIFEST.json` if present. Otherwise, when `chain_id` is
    /// given, falls back to `<root>/<chain_id>/MANIFEST.json`. The chain id
    /// recorded in the manifest is checked later by the verifier.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ManifestNotFound`] if neither location holds a
    /// manifest, or a storage error if the backend cannot be queried.
    pub async fn resolve(
        backend: Arc<dyn StorageBackend>,
        root: &str,
        chain_id: Option<&str>,
    ) -> AuditResult<Self> {
        let root = normalize_prefix(root);
        if backend.exists(&join_key(root, MANIFEST_FILE)).await? {
            return Ok(Self::new(backend, root));
        }

        if let Some(chain_id) = chain_id {
            let nested = join_key(root, chain_id);
            if backend.exists(&join_key(&nested, MANIFEST_FILE)).await? {
                debug!(root, chain_id, "Resolved nested chain root");
                return Ok(Self::new(backend, &nested));
            }
        }

        Err(AuditError::ManifestNotFound {
            location: describe_root(backend.as_ref(), root),
        })
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Key prefix of the chain root.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }
}

#[async_trait]
impl ChainStorage for BlobChainStorage {
    fn location(&self) -> String {
        describe_root(self.backend.as_ref(), &self.root)
    }

    async fn load_manifest(&self) -> AuditResult<ChainManifest> {
        let key = join_key(&self.root, MANIFEST_FILE);
        let bytes = match self.backend.get(&key).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(AuditError::ManifestNotFound {
                    location: self.location(),
                });
            },
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| AuditError::CorruptEntry {
            key,
            reason: format!("invalid manifest: {e}"),
        })
    }

    async fn list_entries(&self) -> AuditResult<Vec<EntryLocator>> {
        let keys = self.backend.list(&self.root).await?;
        let scope_len = if self.root.is_empty() {
            0
        } else {
            self.root.len().saturating_add(1)
        };

        // Only direct children; nested chains and anchors live in subdirectories.
        let mut locators: Vec<EntryLocator> = keys
            .iter()
            .filter(|key| key.get(scope_len..).is_some_and(|rest| !rest.contains('/')))
            .filter_map(|key| EntryLocator::parse(key))
            .collect();
        locators.sort();
        Ok(locators)
    }

    async fn read_entry(&self, locator: &EntryLocator) -> AuditResult<ChainEntry> {
        let bytes = self.backend.get(&locator.key).await?;
        EntryRecord::parse(locator, &bytes)
    }

    async fn list_anchors(&self, chain_id: &str) -> AuditResult<Vec<Anchor>> {
        self.anchors.list(chain_id).await
    }
}

/// Display form of `root` on `backend`.
pub(crate) fn describe_root(backend: &dyn StorageBackend, root: &str) -> String {
    let base = backend.describe();
    if root.is_empty() {
        base
    } else if base.ends_with('/') {
        format!("{base}{root}")
    } else {
        format!("{base}/{root}")
    }
}

/// Chain roots under `root`: `root` itself if it holds a manifest, plus
/// every direct subdirectory that does. Sorted by key.
///
/// # Errors
///
/// Returns an error if the backend cannot be listed.
pub async fn discover_chains(backend: &dyn StorageBackend, root: &str) -> AuditResult<Vec<String>> {
    let root = normalize_prefix(root);
    let scope_len = if root.is_empty() {
        0
    } else {
        root.len().saturating_add(1)
    };

    let mut roots: Vec<String> = backend
        .list(root)
        .await?
        .iter()
        .filter_map(|key| {
            let relative = key.get(scope_len..)?;
            if relative == MANIFEST_FILE {
                return Some(root.to_owned());
            }
            let (dir, file) = relative.split_once('/')?;
            (file == MANIFEST_FILE).then(|| join_key(root, dir))
        })
        .collect();
    roots.sort();
    roots.dedup();

    debug!(root, count = roots.len(), "Discovered chains");
    Ok(roots)
}
