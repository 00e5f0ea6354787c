//! Producer-side chain writer.

use std::sync::Arc;

use chainwarden_crypto::{Digest, GENESIS, HashAlgorithm, HashLinker};
use chainwarden_storage::{StorageBackend, join_key, normalize_prefix, validate_key};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::anchor::{Anchor, AnchorStore};
use crate::canonical::canonical_bytes;
use crate::entry::{ChainEntry, EntryLocator, EntryRecord, validate_label};
use crate::error::{AuditError, AuditResult};
use crate::manifest::{ChainManifest, MANIFEST_FILE};

/// Appends hash-linked entries to a new chain.
///
/// Entries are written as they are appended. The manifest, which fixes the
/// declared length, is written by [`ChainWriter::finish`].
#[derive(Debug)]
pub struct ChainWriter {
    backend: Arc<dyn StorageBackend>,
    root: String,
    chain_id: String,
    linker: HashLinker,
    anchors: AnchorStore,
    created_at: DateTime<Utc>,
    next_sequence: u64,
    tip: Digest,
}

impl ChainWriter {
    /// Start a new chain at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidLabel`] if `chain_id` cannot be used in a
    /// key, or [`AuditError::Storage`] if a manifest already exists there.
    pub async fn create(
        backend: Arc<dyn StorageBackend>,
        root: &str,
        chain_id: impl Into<String>,
    ) -> AuditResult<Self> {
        let chain_id = chain_id.into();
        validate_label(&chain_id)?;
        let root = normalize_prefix(root).to_owned();

        let manifest_key = join_key(&root, MANIFEST_FILE);
        validate_key(&manifest_key)?;
        if backend.exists(&manifest_key).await? {
            return Err(chainwarden_storage::StorageError::AlreadyExists(manifest_key).into());
        }

        let anchors = AnchorStore::for_chain_root(Arc::clone(&backend), &root);
        Ok(Self {
            backend,
            root,
            chain_id,
            linker: HashLinker::default(),
            anchors,
            created_at: Utc::now(),
            next_sequence: 0,
            tip: GENESIS,
        })
    }

    /// Link with `algorithm` instead of SHA-256. Call before appending.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.linker = HashLinker::new(algorithm);
        self
    }

    /// Write anchors to `anchors` instead of `<root>/anchors`.
    #[must_use]
    pub fn with_anchor_store(mut self, anchors: AnchorStore) -> Self {
        self.anchors = anchors;
        self
    }

    /// Override the manifest's creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// The chain id.
    #[must_use]
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Entries appended so far.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.next_sequence
    }

    /// Whether nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next_sequence == 0
    }

    /// Hash of the last appended entry, or [`GENESIS`].
    #[must_use]
    pub fn tip(&self) -> Digest {
        self.tip
    }

    /// Append an entry stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`ChainWriter::append_at`].
    pub async fn append(&mut self, label: Option<&str>, payload: Value) -> AuditResult<ChainEntry> {
        self.append_at(label, payload, Utc::now()).await
    }

    /// Append an entry with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidLabel`] for unusable labels, or a storage
    /// error if the entry cannot be written.
    pub async fn append_at(
        &mut self,
        label: Option<&str>,
        payload: Value,
        timestamp: DateTime<Utc>,
    ) -> AuditResult<ChainEntry> {
        if let Some(label) = label {
            validate_label(label)?;
        }

        let sequence = self.next_sequence;
        let entry_hash = self.linker.link(&canonical_bytes(&payload), &self.tip);
        let entry = ChainEntry {
            sequence,
            label: label.map(str::to_owned),
            payload,
            prev_hash: self.tip,
            entry_hash,
            timestamp,
        };

        let bytes = serde_json::to_vec_pretty(&EntryRecord::from(&entry))
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        let key = join_key(&self.root, &EntryLocator::file_name(sequence, label));
        self.backend.put(&key, bytes).await?;

        debug!(chain_id = %self.chain_id, sequence, hash = %entry_hash.short(), "Entry appended");

        self.tip = entry_hash;
        self.next_sequence = sequence.saturating_add(1);
        Ok(entry)
    }

    /// Snapshot the current tip into the anchor store.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EmptyChain`] if nothing has been appended, or
    /// an error from the anchor store.
    pub async fn anchor(&self, created_at: DateTime<Utc>) -> AuditResult<Anchor> {
        let Some(sequence) = self.next_sequence.checked_sub(1) else {
            return Err(AuditError::EmptyChain {
                chain_id: self.chain_id.clone(),
            });
        };
        let anchor = Anchor::new(self.chain_id.clone(), sequence, self.tip, created_at);
        self.anchors.write(&anchor).await?;
        Ok(anchor)
    }

    /// Write the manifest, declaring the current length.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the manifest cannot be written.
    pub async fn finish(self) -> AuditResult<ChainManifest> {
        let manifest = ChainManifest::new(
            self.chain_id.clone(),
            self.next_sequence,
            self.backend.kind(),
            self.created_at,
        )
        .with_hash_algorithm(self.linker.algorithm());

        let bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        self.backend
            .put(&join_key(&self.root, MANIFEST_FILE), bytes)
            .await?;

        info!(
            chain_id = %manifest.chain_id,
            declared_length = manifest.declared_length,
            tip = %self.tip.short(),
            "Chain sealed"
        );
        Ok(manifest)
    }
}
