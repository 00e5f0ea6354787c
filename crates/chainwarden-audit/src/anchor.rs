//! Anchors: externally stored snapshots of a chain's root hash.
//!
//! Anchors live in their own namespace, keyed by date:
//!
//! ```text
//! <anchor root>/<YYYY>/<MM>/<DD>/<chain_id>_root.json
//! ```
//!
//! A second anchor for the same chain on the same day is written as
//! `<chain_id>_root_<sequence>.json`. By default the anchor root is the
//! `anchors/` directory of the chain root, but it can be any backend so that
//! anchors survive an attacker who controls the entry storage.

use std::path::Path;
use std::sync::Arc;

use chainwarden_crypto::Digest;
use chainwarden_storage::{StorageBackend, StorageError, join_key, key_name};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AuditError, AuditResult};

/// Directory under a chain root holding its anchors by default.
pub const ANCHOR_DIR: &str = "anchors";

/// A snapshot of a chain's root hash at a known sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Chain the anchor belongs to.
    pub chain_id: String,
    /// Sequence of the entry whose hash was snapshotted.
    pub sequence_at_anchor: u64,
    /// `entry_hash` at that sequence.
    pub root_hash: Digest,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Opaque signature issued by the anchoring service. Carried, not checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Anchor {
    /// Create an unsigned anchor.
    #[must_use]
    pub fn new(
        chain_id: impl Into<String>,
        sequence_at_anchor: u64,
        root_hash: Digest,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            sequence_at_anchor,
            root_hash,
            created_at,
            signature: None,
        }
    }

    /// Parse anchor JSON read from `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::CorruptEntry`] if the bytes are not an anchor.
    pub fn parse(key: &str, bytes: &[u8]) -> AuditResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| AuditError::CorruptEntry {
            key: key.to_owned(),
            reason: format!("invalid anchor: {e}"),
        })
    }

    /// Load a single anchor file from the local filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be read, or
    /// [`AuditError::CorruptEntry`] if it is not an anchor.
    pub async fn load_file(path: &Path) -> AuditResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&path.display().to_string(), &bytes)
    }

    /// Date-partitioned key for this anchor, relative to the anchor root.
    #[must_use]
    pub fn relative_key(&self) -> String {
        format!(
            "{}/{}_root.json",
            self.created_at.format("%Y/%m/%d"),
            self.chain_id
        )
    }

    fn fallback_key(&self) -> String {
        format!(
            "{}/{}_root_{}.json",
            self.created_at.format("%Y/%m/%d"),
            self.chain_id,
            self.sequence_at_anchor
        )
    }
}

/// Reads and writes anchors under one anchor root.
#[derive(Debug, Clone)]
pub struct AnchorStore {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
}

impl AnchorStore {
    /// Anchor store rooted at `prefix` on `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// The default store for a chain: `<chain root>/anchors`.
    #[must_use]
    pub fn for_chain_root(backend: Arc<dyn StorageBackend>, chain_root: &str) -> Self {
        Self::new(backend, join_key(chain_root, ANCHOR_DIR))
    }

    /// Human-readable location.
    #[must_use]
    pub fn location(&self) -> String {
        crate::storage::describe_root(self.backend.as_ref(), &self.prefix)
    }

    /// Every anchor recorded for `chain_id`, ordered by `sequence_at_anchor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the anchor root cannot be listed or read, if an
    /// anchor file is corrupt, or if a file named for `chain_id` records a
    /// different chain.
    pub async fn list(&self, chain_id: &str) -> AuditResult<Vec<Anchor>> {
        let exact = format!("{chain_id}_root.json");
        let numbered = format!("{chain_id}_root_");

        let keys = self.backend.list(&self.prefix).await?;
        let mut anchors = Vec::new();
        for key in keys {
            let name = key_name(&key);
            let is_chain_anchor = name == exact
                || name
                    .strip_prefix(&numbered)
                    .and_then(|rest| rest.strip_suffix(".json"))
                    .is_some_and(|seq| !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()));
            if !is_chain_anchor {
                continue;
            }

            let bytes = self.backend.get(&key).await?;
            let anchor = Anchor::parse(&key, &bytes)?;
            if anchor.chain_id != chain_id {
                return Err(AuditError::ChainIdMismatch {
                    expected: chain_id.to_owned(),
                    found: anchor.chain_id,
                });
            }
            anchors.push(anchor);
        }

        anchors.sort_by(|a, b| {
            a.sequence_at_anchor
                .cmp(&b.sequence_at_anchor)
                .then(a.created_at.cmp(&b.created_at))
        });
        debug!(chain_id, count = anchors.len(), location = %self.location(), "Listed anchors");
        Ok(anchors)
    }

    /// Record an anchor, returning the key it was written under.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or both the daily key and
    /// the sequence-suffixed key are already taken.
    pub async fn write(&self, anchor: &Anchor) -> AuditResult<String> {
        let bytes = serde_json::to_vec_pretty(anchor)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let key = join_key(&self.prefix, &anchor.relative_key());
        let key = match self.backend.put(&key, bytes.clone()).await {
            Ok(()) => key,
            Err(StorageError::AlreadyExists(_)) => {
                let fallback = join_key(&self.prefix, &anchor.fallback_key());
                self.backend.put(&fallback, bytes).await?;
                fallback
            },
            Err(e) => return Err(e.into()),
        };

        info!(
            chain_id = %anchor.chain_id,
            sequence = anchor.sequence_at_anchor,
            root = %anchor.root_hash.short(),
            key = %key,
            "Anchor written"
        );
        Ok(key)
    }
}
