//! Deterministic chain fixtures.

use std::collections::BTreeMap;
use std::sync::Arc;

use chainwarden_audit::{Anchor, ChainEntry, ChainManifest, ChainWriter, EntryLocator};
use chainwarden_crypto::{Digest, HashAlgorithm};
use chainwarden_storage::{StorageBackend, join_key};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};

use crate::store::TestStore;

const LABELS: [&str; 4] = ["created", "updated", "approved", "settled"];

/// A fixed point in time, offset by `offset_secs`.
///
/// # Panics
///
/// Panics if the offset overflows the calendar.
#[must_use]
pub fn fixture_time(offset_secs: i64) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
        .single()
        .expect("valid fixture date");
    base.checked_add_signed(Duration::seconds(offset_secs))
        .expect("fixture time in range")
}

/// Payload of entry `sequence` in chain `chain_id`. Nested and with keys
/// out of order, so canonicalization is exercised.
#[must_use]
pub fn fixture_payload(chain_id: &str, sequence: u64) -> Value {
    json!({
        "seq": sequence,
        "actor": {"role": "clerk", "id": format!("user-{}", sequence % 3)},
        "chain": chain_id,
        "amount": {"value": sequence.saturating_mul(100), "currency": "EUR"},
        "tags": ["audit", chain_id],
    })
}

/// Builder for a chain written through [`ChainWriter`].
#[derive(Debug, Clone)]
pub struct ChainFixture {
    chain_id: String,
    root: String,
    len: u64,
    algorithm: HashAlgorithm,
    anchors_at: Vec<u64>,
    labels: bool,
}

impl ChainFixture {
    /// A chain of `len` entries, rooted at a directory named after the id.
    #[must_use]
    pub fn new(chain_id: impl Into<String>, len: u64) -> Self {
        let chain_id = chain_id.into();
        Self {
            root: chain_id.clone(),
            chain_id,
            len,
            algorithm: HashAlgorithm::default(),
            anchors_at: Vec::new(),
            labels: true,
        }
    }

    /// Write under `root` instead.
    #[must_use]
    pub fn at_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Link with `algorithm`.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Snapshot an anchor right after entry `sequence` is written.
    #[must_use]
    pub fn with_anchor_at(mut self, sequence: u64) -> Self {
        self.anchors_at.push(sequence);
        self
    }

    /// Name entry files by sequence only.
    #[must_use]
    pub fn without_labels(mut self) -> Self {
        self.labels = false;
        self
    }

    /// Write the chain into `store`.
    ///
    /// # Panics
    ///
    /// Panics if any write fails.
    pub async fn build(&self, store: &TestStore) -> BuiltChain {
        self.build_on(store.backend()).await
    }

    /// Write the chain into `backend`.
    ///
    /// # Panics
    ///
    /// Panics if any write fails.
    pub async fn build_on(&self, backend: Arc<dyn StorageBackend>) -> BuiltChain {
        let mut writer = ChainWriter::create(Arc::clone(&backend), &self.root, self.chain_id.as_str())
            .await
            .expect("create chain")
            .with_algorithm(self.algorithm)
            .with_created_at(fixture_time(0));

        let mut entries = Vec::new();
        let mut anchors = Vec::new();
        let mut originals = BTreeMap::new();
        let mut offset: i64 = 0;

        for sequence in 0..self.len {
            offset = offset.saturating_add(60);
            let label = self
                .labels
                .then(|| LABELS[usize::try_from(sequence).unwrap_or(0) % LABELS.len()]);
            let entry = writer
                .append_at(label, fixture_payload(&self.chain_id, sequence), fixture_time(offset))
                .await
                .expect("append entry");

            let key = join_key(&self.root, &EntryLocator::file_name(sequence, label));
            let bytes = backend.get(&key).await.expect("read back entry");
            originals.insert(sequence, (key, bytes));
            entries.push(entry);

            if self.anchors_at.contains(&sequence) {
                anchors.push(writer.anchor(fixture_time(offset)).await.expect("write anchor"));
            }
        }

        let manifest = writer.finish().await.expect("finish chain");
        BuiltChain {
            chain_id: self.chain_id.clone(),
            root: self.root.clone(),
            manifest,
            entries,
            anchors,
            originals,
        }
    }
}

/// A chain as written, with the original bytes of every entry.
#[derive(Debug, Clone)]
pub struct BuiltChain {
    /// Chain id.
    pub chain_id: String,
    /// Chain root key.
    pub root: String,
    /// Manifest as written.
    pub manifest: ChainManifest,
    /// Entries in sequence order.
    pub entries: Vec<ChainEntry>,
    /// Anchors in the order they were taken.
    pub anchors: Vec<Anchor>,
    /// Key and stored bytes of each entry, by sequence.
    pub originals: BTreeMap<u64, (String, Vec<u8>)>,
}

impl BuiltChain {
    /// Storage key of entry `sequence`.
    ///
    /// # Panics
    ///
    /// Panics if the chain has no such entry.
    #[must_use]
    pub fn entry_key(&self, sequence: u64) -> &str {
        &self
            .originals
            .get(&sequence)
            .expect("sequence within chain")
            .0
    }

    /// Hash of the last entry.
    ///
    /// # Panics
    ///
    /// Panics if the chain is empty.
    #[must_use]
    pub fn tip(&self) -> Digest {
        self.entries.last().expect("non-empty chain").entry_hash
    }

    /// Entry hashes in sequence order.
    #[must_use]
    pub fn hashes(&self) -> Vec<Digest> {
        self.entries.iter().map(|e| e.entry_hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_is_deterministic_across_backends() {
        let mut tips = Vec::new();
        for store in TestStore::all() {
            let built = ChainFixture::new("ledger", 6).with_anchor_at(2).build(&store).await;
            assert_eq!(built.manifest.declared_length, 6);
            assert_eq!(built.anchors.len(), 1);
            assert_eq!(built.anchors[0].root_hash, built.hashes()[2]);
            assert!(built.entry_key(1).ends_with("000001_updated.json"));
            tips.push(built.tip());
        }
        assert!(tips.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_fixture_time_is_fixed() {
        assert_eq!(fixture_time(0).to_rfc3339(), "2026-01-01T09:00:00+00:00");
        assert_eq!(
            fixture_time(60).signed_duration_since(fixture_time(0)),
            Duration::seconds(60)
        );
    }
}
