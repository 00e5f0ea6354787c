//! Tampering with stored chains, the way an attacker with write access to
//! the storage would.

use chainwarden_audit::{ChainEntry, EntryLocator, EntryRecord, MANIFEST_FILE, canonical_bytes};
use chainwarden_crypto::HashLinker;
use chainwarden_storage::join_key;
use serde_json::Value;

use crate::fixtures::{BuiltChain, fixture_time};
use crate::store::TestStore;

/// Replace entry `sequence`'s payload, keeping its stored hashes.
///
/// # Panics
///
/// Panics if the entry does not exist or the write fails.
pub async fn tamper_payload(store: &TestStore, chain: &BuiltChain, sequence: u64, payload: Value) {
    let entry = entry(chain, sequence);
    let mut record = EntryRecord::from(entry);
    record.payload = payload;
    let bytes = serde_json::to_vec_pretty(&record).expect("serialize entry");
    overwrite_entry_raw(store, chain, sequence, bytes).await;
}

/// Replace entry `sequence`'s stored bytes verbatim.
///
/// # Panics
///
/// Panics if the entry does not exist or the write fails.
pub async fn overwrite_entry_raw(store: &TestStore, chain: &BuiltChain, sequence: u64, bytes: Vec<u8>) {
    store
        .raw()
        .overwrite_raw(chain.entry_key(sequence), bytes)
        .await
        .expect("overwrite entry");
}

/// Delete entry `sequence`.
///
/// # Panics
///
/// Panics if the entry does not exist or the delete fails.
pub async fn delete_entry(store: &TestStore, chain: &BuiltChain, sequence: u64) {
    store
        .raw()
        .remove_raw(chain.entry_key(sequence))
        .await
        .expect("delete entry");
}

/// Put back the bytes entry `sequence` was written with.
///
/// # Panics
///
/// Panics if the entry was never written or the write fails.
pub async fn restore_entry(store: &TestStore, chain: &BuiltChain, sequence: u64) {
    let (key, bytes) = chain.originals.get(&sequence).expect("original entry");
    store
        .raw()
        .overwrite_raw(key, bytes.clone())
        .await
        .expect("restore entry");
}

/// Append a correctly linked entry past the declared length, without
/// touching the manifest. Returns the forged entry's key.
///
/// # Panics
///
/// Panics if the chain is empty or the write fails.
pub async fn forge_extension(store: &TestStore, chain: &BuiltChain, payload: Value) -> String {
    let sequence = chain.manifest.declared_length;
    let prev_hash = chain.tip();
    let hash = HashLinker::new(chain.manifest.hash_algorithm).link(&canonical_bytes(&payload), &prev_hash);
    let record = EntryRecord {
        sequence: Some(sequence),
        payload,
        prev_hash,
        hash,
        timestamp: fixture_time(86_400),
    };

    let key = join_key(&chain.root, &EntryLocator::file_name(sequence, Some("forged")));
    let bytes = serde_json::to_vec_pretty(&record).expect("serialize entry");
    store.raw().overwrite_raw(&key, bytes).await.expect("write forged entry");
    key
}

/// Rewrite the manifest with a different declared length.
///
/// # Panics
///
/// Panics if the write fails.
pub async fn set_declared_length(store: &TestStore, chain: &BuiltChain, declared_length: u64) {
    let mut manifest = chain.manifest.clone();
    manifest.declared_length = declared_length;
    let bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
    store
        .raw()
        .overwrite_raw(&join_key(&chain.root, MANIFEST_FILE), bytes)
        .await
        .expect("rewrite manifest");
}

fn entry(chain: &BuiltChain, sequence: u64) -> &ChainEntry {
    chain
        .entries
        .iter()
        .find(|e| e.sequence == sequence)
        .expect("sequence within chain")
}
