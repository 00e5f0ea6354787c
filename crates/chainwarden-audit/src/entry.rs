//! Chain entries and the file names they are stored under.
//!
//! Each entry is one JSON object at `<sequence>_<label>.json` directly under
//! the chain root, with the sequence zero-padded to six digits. The label is
//! free-form and may be omitted (`<sequence>.json`).

use std::fmt;

use chainwarden_crypto::Digest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuditError, AuditResult};
use crate::manifest::MANIFEST_FILE;

/// Width of the zero-padded sequence prefix in entry file names.
pub const SEQUENCE_WIDTH: usize = 6;

/// One recorded event, as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    /// Label from the file name.
    pub label: Option<String>,
    /// Event payload.
    pub payload: Value,
    /// Stored hash of the previous entry.
    pub prev_hash: Digest,
    /// Stored hash of this entry.
    pub entry_hash: Digest,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// The on-disk shape of an entry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Sequence number; must agree with the file name when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// Event payload.
    pub payload: Value,
    /// Hash of the previous entry.
    pub prev_hash: Digest,
    /// Hash of this entry.
    pub hash: Digest,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

impl EntryRecord {
    /// Parse an entry file located at `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::CorruptEntry`] if the bytes are not an entry
    /// object or its `sequence` field disagrees with the file name.
    pub fn parse(locator: &EntryLocator, bytes: &[u8]) -> AuditResult<ChainEntry> {
        let record: Self =
            serde_json::from_slice(bytes).map_err(|e| AuditError::CorruptEntry {
                key: locator.key.clone(),
                reason: e.to_string(),
            })?;

        if let Some(sequence) = record.sequence
            && sequence != locator.sequence
        {
            return Err(AuditError::CorruptEntry {
                key: locator.key.clone(),
                reason: format!(
                    "sequence field {sequence} disagrees with file name sequence {}",
                    locator.sequence
                ),
            });
        }

        Ok(ChainEntry {
            sequence: locator.sequence,
            label: locator.label.clone(),
            payload: record.payload,
            prev_hash: record.prev_hash,
            entry_hash: record.hash,
            timestamp: record.timestamp,
        })
    }
}

impl From<&ChainEntry> for EntryRecord {
    fn from(entry: &ChainEntry) -> Self {
        Self {
            sequence: Some(entry.sequence),
            payload: entry.payload.clone(),
            prev_hash: entry.prev_hash,
            hash: entry.entry_hash,
            timestamp: entry.timestamp,
        }
    }
}

/// Where an entry lives, derived from its file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryLocator {
    /// Sequence parsed from the file name.
    pub sequence: u64,
    /// Label parsed from the file name.
    pub label: Option<String>,
    /// Full storage key.
    pub key: String,
}

impl EntryLocator {
    /// Parse a storage key whose final component is an entry file name.
    ///
    /// Returns `None` for anything that is not `<digits>[_<label>].json`,
    /// including the manifest.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        let name = chainwarden_storage::key_name(key);
        if name == MANIFEST_FILE {
            return None;
        }
        let stem = name.strip_suffix(".json")?;
        let (digits, label) = match stem.split_once('_') {
            Some((digits, label)) => (digits, Some(label)),
            None => (stem, None),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if label.is_some_and(str::is_empty) {
            return None;
        }
        let sequence = digits.parse().ok()?;
        Some(Self {
            sequence,
            label: label.map(str::to_owned),
            key: key.to_owned(),
        })
    }

    /// File name for an entry.
    #[must_use]
    pub fn file_name(sequence: u64, label: Option<&str>) -> String {
        match label {
            Some(label) => format!("{sequence:0width$}_{label}.json", width = SEQUENCE_WIDTH),
            None => format!("{sequence:0width$}.json", width = SEQUENCE_WIDTH),
        }
    }
}

impl fmt::Display for EntryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Check that `label` can be embedded in an entry file name.
///
/// # Errors
///
/// Returns [`AuditError::InvalidLabel`] for empty labels and labels with
/// characters other than ASCII alphanumerics, `-`, `_` and `.`.
pub fn validate_label(label: &str) -> AuditResult<()> {
    if label.is_empty() {
        return Err(AuditError::InvalidLabel("label must not be empty".into()));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(AuditError::InvalidLabel(label.to_owned()));
    }
    Ok(())
}
