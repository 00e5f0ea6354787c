//! Chain manifests.

use chainwarden_crypto::HashAlgorithm;
use chainwarden_storage::BackendKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of a chain's manifest, directly under the chain root.
pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// Identity and expected shape of one chain.
///
/// Written once by the producer and immutable afterwards. The verifier
/// compares `declared_length` against the entries it finds to detect
/// truncation and unexpected extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainManifest {
    /// Chain identifier, unique per storage root.
    pub chain_id: String,
    /// Number of entries the chain is expected to hold.
    pub declared_length: u64,
    /// Which backend family the chain was written to.
    pub backend: BackendKind,
    /// When the chain was initialized.
    pub created_at: DateTime<Utc>,
    /// Link hash algorithm. Absent means SHA-256.
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl ChainManifest {
    /// Create a manifest with the default hash algorithm.
    #[must_use]
    pub fn new(
        chain_id: impl Into<String>,
        declared_length: u64,
        backend: BackendKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            declared_length,
            backend,
            created_at,
            hash_algorithm: HashAlgorithm::default(),
        }
    }

    /// Use a different hash algorithm.
    #[must_use]
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_defaults_to_sha256() {
        let manifest: ChainManifest = serde_json::from_str(
            r#"{"chain_id":"orders","declared_length":5,"backend":"filesystem","created_at":"2026-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        assert_eq!(manifest.chain_id, "orders");
        assert_eq!(manifest.declared_length, 5);
        assert_eq!(manifest.backend, BackendKind::Filesystem);
        assert_eq!(manifest.hash_algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_rejects_negative_length() {
        let result: Result<ChainManifest, _> = serde_json::from_str(
            r#"{"chain_id":"x","declared_length":-1,"backend":"filesystem","created_at":"2026-01-02T03:04:05Z"}"#,
        );
        assert!(result.is_err());
    }
}
