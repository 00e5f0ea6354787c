//! Verification results and the violations they carry.

use std::fmt;
use std::time::Duration;

use chainwarden_crypto::{Digest, HashAlgorithm};
use serde::{Deserialize, Serialize};

/// What went wrong at a point in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A recomputed link differs from the stored `hash`, or `prev_hash` does
    /// not point at the previous entry.
    HashMismatch,
    /// An anchor's root hash differs from the recomputed hash at its sequence.
    AnchorMismatch,
    /// The manifest or a listed entry is missing.
    NotFound,
    /// Stored content could not be parsed into the expected shape.
    CorruptEntry,
    /// The number of stored entries differs from the declared length.
    Truncation,
    /// The requested chain id differs from the one found in storage.
    ChainIdMismatch,
    /// Entry sequence numbers are not contiguous from zero.
    SequenceGap,
    /// The backend could not be reached or failed transiently.
    BackendUnavailable,
    /// Verification was cancelled before completing.
    Cancelled,
    /// The per-chain deadline expired before completing.
    Timeout,
    /// Strict mode found no anchor to validate.
    MissingAnchor,
}

impl ViolationKind {
    /// Whether this kind stops the walk regardless of the fail-fast policy.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(
            self,
            Self::HashMismatch | Self::AnchorMismatch | Self::MissingAnchor
        )
    }

    /// Whether this kind is evidence of tampering within a readable chain.
    #[must_use]
    pub const fn is_integrity_finding(self) -> bool {
        matches!(self, Self::HashMismatch | Self::AnchorMismatch)
    }

    /// Whether this kind reflects the environment rather than the chain.
    #[must_use]
    pub const fn is_interruption(self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable | Self::Cancelled | Self::Timeout
        )
    }

    /// Stable `snake_case` name, as serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HashMismatch => "hash_mismatch",
            Self::AnchorMismatch => "anchor_mismatch",
            Self::NotFound => "not_found",
            Self::CorruptEntry => "corrupt_entry",
            Self::Truncation => "truncation",
            Self::ChainIdMismatch => "chain_id_mismatch",
            Self::SequenceGap => "sequence_gap",
            Self::BackendUnavailable => "backend_unavailable",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::MissingAnchor => "missing_anchor",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Sequence the violation applies to, if any.
    pub sequence: Option<u64>,
    /// Kind of violation.
    pub kind: ViolationKind,
    /// Digest the verifier expected.
    pub expected_digest: Option<Digest>,
    /// Digest actually found.
    pub actual_digest: Option<Digest>,
    /// Human-readable context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Violation {
    /// Create a violation with no digests or detail.
    #[must_use]
    pub fn new(kind: ViolationKind, sequence: Option<u64>) -> Self {
        Self {
            sequence,
            kind,
            expected_digest: None,
            actual_digest: None,
            detail: None,
        }
    }

    /// Attach the expected and actual digests.
    #[must_use]
    pub fn with_digests(mut self, expected: Digest, actual: Option<Digest>) -> Self {
        self.expected_digest = Some(expected);
        self.actual_digest = actual;
        self
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(sequence) => write!(f, "{} at sequence {sequence}", self.kind)?,
            None => write!(f, "{}", self.kind)?,
        }
        if let Some(expected) = &self.expected_digest {
            write!(f, " expected={}", expected.short())?;
            match &self.actual_digest {
                Some(actual) => write!(f, " actual={}", actual.short())?,
                None => write!(f, " actual=<none>")?,
            }
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// Outcome of comparing one anchor against the recomputed chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorCheck {
    /// Sequence the anchor snapshots.
    pub sequence_at_anchor: u64,
    /// Root hash recorded in the anchor.
    pub expected_root: Digest,
    /// Recomputed hash at that sequence, absent if the chain is shorter.
    pub actual_root: Option<Digest>,
    /// Whether the two agree.
    pub matched: bool,
}

/// Overall verdict for a chain or a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No violations.
    Pass,
    /// At least one violation.
    Fail,
}

impl Status {
    /// Whether this is [`Status::Pass`].
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Fail => f.write_str("FAIL"),
        }
    }
}

/// The structured result of verifying one chain.
///
/// Field names are stable; downstream tooling consumes the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Chain identifier (from the manifest, or the requested id if the
    /// manifest could not be read).
    pub chain_id: String,
    /// Storage location that was verified.
    pub root: String,
    /// Link hash algorithm used.
    pub hash_algorithm: HashAlgorithm,
    /// Entries whose links were recomputed.
    pub total_entries_checked: u64,
    /// The first violation found.
    pub first_violation: Option<Violation>,
    /// Every violation in discovery order. Empty in fail-fast mode.
    pub all_violations: Vec<Violation>,
    /// Anchor comparisons in ascending sequence order.
    pub anchor_checks: Vec<AnchorCheck>,
    /// Overall verdict.
    pub status: Status,
    /// Wall-clock time spent.
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
}

impl VerificationResult {
    /// Whether the chain passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status.is_pass()
    }

    /// Violations to display: all of them when collected, otherwise the first.
    #[must_use]
    pub fn violations(&self) -> Vec<&Violation> {
        if self.all_violations.is_empty() {
            self.first_violation.iter().collect()
        } else {
            self.all_violations.iter().collect()
        }
    }

    /// Number of anchors that matched.
    #[must_use]
    pub fn anchors_matched(&self) -> usize {
        self.anchor_checks.iter().filter(|c| c.matched).count()
    }

    /// Copy with `elapsed` zeroed, for comparing two runs.
    #[must_use]
    pub fn without_timing(&self) -> Self {
        Self {
            elapsed: Duration::ZERO,
            ..self.clone()
        }
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
