//! Configuration types.
//!
//! These types have no dependency on the other chainwarden crates. Values
//! that map onto domain enums (backend kind, report and log formats) are
//! kept as strings, checked by [`validate`](crate::validate), and converted
//! by the binary.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Verification policy and limits.
    pub verify: VerifySection,
    /// Where chains are stored.
    pub backend: BackendSection,
    /// Where anchors are stored, if not beside each chain.
    pub anchors: AnchorsSection,
    /// Report rendering.
    pub report: ReportSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

/// Verification policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifySection {
    /// Fail chains that have no anchor to check against.
    pub strict: bool,
    /// Stop each chain at its first violation.
    pub fail_fast: bool,
    /// Chains verified in parallel. Unset means one per core, at most 8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Deadline for a single chain, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_timeout_secs: Option<u64>,
    /// Deadline for the whole batch, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_timeout_secs: Option<u64>,
}

impl Default for VerifySection {
    fn default() -> Self {
        Self {
            strict: false,
            fail_fast: true,
            concurrency: None,
            chain_timeout_secs: None,
            batch_timeout_secs: None,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// `"fs"` or `"s3"`.
    pub kind: String,
    /// S3 settings, used when `kind = "s3"`.
    pub s3: S3Section,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: "fs".to_owned(),
            s3: S3Section::default(),
        }
    }
}

/// S3-compatible object store settings. Credentials come from the standard
/// AWS environment, never from this file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Section {
    /// Bucket name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Key prefix under which chains live.
    pub prefix: String,
    /// Region; the SDK default is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Anchor namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorsSection {
    /// Separate anchor root: a directory or `s3://bucket/prefix`. Unset means
    /// `<chain root>/anchors`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// Report rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// `"text"` or `"json"`.
    pub format: String,
    /// Omit per-violation lines from text output.
    pub quiet: bool,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            format: "text".to_owned(),
            quiet: false,
        }
    }
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate directives (e.g. `["chainwarden_storage=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
