//! Rendering verification results for people and for tooling.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AuditError, AuditResult};
use crate::result::{Status, VerificationResult};

/// Artifact format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Machine-readable [`BatchReport`].
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format '{other}'; expected text or json")),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// JSON envelope over the per-chain results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// When the report was rendered.
    pub generated_at: DateTime<Utc>,
    /// `fail` if any chain failed.
    pub status: Status,
    /// Number of chains verified.
    pub chains_total: usize,
    /// Number of chains that failed.
    pub chains_failed: usize,
    /// Entries checked across every chain.
    pub total_entries_checked: u64,
    /// Verification time summed over chains.
    #[serde(rename = "elapsed_ms", with = "crate::result::duration_ms")]
    pub elapsed: Duration,
    /// Per-chain results, in the order given.
    pub chains: Vec<VerificationResult>,
}

impl BatchReport {
    /// Summarize `results`.
    #[must_use]
    pub fn from_results(results: &[VerificationResult]) -> Self {
        let chains_failed = results.iter().filter(|r| !r.passed()).count();
        Self {
            generated_at: Utc::now(),
            status: overall_status(results),
            chains_total: results.len(),
            chains_failed,
            total_entries_checked: results
                .iter()
                .fold(0u64, |acc, r| acc.saturating_add(r.total_entries_checked)),
            elapsed: results
                .iter()
                .fold(Duration::ZERO, |acc, r| acc.saturating_add(r.elapsed)),
            chains: results.to_vec(),
        }
    }
}

/// Worst status across `results`. An empty batch passes.
#[must_use]
pub fn overall_status(results: &[VerificationResult]) -> Status {
    if results.iter().all(VerificationResult::passed) {
        Status::Pass
    } else {
        Status::Fail
    }
}

/// Process exit code for a batch: 0 if every chain passed, 1 otherwise.
#[must_use]
pub fn exit_code(results: &[VerificationResult]) -> i32 {
    match overall_status(results) {
        Status::Pass => 0,
        Status::Fail => 1,
    }
}

/// Render `results` as a report artifact.
///
/// `quiet` drops per-violation lines from the text form; the JSON form is
/// always complete.
///
/// # Errors
///
/// Returns [`AuditError::Serialization`] if JSON encoding fails.
pub fn render(
    results: &[VerificationResult],
    format: ReportFormat,
    quiet: bool,
) -> AuditResult<String> {
    match format {
        ReportFormat::Json => {
            let report = BatchReport::from_results(results);
            let mut json = serde_json::to_string_pretty(&report)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
            json.push('\n');
            Ok(json)
        },
        ReportFormat::Text => Ok(render_text(results, quiet)),
    }
}

fn render_text(results: &[VerificationResult], quiet: bool) -> String {
    let report = BatchReport::from_results(results);
    let mut out = String::new();

    for result in results {
        let _ = writeln!(
            out,
            "{} {} entries={} anchors={}/{} root={} ({}ms)",
            result.status,
            result.chain_id,
            result.total_entries_checked,
            result.anchors_matched(),
            result.anchor_checks.len(),
            result.root,
            result.elapsed.as_millis()
        );
        if !quiet {
            for violation in result.violations() {
                let _ = writeln!(out, "  - {violation}");
            }
        }
    }

    let passed = report.chains_total.saturating_sub(report.chains_failed);
    let _ = writeln!(
        out,
        "{}: {passed}/{} chains passed, {} entries checked in {}ms",
        report.status,
        report.chains_total,
        report.total_entries_checked,
        report.elapsed.as_millis()
    );
    out
}

/// Write a rendered artifact to `path`.
///
/// The write is atomic: a temporary sibling file is written, then renamed.
/// Paths inside any of `protected_roots` (the chains' own storage) are
/// refused.
///
/// # Errors
///
/// Returns [`AuditError::ProtectedPath`] for paths inside a protected root,
/// or [`AuditError::Io`] if the file cannot be written.
pub async fn write_artifact(
    path: &Path,
    artifact: &str,
    protected_roots: &[PathBuf],
) -> AuditResult<()> {
    let target = absolute(path).await;
    for root in protected_roots {
        let root = absolute(root).await;
        if target.starts_with(&root) {
            return Err(AuditError::ProtectedPath(path.to_path_buf()));
        }
    }

    let io_err = |source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = target.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

    tokio::fs::write(&tmp, artifact.as_bytes())
        .await
        .map_err(io_err)?;
    if let Err(e) = tokio::fs::rename(&tmp, &target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(e));
    }

    info!(path = %path.display(), bytes = artifact.len(), "Report written");
    Ok(())
}

/// Absolute, symlink-resolved form of `path`, resolving as much of it as
/// exists.
async fn absolute(path: &Path) -> PathBuf {
    if let Ok(resolved) = tokio::fs::canonicalize(path).await {
        return resolved;
    }
    let joined = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match (joined.parent(), joined.file_name()) {
        (Some(parent), Some(name)) => match tokio::fs::canonicalize(parent).await {
            Ok(parent) => parent.join(name),
            Err(_) => joined,
        },
        _ => joined,
    }
}
