//! Verify command - check one chain or a batch of chains.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chainwarden_audit::{
    Anchor, AnchorStore, ChainTarget, ReportFormat, VerificationResult, discover_chains,
    exit_code, render, write_artifact,
};
use chainwarden_config::{Config, validate};
use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config_bridge;
use crate::location::{self, Location, Opened};
use crate::theme::Theme;

/// Storage backend for locations that are not `s3://` URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackendArg {
    /// Local filesystem.
    Fs,
    /// S3-compatible object store.
    S3,
}

/// Report format on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    /// Human-readable summary.
    Text,
    /// JSON batch report: totals plus each chain's full result under `chains`.
    Json,
}

/// Arguments for `chainwarden verify`.
#[derive(Debug, Clone, Args)]
pub(crate) struct VerifyArgs {
    /// Chain or batch roots: directories or s3://bucket/prefix URIs
    #[arg(required = true, value_name = "LOCATION")]
    pub(crate) locations: Vec<String>,

    /// Also write the full JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub(crate) out: Option<PathBuf>,

    /// Check against this anchor file only; verifies just the anchor's chain
    #[arg(long, value_name = "PATH")]
    pub(crate) anchor_file: Option<PathBuf>,

    /// Omit per-violation lines from the text report
    #[arg(short, long)]
    pub(crate) quiet: bool,

    /// Fail chains that have no anchor to check against
    #[arg(long)]
    pub(crate) strict: bool,

    /// Collect every violation instead of stopping at the first
    #[arg(long)]
    pub(crate) no_fail_fast: bool,

    /// Only accept the chain with this id
    #[arg(long, value_name = "ID")]
    pub(crate) chain_id: Option<String>,

    /// Backend for plain locations
    #[arg(long, value_enum)]
    pub(crate) backend: Option<BackendArg>,

    /// S3 bucket for plain locations with --backend s3
    #[arg(long, value_name = "BUCKET")]
    pub(crate) s3_bucket: Option<String>,

    /// Key prefix inside the S3 bucket
    #[arg(long, value_name = "PREFIX")]
    pub(crate) s3_prefix: Option<String>,

    /// Chains verified in parallel
    #[arg(long, value_name = "N")]
    pub(crate) concurrency: Option<usize>,

    /// Deadline per chain, in seconds
    #[arg(long, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,

    /// Deadline for the whole batch, in seconds
    #[arg(long, value_name = "SECS")]
    pub(crate) batch_timeout: Option<u64>,

    /// Report format on stdout
    #[arg(long, value_enum)]
    pub(crate) format: Option<FormatArg>,
}

impl VerifyArgs {
    /// Apply flags over the loaded config. Flags win over every layer.
    pub(crate) fn apply(&self, cfg: &mut Config) -> Result<()> {
        if let Some(backend) = self.backend {
            cfg.backend.kind = match backend {
                BackendArg::Fs => "fs",
                BackendArg::S3 => "s3",
            }
            .to_owned();
        }
        if let Some(bucket) = &self.s3_bucket {
            cfg.backend.s3.bucket = Some(bucket.clone());
        }
        if let Some(prefix) = &self.s3_prefix {
            cfg.backend.s3.prefix.clone_from(prefix);
        }
        if self.strict {
            cfg.verify.strict = true;
        }
        if self.no_fail_fast {
            cfg.verify.fail_fast = false;
        }
        if self.quiet {
            cfg.report.quiet = true;
        }
        if let Some(concurrency) = self.concurrency {
            cfg.verify.concurrency = Some(concurrency);
        }
        if let Some(secs) = self.timeout {
            cfg.verify.chain_timeout_secs = Some(secs);
        }
        if let Some(secs) = self.batch_timeout {
            cfg.verify.batch_timeout_secs = Some(secs);
        }
        if let Some(format) = self.format {
            cfg.report.format = match format {
                FormatArg::Text => "text",
                FormatArg::Json => "json",
            }
            .to_owned();
        }
        validate::validate(cfg).context("invalid options")?;
        Ok(())
    }
}

/// Run `chainwarden verify`.
///
/// Usage problems (bad locations, unreadable anchor file) are returned as
/// errors. Verification outcomes, including unreachable storage, are
/// reported and mapped to the exit code.
pub(crate) async fn run_verify(args: &VerifyArgs, cfg: &Config) -> Result<ExitCode> {
    let mut options = config_bridge::to_verify_options(cfg);
    let mut chain_id = args.chain_id.clone();
    if let Some(path) = &args.anchor_file {
        let anchor = Anchor::load_file(path)
            .await
            .with_context(|| format!("cannot load anchor file '{}'", path.display()))?;
        chain_id = Some(pinned_chain_id(args.chain_id.as_deref(), &anchor)?);
        options = options.pinned_anchor(anchor);
    }
    if let Some(chain_id) = &chain_id {
        options = options.chain_id(chain_id.as_str());
    }
    let format = config_bridge::to_report_format(cfg)?;

    let anchors = match &cfg.anchors.root {
        Some(root) => {
            let opened = location::open(&Location::parse(root, &cfg.backend)?, &cfg.backend)
                .with_context(|| format!("cannot open anchor root '{root}'"))?;
            Some(opened)
        },
        None => None,
    };

    let mut opened = Vec::with_capacity(args.locations.len());
    for raw in &args.locations {
        let location = Location::parse(raw, &cfg.backend)?;
        opened.push(location::open(&location, &cfg.backend)?);
    }

    let mut protected_roots: Vec<PathBuf> = opened.iter().filter_map(Opened::local_root).collect();
    protected_roots.extend(anchors.as_ref().and_then(Opened::local_root));

    let anchor_store = anchors.map(|a| AnchorStore::new(a.backend, a.root));
    let mut targets = Vec::new();
    for location in &opened {
        for root in expand(location, chain_id.is_some()).await {
            let target = ChainTarget::new(Arc::clone(&location.backend), root);
            targets.push(match &anchor_store {
                Some(store) => target.with_anchors(store.clone()),
                None => target,
            });
        }
    }
    info!(chains = targets.len(), "Verifying");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling verification");
            interrupt.cancel();
        }
    });
    let results = config_bridge::to_batch_runner(cfg, options)
        .with_cancellation(cancel)
        .verify_all(targets)
        .await;
    ctrl_c.abort();

    print_report(&results, format, cfg.report.quiet)?;

    if let Some(out) = &args.out {
        let json = render(&results, ReportFormat::Json, false)?;
        if let Err(e) = write_artifact(out, &json, &protected_roots).await {
            eprintln!("{}", Theme::error(&format!("Failed to write report: {e}")));
            return Ok(ExitCode::from(1));
        }
    }

    Ok(ExitCode::from(u8::try_from(exit_code(&results)).unwrap_or(1)))
}

/// A pinned anchor restricts the run to the chain it was taken from.
fn pinned_chain_id(requested: Option<&str>, anchor: &Anchor) -> Result<String> {
    match requested {
        Some(id) if id != anchor.chain_id => bail!(
            "anchor file belongs to chain '{}', not '{id}'",
            anchor.chain_id
        ),
        _ => Ok(anchor.chain_id.clone()),
    }
}

/// Chain roots under a location. A batch root expands to its chains; a
/// root with no discoverable chain is verified as-is so the failure shows
/// up in the report.
async fn expand(location: &Opened, filtered: bool) -> Vec<String> {
    if filtered {
        return vec![location.root.clone()];
    }
    match discover_chains(location.backend.as_ref(), &location.root).await {
        Ok(roots) if !roots.is_empty() => roots,
        Ok(_) => vec![location.root.clone()],
        Err(e) => {
            warn!(root = %location.root, error = %e, "Chain discovery failed");
            vec![location.root.clone()]
        },
    }
}

fn print_report(results: &[VerificationResult], format: ReportFormat, quiet: bool) -> Result<()> {
    let rendered = render(results, format, quiet)?;
    match format {
        ReportFormat::Text => print!("{}", Theme::report(&rendered)),
        ReportFormat::Json => print!("{rendered}"),
    }
    Ok(())
}
