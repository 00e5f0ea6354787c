//! Conversion from `chainwarden_config::Config` to verifier, report and
//! logging types.

use std::time::Duration;

use anyhow::{Result, anyhow};
use chainwarden_audit::{BatchRunner, ReportFormat, VerifyOptions};
use chainwarden_config::Config;
use chainwarden_telemetry::{LogConfig, LogFormat};

/// Logging setup from config. Each `-v` raises the level one step above
/// `warn`, replacing the configured level.
pub(crate) fn to_log_config(cfg: &Config, verbosity: u8) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();
    let level = match verbosity {
        0 => cfg.logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    cfg.logging
        .directives
        .iter()
        .fold(LogConfig::new(level).with_format(format), |config, directive| {
            config.with_directive(directive)
        })
}

/// Per-chain verification policy.
pub(crate) fn to_verify_options(cfg: &Config) -> VerifyOptions {
    let options = VerifyOptions::default()
        .fail_fast(cfg.verify.fail_fast)
        .strict(cfg.verify.strict);
    match cfg.verify.chain_timeout_secs {
        Some(secs) => options.chain_timeout(Duration::from_secs(secs)),
        None => options,
    }
}

/// Batch runner with the configured limits.
pub(crate) fn to_batch_runner(cfg: &Config, options: VerifyOptions) -> BatchRunner {
    let mut runner = BatchRunner::new(options);
    if let Some(concurrency) = cfg.verify.concurrency {
        runner = runner.with_concurrency(concurrency);
    }
    if let Some(secs) = cfg.verify.batch_timeout_secs {
        runner = runner.with_batch_timeout(Duration::from_secs(secs));
    }
    runner
}

/// The configured report format.
pub(crate) fn to_report_format(cfg: &Config) -> Result<ReportFormat> {
    cfg.report.format.parse().map_err(|e: String| anyhow!(e))
}
