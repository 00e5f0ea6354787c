//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `verify.concurrency`.
pub const MAX_CONCURRENCY: usize = 256;

const BACKEND_KINDS: &[&str] = &["fs", "s3"];
const REPORT_FORMATS: &[&str] = &["text", "json"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_verify(config)?;
    validate_backend(config)?;
    validate_report(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("unsupported value '{value}'; expected one of: {}", allowed.join(", ")),
        ))
    }
}

fn validate_verify(config: &Config) -> ConfigResult<()> {
    let v = &config.verify;

    if let Some(concurrency) = v.concurrency
        && !(1..=MAX_CONCURRENCY).contains(&concurrency)
    {
        return Err(invalid(
            "verify.concurrency",
            format!("concurrency must be between 1 and {MAX_CONCURRENCY}"),
        ));
    }
    if v.chain_timeout_secs == Some(0) {
        return Err(invalid("verify.chain_timeout_secs", "timeout must be greater than 0"));
    }
    if v.batch_timeout_secs == Some(0) {
        return Err(invalid("verify.batch_timeout_secs", "timeout must be greater than 0"));
    }
    Ok(())
}

fn validate_backend(config: &Config) -> ConfigResult<()> {
    let b = &config.backend;
    one_of("backend.kind", &b.kind, BACKEND_KINDS)?;

    if b.kind == "s3" && b.s3.bucket.as_deref().is_none_or(|bucket| bucket.trim().is_empty()) {
        return Err(invalid(
            "backend.s3.bucket",
            "the s3 backend requires a bucket (set backend.s3.bucket or CHAINWARDEN_S3_BUCKET)",
        ));
    }
    if let Some(endpoint) = &b.s3.endpoint
        && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(invalid(
            "backend.s3.endpoint",
            format!("endpoint '{endpoint}' must be an http(s) URL"),
        ));
    }
    Ok(())
}

fn validate_report(config: &Config) -> ConfigResult<()> {
    one_of("report.format", &config.report.format, REPORT_FORMATS)
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    one_of("logging.level", &config.logging.level, LOG_LEVELS)?;
    one_of("logging.format", &config.logging.format, LOG_FORMATS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = Config::default();
        config.verify.concurrency = Some(0);
        assert_eq!(field_of(validate(&config)), "verify.concurrency");

        config.verify.concurrency = Some(MAX_CONCURRENCY.saturating_add(1));
        assert_eq!(field_of(validate(&config)), "verify.concurrency");

        config.verify.concurrency = Some(MAX_CONCURRENCY);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = Config::default();
        config.verify.chain_timeout_secs = Some(0);
        assert_eq!(field_of(validate(&config)), "verify.chain_timeout_secs");

        let mut config = Config::default();
        config.verify.batch_timeout_secs = Some(0);
        assert_eq!(field_of(validate(&config)), "verify.batch_timeout_secs");
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut config = Config::default();
        config.backend.kind = "s3".into();
        assert_eq!(field_of(validate(&config)), "backend.s3.bucket");

        config.backend.s3.bucket = Some("audit".into());
        assert!(validate(&config).is_ok());

        config.backend.s3.endpoint = Some("minio:9000".into());
        assert_eq!(field_of(validate(&config)), "backend.s3.endpoint");
    }

    #[test]
    fn test_unknown_names_rejected() {
        let mut config = Config::default();
        config.backend.kind = "gcs".into();
        assert_eq!(field_of(validate(&config)), "backend.kind");

        let mut config = Config::default();
        config.report.format = "xml".into();
        assert_eq!(field_of(validate(&config)), "report.format");

        let mut config = Config::default();
        config.logging.format = "fancy".into();
        assert_eq!(field_of(validate(&config)), "logging.format");

        let mut config = Config::default();
        config.logging.level = "loud".into();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }
}
