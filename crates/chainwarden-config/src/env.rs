//! Environment variable fallbacks.
//!
//! Environment variables are fallbacks, not overrides: they only fill fields
//! that no configuration file set. Command-line flags, applied by the binary
//! after loading, override everything.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    String,
    Bool,
    Integer,
}

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: ValueKind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "CHAINWARDEN_BACKEND",
        field_path: "backend.kind",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_S3_BUCKET",
        field_path: "backend.s3.bucket",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_S3_PREFIX",
        field_path: "backend.s3.prefix",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_S3_REGION",
        field_path: "backend.s3.region",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_S3_ENDPOINT",
        field_path: "backend.s3.endpoint",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_STRICT",
        field_path: "verify.strict",
        kind: ValueKind::Bool,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_CONCURRENCY",
        field_path: "verify.concurrency",
        kind: ValueKind::Integer,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_CHAIN_TIMEOUT_SECS",
        field_path: "verify.chain_timeout_secs",
        kind: ValueKind::Integer,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_LOG_LEVEL",
        field_path: "logging.level",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "CHAINWARDEN_LOG_FORMAT",
        field_path: "logging.format",
        kind: ValueKind::String,
    },
];

/// Names of every environment variable the loader consults.
#[must_use]
pub fn supported_vars() -> Vec<&'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name).collect()
}

/// Apply environment fallbacks to fields no configuration file set.
///
/// Returns the number of variables applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a boolean or integer variable does
/// not parse.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(|layer| layer.is_file())
        {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "Applying environment fallback"
        );
        let value = coerce(mapping, raw)?;
        set_field(merged, mapping.field_path, value);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    let invalid = |expected: &str| ConfigError::EnvError {
        var_name: mapping.var_name.to_owned(),
        message: format!("expected {expected}, got '{raw}'"),
    };

    match mapping.kind {
        ValueKind::String => Ok(toml::Value::String(raw.to_owned())),
        ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "false" | "0" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(invalid("true, false, 1 or 0")),
        },
        ValueKind::Integer => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| invalid("an integer")),
    }
}

/// Set a dotted `path` in the tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut current = root;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
