//! Deep merge of TOML trees with per-field source tracking.
//!
//! Merging works on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key absent from an overlay never resets the base value.

use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User-level configuration (`~/.chainwarden/config.toml`).
    User,
    /// Workspace-level configuration (`./.chainwarden/config.toml`).
    Workspace,
    /// A file passed with `--config`.
    Explicit,
    /// Environment variable fallback.
    Environment,
}

impl ConfigLayer {
    /// Whether the layer is a configuration file.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, Self::User | Self::Workspace | Self::Explicit)
    }
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user (~/.chainwarden/config.toml)"),
            Self::Workspace => write!(f, "workspace (.chainwarden/config.toml)"),
            Self::Explicit => write!(f, "--config"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording `layer` for every leaf the
/// overlay sets. Tables merge per key; scalars and arrays replace.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = child_path(prefix, key);
                match base_table.get_mut(key) {
                    Some(base_val) if overlay_val.is_table() && base_val.is_table() => {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    },
                    Some(base_val) => {
                        *base_val = overlay_val.clone();
                        record_leaves(overlay_val, &path, layer, sources);
                    },
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                        record_leaves(overlay_val, &path, layer, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Record `layer` for every leaf under `val`.
pub fn record_leaves(val: &toml::Value, prefix: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &child_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_scalars_and_keeps_absent_keys() {
        let mut base = parse(
            r#"
            [verify]
            strict = false
            fail_fast = true
            [logging]
            directives = ["a=debug"]
            "#,
        );
        let overlay = parse(
            r#"
            [verify]
            strict = true
            [logging]
            directives = ["b=trace"]
            "#,
        );

        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::User, &mut sources);

        assert_eq!(base["verify"]["strict"].as_bool(), Some(true));
        assert_eq!(base["verify"]["fail_fast"].as_bool(), Some(true));
        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("b=trace"));

        assert_eq!(sources.get("verify.strict"), Some(&ConfigLayer::User));
        assert_eq!(sources.get("verify.fail_fast"), None);
    }

    #[test]
    fn test_new_nested_table_records_every_leaf() {
        let mut base = parse("[backend]\nkind = \"fs\"");
        let overlay = parse(
            r#"
            [backend.s3]
            bucket = "audit"
            region = "eu-west-1"
            "#,
        );

        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::Explicit, &mut sources);

        assert_eq!(base["backend"]["s3"]["bucket"].as_str(), Some("audit"));
        assert_eq!(sources.get("backend.s3.bucket"), Some(&ConfigLayer::Explicit));
        assert_eq!(sources.get("backend.s3.region"), Some(&ConfigLayer::Explicit));
    }

    #[test]
    fn test_layer_is_file() {
        assert!(ConfigLayer::Workspace.is_file());
        assert!(!ConfigLayer::Defaults.is_file());
        assert!(!ConfigLayer::Environment.is_file());
    }
}
