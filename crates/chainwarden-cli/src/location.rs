//! Turning command-line locations into storage backends.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chainwarden_config::{BackendSection, S3Section};
use chainwarden_storage::{
    FsBackend, ObjectStoreBackend, S3Settings, StorageBackend, normalize_prefix,
};

/// A chain or batch location as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
    /// A local directory.
    Path(PathBuf),
    /// A bucket and prefix on an S3-compatible store.
    S3(S3Settings),
    /// A key prefix on the configured S3 bucket.
    S3Key(String),
}

impl Location {
    /// Classify `raw`: `s3://` URIs are always S3; anything else is a key
    /// under the configured bucket when the backend is `s3`, and a local
    /// path otherwise.
    pub(crate) fn parse(raw: &str, backend: &BackendSection) -> Result<Self> {
        if raw.starts_with("s3://") {
            let settings = S3Settings::from_uri(raw)
                .with_context(|| format!("invalid S3 location '{raw}'; expected s3://bucket/prefix"))?;
            return Ok(Self::S3(with_connection(settings, &backend.s3)));
        }

        match backend.kind.as_str() {
            "s3" => Ok(Self::S3Key(normalize_prefix(raw).trim_start_matches("./").to_owned())),
            "fs" => Ok(Self::Path(PathBuf::from(raw))),
            other => bail!("unknown backend '{other}'; expected fs or s3"),
        }
    }
}

/// A backend plus the chain or batch root on it.
#[derive(Debug, Clone)]
pub(crate) struct Opened {
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) root: String,
}

impl Opened {
    /// Local directory backing the root, if any.
    pub(crate) fn local_root(&self) -> Option<PathBuf> {
        self.backend.local_path(&self.root)
    }
}

/// Open the backend for `location`.
///
/// Local paths must be existing directories.
pub(crate) fn open(location: &Location, backend: &BackendSection) -> Result<Opened> {
    match location {
        Location::Path(path) => {
            let fs = FsBackend::open(path)
                .with_context(|| format!("'{}' is not a directory", path.display()))?;
            Ok(Opened {
                backend: Arc::new(fs),
                root: String::new(),
            })
        },
        Location::S3(settings) => Ok(Opened {
            backend: Arc::new(ObjectStoreBackend::s3(settings).context("cannot open S3 store")?),
            root: String::new(),
        }),
        Location::S3Key(root) => {
            let settings = configured_bucket(&backend.s3)?;
            Ok(Opened {
                backend: Arc::new(ObjectStoreBackend::s3(&settings).context("cannot open S3 store")?),
                root: root.clone(),
            })
        },
    }
}

fn configured_bucket(s3: &S3Section) -> Result<S3Settings> {
    let Some(bucket) = s3.bucket.as_deref().filter(|b| !b.trim().is_empty()) else {
        bail!("the s3 backend requires a bucket (--s3-bucket or CHAINWARDEN_S3_BUCKET)");
    };
    let mut settings = S3Settings::new(bucket);
    if !s3.prefix.is_empty() {
        settings = settings.with_prefix(s3.prefix.as_str());
    }
    Ok(with_connection(settings, s3))
}

fn with_connection(mut settings: S3Settings, s3: &S3Section) -> S3Settings {
    if let Some(region) = &s3.region {
        settings = settings.with_region(region.as_str());
    }
    if let Some(endpoint) = &s3.endpoint {
        settings = settings.with_endpoint(endpoint.as_str());
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(kind: &str) -> BackendSection {
        BackendSection {
            kind: kind.into(),
            s3: S3Section {
                bucket: Some("audit".into()),
                prefix: "prod".into(),
                region: Some("eu-west-1".into()),
                endpoint: None,
            },
        }
    }

    #[test]
    fn test_parse_uri_takes_bucket_from_uri() {
        let location = Location::parse("s3://logs/chains/orders", &backend("fs")).unwrap();
        let Location::S3(settings) = location else {
            panic!("expected S3 location");
        };
        assert_eq!(settings.bucket, "logs");
        assert_eq!(settings.prefix.as_deref(), Some("chains/orders"));
        assert_eq!(settings.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_parse_by_backend_kind() {
        assert_eq!(
            Location::parse("chains/orders/", &backend("s3")).unwrap(),
            Location::S3Key("chains/orders".into())
        );
        assert_eq!(
            Location::parse("/var/audit", &backend("fs")).unwrap(),
            Location::Path(PathBuf::from("/var/audit"))
        );
        assert!(Location::parse("x", &backend("gcs")).is_err());
        assert!(Location::parse("s3://", &backend("fs")).is_err());
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Location::Path(dir.path().join("missing"));
        assert!(open(&missing, &backend("fs")).is_err());

        let opened = open(&Location::Path(dir.path().to_path_buf()), &backend("fs")).unwrap();
        assert_eq!(opened.root, "");
        assert_eq!(opened.local_root().unwrap(), dir.path());
    }

    #[test]
    fn test_configured_bucket_required() {
        let mut section = backend("s3").s3;
        section.bucket = None;
        assert!(configured_bucket(&section).is_err());

        section.bucket = Some("audit".into());
        let settings = configured_bucket(&section).unwrap();
        assert_eq!(settings.uri(), "s3://audit/prod");
    }
}
