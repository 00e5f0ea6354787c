//! S3-compatible object storage backend built on `opendal`.

use async_trait::async_trait;
use opendal::{ErrorKind, Operator, services};
use tracing::debug;

use crate::backend::{BackendKind, StorageBackend, normalize_prefix, validate_key};
use crate::error::{StorageError, StorageResult};

/// Connection settings for an S3-compatible bucket.
///
/// Credentials are not stored here; they are picked up from the standard
/// AWS environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, profiles).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Settings {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix inside the bucket that acts as the backend root.
    pub prefix: Option<String>,
    /// Region (defaults to the SDK's resolution).
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (`MinIO`, R2, ...).
    pub endpoint: Option<String>,
}

impl S3Settings {
    /// Settings for `bucket` with no prefix.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Parse `s3://bucket/optional/prefix`.
    ///
    /// Returns `None` if `uri` is not an `s3://` URI or has no bucket.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("s3://")?;
        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, normalize_prefix(prefix)),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return None;
        }
        let settings = Self::new(bucket);
        Some(if prefix.is_empty() {
            settings
        } else {
            settings.with_prefix(prefix)
        })
    }

    /// Render as an `s3://` URI.
    #[must_use]
    pub fn uri(&self) -> String {
        match self.prefix.as_deref().map(normalize_prefix) {
            Some(prefix) if !prefix.is_empty() => format!("s3://{}/{prefix}", self.bucket),
            _ => format!("s3://{}", self.bucket),
        }
    }
}

/// A [`StorageBackend`] over an `opendal` operator.
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    operator: Operator,
    location: String,
}

impl ObjectStoreBackend {
    /// Connect to an S3-compatible bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the bucket is empty or the
    /// operator cannot be built.
    #[cfg(feature = "s3")]
    pub fn s3(settings: &S3Settings) -> StorageResult<Self> {
        if settings.bucket.is_empty() {
            return Err(StorageError::Connection(
                "S3 bucket cannot be empty".to_owned(),
            ));
        }

        let mut builder = services::S3::default().bucket(&settings.bucket);
        if let Some(prefix) = settings.prefix.as_deref().map(normalize_prefix)
            && !prefix.is_empty()
        {
            builder = builder.root(&format!("/{prefix}"));
        }
        if let Some(region) = &settings.region {
            builder = builder.region(region);
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .finish();

        Ok(Self {
            operator,
            location: settings.uri(),
        })
    }

    /// In-process object store for tests.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the operator cannot be built.
    pub fn memory() -> StorageResult<Self> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .finish();
        Ok(Self {
            operator,
            location: "memory://".to_owned(),
        })
    }

    /// The underlying operator, for administrative access that bypasses
    /// the write-once rule.
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

fn map_err(key: &str, err: &opendal::Error) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound(key.to_owned()),
        ErrorKind::AlreadyExists | ErrorKind::ConditionNotMatch => {
            StorageError::AlreadyExists(key.to_owned())
        },
        ErrorKind::RateLimited => StorageError::Transient(format!("{key}: {err}")),
        _ if err.is_temporary() => StorageError::Transient(format!("{key}: {err}")),
        _ => StorageError::Internal(format!("{key}: {err}")),
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    fn describe(&self) -> String {
        self.location.clone()
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        let buffer = self
            .operator
            .read(key)
            .await
            .map_err(|e| map_err(key, &e))?;
        Ok(buffer.to_vec())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = normalize_prefix(prefix);
        let path = if prefix.is_empty() {
            "/".to_owned()
        } else {
            format!("{prefix}/")
        };

        let entries = match self.operator.list_with(&path).recursive(true).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_err(&path, &e)),
        };

        // Object-store listings carry no ordering guarantee.
        let mut keys: Vec<String> = entries
            .into_iter()
            .map(|entry| entry.path().trim_start_matches('/').to_owned())
            .filter(|key| !key.is_empty() && !key.ends_with('/'))
            .collect();
        keys.sort();
        keys.dedup();

        debug!(location = %self.location, prefix, count = keys.len(), "Listed keys");
        Ok(keys)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        if self.exists(key).await? {
            return Err(StorageError::AlreadyExists(key.to_owned()));
        }
        self.operator
            .write(key, value)
            .await
            .map_err(|e| map_err(key, &e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        self.operator
            .exists(key)
            .await
            .map_err(|e| map_err(key, &e))
    }
}
