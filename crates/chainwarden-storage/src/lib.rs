//! Chainwarden Storage - byte-level access to audit chain storage roots.
//!
//! Every chain lives under a storage root: a local directory or a prefix in
//! an S3-compatible bucket. This crate hides that difference behind the
//! [`StorageBackend`] trait, with `/`-separated keys relative to the root.
//!
//! # Backends
//!
//! | Backend | Kind | Use |
//! |---------|------|-----|
//! | [`FsBackend`] | filesystem | local chains, CI artifacts |
//! | [`ObjectStoreBackend`] | object store | S3 buckets via `opendal`, in-memory operator for tests |
//! | [`MemoryBackend`] | object store | tests needing injected latency or transient failures |
//!
//! Objects are write-once. `put` on an existing key fails with
//! [`StorageError::AlreadyExists`].
//!
//! # Feature Flags
//!
//! - **`s3`** (default) - S3 support in [`ObjectStoreBackend`]

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;

mod backend;
mod fs;
mod memory;
mod object;

pub use backend::{
    BackendKind, StorageBackend, join_key, key_name, normalize_prefix, validate_key,
};
pub use error::{StorageError, StorageResult};
pub use fs::FsBackend;
pub use memory::MemoryBackend;
pub use object::{ObjectStoreBackend, S3Settings};
