//! Chainwarden Audit - Hash-linked audit chains and their verification.
//!
//! This crate provides:
//! - The chain data model ([`ChainManifest`], [`ChainEntry`], [`Anchor`])
//! - Typed chain access over any storage backend ([`ChainStorage`])
//! - An [`AnchorStore`] for out-of-band root hash snapshots
//! - A producer-side [`ChainWriter`] that shares the verifier's link function
//! - The [`Verifier`] state machine and the concurrent [`BatchRunner`]
//! - Report rendering ([`render`], [`write_artifact`], [`exit_code`])
//!
//! # Security Model
//!
//! Every entry's hash binds its canonical payload to the hash of the entry
//! before it:
//!
//! ```text
//! hash[0] = H(payload[0] ‖ GENESIS)
//! hash[i] = H(payload[i] ‖ hash[i-1])
//! ```
//!
//! The verifier never trusts a stored hash. It recomputes every link and
//! compares anchors, kept outside the entry stream, against hashes derived
//! from the payloads alone. Any modification, reordering or deletion of a
//! historical entry is detectable.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use chainwarden_audit::{ChainWriter, Verifier};
//! use chainwarden_storage::{MemoryBackend, StorageBackend};
//!
//! # tokio_test_block_on(async {
//! let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
//!
//! let mut writer = ChainWriter::create(Arc::clone(&backend), "orders", "orders").await?;
//! writer.append(Some("created"), serde_json::json!({"order": 1})).await?;
//! writer.append(Some("shipped"), serde_json::json!({"order": 1})).await?;
//! writer.finish().await?;
//!
//! let result = Verifier::default().verify_root(backend, "orders", None).await;
//! assert!(result.passed());
//! assert_eq!(result.total_entries_checked, 2);
//! # Ok::<(), chainwarden_audit::AuditError>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod anchor;
mod batch;
mod canonical;
mod entry;
mod error;
mod manifest;
mod report;
mod result;
mod storage;
mod verify;
mod writer;

pub use anchor::{ANCHOR_DIR, Anchor, AnchorStore};
pub use batch::{BatchRunner, ChainTarget, MAX_DEFAULT_CONCURRENCY, default_concurrency};
pub use canonical::{canonical_bytes, canonicalize};
pub use entry::{ChainEntry, EntryLocator, EntryRecord, SEQUENCE_WIDTH, validate_label};
pub use error::{AuditError, AuditResult};
pub use manifest::{ChainManifest, MANIFEST_FILE};
pub use report::{BatchReport, ReportFormat, exit_code, overall_status, render, write_artifact};
pub use result::{AnchorCheck, Status, VerificationResult, Violation, ViolationKind};
pub use storage::{BlobChainStorage, ChainStorage, discover_chains};
pub use verify::{AnchorSelection, Verifier, VerifyOptions};
pub use writer::ChainWriter;
