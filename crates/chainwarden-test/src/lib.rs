//! Chainwarden Test - Shared test utilities for chainwarden.
//!
//! Builds deterministic chains on every backend and tampers with them
//! behind the write-once rule, so the verifier can be exercised against the
//! attacks it exists to detect.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! chainwarden-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use chainwarden_audit::Verifier;
//! use chainwarden_test::{ChainFixture, TestStore, tamper_payload};
//!
//! #[tokio::test]
//! async fn test_tampering_is_detected() {
//!     let store = TestStore::fs();
//!     let chain = ChainFixture::new("orders", 5).build(&store).await;
//!
//!     tamper_payload(&store, &chain, 2, serde_json::json!({"forged": true})).await;
//!
//!     let result = Verifier::default().verify_root(store.backend(), &chain.root, None).await;
//!     assert!(!result.passed());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod fixtures;
mod harness;
mod store;
mod tamper;

pub use fixtures::{BuiltChain, ChainFixture, fixture_payload, fixture_time};
pub use harness::{setup_test_logging, setup_test_logging_default};
pub use store::{RawAccess, TestStore};
pub use tamper::{
    delete_entry, forge_extension, overwrite_entry_raw, restore_entry, set_declared_length,
    tamper_payload,
};
