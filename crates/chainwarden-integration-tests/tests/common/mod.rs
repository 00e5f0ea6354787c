//! Shared helpers for integration tests.

use chainwarden_audit::{Verifier, VerifyOptions, VerificationResult, ViolationKind};
use chainwarden_test::{BuiltChain, TestStore};

/// Verify `chain` as stored in `store`, discovering anchors under the chain
/// root.
#[allow(dead_code)]
pub async fn verify(store: &TestStore, chain: &BuiltChain, options: VerifyOptions) -> VerificationResult {
    Verifier::new(options)
        .verify_root(store.backend(), &chain.root, None)
        .await
}

/// Options that collect every finding.
#[allow(dead_code)]
pub fn collect_all() -> VerifyOptions {
    VerifyOptions::default().fail_fast(false)
}

/// `(kind, sequence)` of every reported violation.
#[allow(dead_code)]
pub fn findings(result: &VerificationResult) -> Vec<(ViolationKind, Option<u64>)> {
    result
        .violations()
        .into_iter()
        .map(|v| (v.kind, v.sequence))
        .collect()
}

/// `(kind, sequence)` of the first violation.
#[allow(dead_code)]
pub fn first(result: &VerificationResult) -> Option<(ViolationKind, Option<u64>)> {
    result.first_violation.as_ref().map(|v| (v.kind, v.sequence))
}
