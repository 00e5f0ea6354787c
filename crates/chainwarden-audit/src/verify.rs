//! The chain verifier.
//!
//! A run moves through `Init → Loading → Walking → Anchoring → Done`:
//!
//! - **Loading** reads the manifest and the entry list, then checks that
//!   the stored entries are exactly `0..declared_length`.
//! - **Walking** reads entries in sequence order and recomputes every link.
//!   Each entry is checked against the stored hash of its predecessor, so a
//!   tampered entry is reported once and the walk continues structurally.
//!   A second running hash is derived purely from payloads; anchors are
//!   compared against it, so every anchor at or past a tampered entry fails.
//! - **Anchoring** compares discovered (or pinned) anchors with the
//!   recomputed hashes.
//!
//! Structural problems (missing or unreadable data, length or sequence
//! anomalies, chain id mismatches), backend failures and interruptions end
//! the run immediately. Hash and anchor mismatches follow the fail-fast
//! policy. Nothing escapes as an error: every outcome is a
//! [`VerificationResult`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chainwarden_crypto::{GENESIS, HashAlgorithm, HashLinker};
use chainwarden_storage::StorageBackend;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::anchor::{Anchor, AnchorStore};
use crate::canonical::canonical_bytes;
use crate::entry::EntryLocator;
use crate::error::AuditResult;
use crate::manifest::ChainManifest;
use crate::result::{AnchorCheck, Status, VerificationResult, Violation, ViolationKind};
use crate::storage::{BlobChainStorage, ChainStorage, describe_root};

/// Which anchors a run checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnchorSelection {
    /// Every anchor listed for the chain.
    #[default]
    Discover,
    /// Exactly this anchor; discovery is skipped.
    Pinned(Anchor),
}

/// Policy for a verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Stop at the first violation.
    pub fail_fast: bool,
    /// Require at least one validated anchor.
    pub strict: bool,
    /// Only accept the chain with this id.
    pub chain_id: Option<String>,
    /// Anchor source.
    pub anchor: AnchorSelection,
    /// Deadline for one chain.
    pub chain_timeout: Option<Duration>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            fail_fast: true,
            strict: false,
            chain_id: None,
            anchor: AnchorSelection::Discover,
            chain_timeout: None,
        }
    }
}

impl VerifyOptions {
    /// Set the fail-fast policy.
    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set strict mode.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Restrict to one chain id.
    #[must_use]
    pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    /// Check only `anchor`.
    #[must_use]
    pub fn pinned_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = AnchorSelection::Pinned(anchor);
        self
    }

    /// Bound each chain's verification time.
    #[must_use]
    pub fn chain_timeout(mut self, timeout: Duration) -> Self {
        self.chain_timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Loading,
    Walking,
    Anchoring,
    Done,
}

/// Marker: the run has ended early. The cause is already recorded.
struct Halted;

type Step<T = ()> = Result<T, Halted>;

/// Verifies chains against their manifests, links and anchors.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    options: VerifyOptions,
    cancel: CancellationToken,
}

impl Verifier {
    /// Create a verifier.
    #[must_use]
    pub fn new(options: VerifyOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort runs when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Verify one chain.
    pub async fn verify(&self, storage: &dyn ChainStorage) -> VerificationResult {
        let mut run = Run::new(self, storage.location());
        let span = run.span();
        async {
            let _ = self.walk(&mut run, storage).await;
            run.finish()
        }
        .instrument(span)
        .await
    }

    /// Locate the chain under `root` and verify it.
    ///
    /// With a `chain_id` filter, `root` may be a batch root holding the
    /// chain in a subdirectory. `anchors` replaces the chain's own
    /// `anchors/` directory.
    pub async fn verify_root(
        &self,
        backend: Arc<dyn StorageBackend>,
        root: &str,
        anchors: Option<AnchorStore>,
    ) -> VerificationResult {
        let mut run = Run::new(self, describe_root(backend.as_ref(), root));
        let span = run.span();
        async {
            let resolved = run
                .guard(
                    None,
                    BlobChainStorage::resolve(backend, root, self.options.chain_id.as_deref()),
                )
                .await;
            if let Ok(storage) = run.check(resolved) {
                let storage = match anchors {
                    Some(anchors) => storage.with_anchor_store(anchors),
                    None => storage,
                };
                run.root = storage.location();
                let _ = self.walk(&mut run, &storage).await;
            }
            run.finish()
        }
        .instrument(span)
        .await
    }

    async fn walk(&self, run: &mut Run<'_>, storage: &dyn ChainStorage) -> Step {
        run.enter(Phase::Loading);
        let loaded = run.guard(None, storage.load_manifest()).await;
        let manifest = run.check(loaded)?;
        tracing::Span::current().record("chain_id", manifest.chain_id.as_str());
        run.chain_id.clone_from(&manifest.chain_id);
        run.algorithm = manifest.hash_algorithm;

        if let Some(expected) = &self.options.chain_id
            && *expected != manifest.chain_id
        {
            return run.record(
                Violation::new(ViolationKind::ChainIdMismatch, None).with_detail(format!(
                    "requested chain {expected}, manifest declares {}",
                    manifest.chain_id
                )),
            );
        }

        let listed = run.guard(None, storage.list_entries()).await;
        let locators = run.check(listed)?;
        check_layout(run, &manifest, &locators)?;

        run.enter(Phase::Walking);
        let linker = HashLinker::new(manifest.hash_algorithm);
        let mut running_prev = GENESIS;
        let mut prefix_hash = GENESIS;
        let mut recomputed = Vec::with_capacity(locators.len());

        for locator in &locators {
            let sequence = locator.sequence;
            let read = run.guard(Some(sequence), storage.read_entry(locator)).await;
            let entry = run.check(read)?;

            let payload = canonical_bytes(&entry.payload);
            let expected = linker.link(&payload, &running_prev);
            prefix_hash = linker.link(&payload, &prefix_hash);
            recomputed.push(prefix_hash);
            run.checked = run.checked.saturating_add(1);

            debug!(sequence, hash = %entry.entry_hash.short(), "Entry checked");

            if entry.prev_hash != running_prev {
                run.record(
                    Violation::new(ViolationKind::HashMismatch, Some(sequence))
                        .with_digests(running_prev, Some(entry.prev_hash))
                        .with_detail("prev_hash does not match the previous entry's hash"),
                )?;
            } else if expected != entry.entry_hash {
                run.record(
                    Violation::new(ViolationKind::HashMismatch, Some(sequence))
                        .with_digests(expected, Some(entry.entry_hash))
                        .with_detail("stored hash does not match the recomputed link"),
                )?;
            }
            running_prev = entry.entry_hash;
        }

        run.enter(Phase::Anchoring);
        let anchors = match &self.options.anchor {
            AnchorSelection::Discover => {
                let listed = run.guard(None, storage.list_anchors(&manifest.chain_id)).await;
                run.check(listed)?
            },
            AnchorSelection::Pinned(anchor) => {
                if anchor.chain_id != manifest.chain_id {
                    return run.record(
                        Violation::new(ViolationKind::ChainIdMismatch, None).with_detail(
                            format!(
                                "pinned anchor belongs to chain {}, not {}",
                                anchor.chain_id, manifest.chain_id
                            ),
                        ),
                    );
                }
                vec![anchor.clone()]
            },
        };

        for anchor in &anchors {
            let actual = usize::try_from(anchor.sequence_at_anchor)
                .ok()
                .and_then(|k| recomputed.get(k))
                .copied();
            let matched = actual == Some(anchor.root_hash);
            run.anchor_checks.push(AnchorCheck {
                sequence_at_anchor: anchor.sequence_at_anchor,
                expected_root: anchor.root_hash,
                actual_root: actual,
                matched,
            });

            if !matched {
                let detail = if actual.is_some() {
                    "anchored root differs from the recomputed hash"
                } else {
                    "anchor is past the end of the chain"
                };
                run.record(
                    Violation::new(ViolationKind::AnchorMismatch, Some(anchor.sequence_at_anchor))
                        .with_digests(anchor.root_hash, actual)
                        .with_detail(detail),
                )?;
            }
        }

        if self.options.strict && run.anchor_checks.is_empty() {
            run.record(
                Violation::new(ViolationKind::MissingAnchor, None)
                    .with_detail("strict mode requires at least one anchor"),
            )?;
        }

        Ok(())
    }
}

/// Stored entries must be exactly `0..declared_length`.
fn check_layout(run: &mut Run<'_>, manifest: &ChainManifest, locators: &[EntryLocator]) -> Step {
    let stored = u64::try_from(locators.len()).unwrap_or(u64::MAX);
    let declared = manifest.declared_length;
    let first_break = (0u64..)
        .zip(locators)
        .find(|(expected, locator)| locator.sequence != *expected);

    if stored < declared {
        let missing = first_break.map_or(stored, |(expected, _)| expected);
        return run.record(
            Violation::new(ViolationKind::Truncation, Some(missing)).with_detail(format!(
                "chain holds {stored} entries, manifest declares {declared}"
            )),
        );
    }
    if stored > declared {
        return run.record(
            Violation::new(ViolationKind::Truncation, Some(declared)).with_detail(format!(
                "chain extends beyond declared length: {stored} entries, manifest declares {declared}"
            )),
        );
    }
    if let Some((expected, locator)) = first_break {
        let detail = if locator.sequence < expected {
            format!("duplicate sequence {}", locator.sequence)
        } else {
            format!("missing sequence {expected}")
        };
        return run.record(
            Violation::new(ViolationKind::SequenceGap, Some(expected)).with_detail(detail),
        );
    }
    Ok(())
}

/// Mutable state of one verification run.
struct Run<'a> {
    options: &'a VerifyOptions,
    cancel: &'a CancellationToken,
    chain_id: String,
    root: String,
    algorithm: HashAlgorithm,
    phase: Phase,
    started: Instant,
    deadline: Option<Instant>,
    checked: u64,
    first_violation: Option<Violation>,
    all_violations: Vec<Violation>,
    anchor_checks: Vec<AnchorCheck>,
}

impl<'a> Run<'a> {
    fn new(verifier: &'a Verifier, root: String) -> Self {
        let started = Instant::now();
        let options = &verifier.options;
        Self {
            options,
            cancel: &verifier.cancel,
            chain_id: options
                .chain_id
                .clone()
                .unwrap_or_else(|| fallback_chain_id(&root)),
            root,
            algorithm: HashAlgorithm::default(),
            phase: Phase::Init,
            started,
            deadline: options.chain_timeout.and_then(|t| started.checked_add(t)),
            checked: 0,
            first_violation: None,
            all_violations: Vec::new(),
            anchor_checks: Vec::new(),
        }
    }

    fn span(&self) -> tracing::Span {
        info_span!(
            "verify_chain",
            chain_id = tracing::field::Empty,
            root = %self.root
        )
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "Verifier phase");
        self.phase = phase;
    }

    /// Await `op`, unless the run is cancelled or its deadline passes first.
    async fn guard<T, F>(&self, sequence: Option<u64>, op: F) -> Result<T, Violation>
    where
        F: Future<Output = AuditResult<T>>,
    {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(
                Violation::new(ViolationKind::Cancelled, sequence)
                    .with_detail("verification cancelled"),
            ),
            () = expired => Err(
                Violation::new(ViolationKind::Timeout, sequence).with_detail(format!(
                    "chain timeout of {}ms exceeded",
                    self.options.chain_timeout.unwrap_or_default().as_millis()
                )),
            ),
            result = op => result.map_err(|e| {
                Violation::new(e.violation_kind(), sequence).with_detail(e.to_string())
            }),
        }
    }

    fn check<T>(&mut self, outcome: Result<T, Violation>) -> Step<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(violation) => {
                self.record(violation)?;
                Err(Halted)
            },
        }
    }

    /// Record a violation. Returns `Err` if the run must stop.
    fn record(&mut self, violation: Violation) -> Step {
        if violation.kind.is_integrity_finding() || violation.kind == ViolationKind::MissingAnchor {
            warn!(chain_id = %self.chain_id, %violation, "Integrity violation");
        } else {
            error!(chain_id = %self.chain_id, %violation, "Verification aborted");
        }

        let stop = self.options.fail_fast || violation.kind.is_fatal();
        if self.options.fail_fast {
            if self.first_violation.is_none() {
                self.first_violation = Some(violation);
            }
        } else {
            if self.first_violation.is_none() {
                self.first_violation = Some(violation.clone());
            }
            self.all_violations.push(violation);
        }

        if stop {
            self.enter(Phase::Done);
            Err(Halted)
        } else {
            Ok(())
        }
    }

    fn finish(mut self) -> VerificationResult {
        if self.phase != Phase::Done {
            self.enter(Phase::Done);
        }
        let status = if self.first_violation.is_none() {
            Status::Pass
        } else {
            Status::Fail
        };
        let elapsed = self.started.elapsed();

        info!(
            chain_id = %self.chain_id,
            %status,
            entries = self.checked,
            anchors = self.anchor_checks.len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Chain verified"
        );

        VerificationResult {
            chain_id: self.chain_id,
            root: self.root,
            hash_algorithm: self.algorithm,
            total_entries_checked: self.checked,
            first_violation: self.first_violation,
            all_violations: self.all_violations,
            anchor_checks: self.anchor_checks,
            status,
            elapsed,
        }
    }
}

/// Chain id to report when the manifest could not be read: the last path
/// segment of the root.
/// Chain id used when the manifest cannot supply one: the last path
/// segment of the chain root.
pub(crate) fn fallback_chain_id(root: &str) -> String {
    root.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(root)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use chainwarden_storage::MemoryBackend;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::writer::ChainWriter;

    async fn chain(backend: &Arc<dyn StorageBackend>, root: &str, len: u64) -> Vec<Anchor> {
        let mut writer = ChainWriter::create(Arc::clone(backend), root, root)
            .await
            .unwrap();
        let mut anchors = Vec::new();
        for i in 0..len {
            writer
                .append(Some("event"), json!({"i": i, "action": "write"}))
                .await
                .unwrap();
            if i == 1 {
                anchors.push(writer.anchor(Utc::now()).await.unwrap());
            }
        }
        writer.finish().await.unwrap();
        anchors
    }

    async fn tamper(backend: &MemoryBackend, key: &str) {
        let mut record: serde_json::Value =
            serde_json::from_slice(&backend.get(key).await.unwrap()).unwrap();
        record["payload"]["action"] = json!("delete");
        backend
            .overwrite(key, serde_json::to_vec(&record).unwrap())
            .await;
    }

    fn setup() -> (Arc<MemoryBackend>, Arc<dyn StorageBackend>) {
        let memory = Arc::new(MemoryBackend::new());
        let backend: Arc<dyn StorageBackend> = memory.clone();
        (memory, backend)
    }

    #[tokio::test]
    async fn test_clean_chain_passes() {
        let (_, backend) = setup();
        chain(&backend, "c", 5).await;

        let result = Verifier::default().verify_root(backend, "c", None).await;
        assert!(result.passed(), "{result:?}");
        assert_eq!(result.total_entries_checked, 5);
        assert_eq!(result.chain_id, "c");
        assert_eq!(result.anchor_checks.len(), 1);
        assert!(result.anchor_checks[0].matched);
    }

    #[tokio::test]
    async fn test_empty_chain_passes() {
        let (_, backend) = setup();
        chain(&backend, "c", 0).await;
        let result = Verifier::default().verify_root(backend, "c", None).await;
        assert!(result.passed());
        assert_eq!(result.total_entries_checked, 0);
    }

    #[tokio::test]
    async fn test_tampered_payload_reports_hash_mismatch() {
        let (memory, backend) = setup();
        chain(&backend, "c", 5).await;
        tamper(&memory, "c/000003_event.json").await;

        let result = Verifier::default().verify_root(backend, "c", None).await;
        assert_eq!(result.status, Status::Fail);
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::HashMismatch);
        assert_eq!(first.sequence, Some(3));
        assert!(result.all_violations.is_empty());
        assert_eq!(result.total_entries_checked, 4);
    }

    #[tokio::test]
    async fn test_collect_all_fails_later_anchors() {
        let (memory, backend) = setup();
        chain(&backend, "c", 5).await;
        tamper(&memory, "c/000000_event.json").await;

        let verifier = Verifier::new(VerifyOptions::default().fail_fast(false));
        let result = verifier.verify_root(backend, "c", None).await;

        let kinds: Vec<_> = result.all_violations.iter().map(|v| (v.kind, v.sequence)).collect();
        assert_eq!(
            kinds,
            vec![
                (ViolationKind::HashMismatch, Some(0)),
                (ViolationKind::AnchorMismatch, Some(1)),
            ]
        );
        assert_eq!(result.first_violation.as_ref(), result.all_violations.first());
        assert_eq!(result.total_entries_checked, 5);
        assert!(!result.anchor_checks[0].matched);
    }

    #[tokio::test]
    async fn test_prev_hash_rewrite_detected() {
        let (memory, backend) = setup();
        chain(&backend, "c", 3).await;
        let key = "c/000002_event.json";
        let mut record: serde_json::Value =
            serde_json::from_slice(&memory.get(key).await.unwrap()).unwrap();
        record["prev_hash"] = json!(GENESIS.to_hex());
        memory.overwrite(key, serde_json::to_vec(&record).unwrap()).await;

        let result = Verifier::default().verify_root(backend, "c", None).await;
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::HashMismatch);
        assert_eq!(first.sequence, Some(2));
        assert_eq!(first.actual_digest, Some(GENESIS));
    }

    #[tokio::test]
    async fn test_truncation_is_fatal_without_fail_fast() {
        let (memory, backend) = setup();
        chain(&backend, "c", 5).await;
        memory.remove("c/000004_event.json").await.unwrap();

        let verifier = Verifier::new(VerifyOptions::default().fail_fast(false));
        let result = verifier.verify_root(backend, "c", None).await;
        assert_eq!(result.all_violations.len(), 1);
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::Truncation);
        assert_eq!(first.sequence, Some(4));
        assert_eq!(result.total_entries_checked, 0);
    }

    #[tokio::test]
    async fn test_extension_is_truncation_class() {
        let (memory, backend) = setup();
        chain(&backend, "c", 2).await;
        memory.overwrite("c/000002_extra.json", b"{}".to_vec()).await;

        let result = Verifier::default().verify_root(backend, "c", None).await;
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::Truncation);
        assert_eq!(first.sequence, Some(2));
    }

    #[tokio::test]
    async fn test_sequence_gap() {
        let (memory, backend) = setup();
        chain(&backend, "c", 3).await;
        let moved = memory.remove("c/000001_event.json").await.unwrap();
        memory.overwrite("c/000005_event.json", moved).await;

        let result = Verifier::default().verify_root(backend, "c", None).await;
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::SequenceGap);
        assert_eq!(first.sequence, Some(1));
    }

    #[tokio::test]
    async fn test_corrupt_entry() {
        let (memory, backend) = setup();
        chain(&backend, "c", 5).await;
        memory
            .overwrite("c/000003_event.json", br#"{"corrupted": true}"#.to_vec())
            .await;

        let result = Verifier::default().verify_root(backend, "c", None).await;
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::CorruptEntry);
        assert_eq!(first.sequence, Some(3));
        assert_eq!(result.total_entries_checked, 3);
    }

    #[tokio::test]
    async fn test_missing_chain() {
        let (_, backend) = setup();
        let result = Verifier::default().verify_root(backend, "nowhere", None).await;
        assert_eq!(result.chain_id, "nowhere");
        assert_eq!(
            result.first_violation.unwrap().kind,
            ViolationKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_chain_id_filter() {
        let (_, backend) = setup();
        chain(&backend, "a", 2).await;

        let wrong = Verifier::new(VerifyOptions::default().chain_id("b"));
        let result = wrong.verify_root(Arc::clone(&backend), "a", None).await;
        assert_eq!(
            result.first_violation.unwrap().kind,
            ViolationKind::ChainIdMismatch
        );

        let right = Verifier::new(VerifyOptions::default().chain_id("a"));
        assert!(right.verify_root(backend, "", None).await.passed());
    }

    #[tokio::test]
    async fn test_strict_requires_anchor() {
        let (_, backend) = setup();
        chain(&backend, "c", 1).await;

        let lenient = Verifier::default().verify_root(Arc::clone(&backend), "c", None).await;
        assert!(lenient.passed());

        let strict = Verifier::new(VerifyOptions::default().strict(true));
        let result = strict.verify_root(backend, "c", None).await;
        assert_eq!(
            result.first_violation.unwrap().kind,
            ViolationKind::MissingAnchor
        );
    }

    #[tokio::test]
    async fn test_pinned_anchor() {
        let (_, backend) = setup();
        let anchors = chain(&backend, "c", 4).await;

        let pinned = Verifier::new(
            VerifyOptions::default()
                .strict(true)
                .pinned_anchor(anchors[0].clone()),
        );
        let result = pinned.verify_root(Arc::clone(&backend), "c", None).await;
        assert!(result.passed());
        assert_eq!(result.anchor_checks.len(), 1);

        let mut forged = anchors[0].clone();
        forged.root_hash = GENESIS;
        let result = Verifier::new(VerifyOptions::default().pinned_anchor(forged))
            .verify_root(backend, "c", None)
            .await;
        assert_eq!(
            result.first_violation.unwrap().kind,
            ViolationKind::AnchorMismatch
        );
    }

    #[tokio::test]
    async fn test_anchor_past_tip_is_mismatch() {
        let (_, backend) = setup();
        chain(&backend, "c", 2).await;
        let beyond = Anchor::new("c", 7, GENESIS, Utc::now());

        let result = Verifier::new(VerifyOptions::default().pinned_anchor(beyond))
            .verify_root(backend, "c", None)
            .await;
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::AnchorMismatch);
        assert_eq!(first.actual_digest, None);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (_, backend) = setup();
        chain(&backend, "c", 3).await;

        let token = CancellationToken::new();
        token.cancel();
        let result = Verifier::default()
            .with_cancellation(token)
            .verify_root(backend, "c", None)
            .await;
        assert_eq!(result.status, Status::Fail);
        assert_eq!(
            result.first_violation.unwrap().kind,
            ViolationKind::Cancelled
        );
    }

    #[tokio::test]
    async fn test_timeout_mid_walk() {
        let slow = Arc::new(MemoryBackend::new().with_get_delay(Duration::from_millis(40)));
        let backend: Arc<dyn StorageBackend> = slow;
        chain(&backend, "c", 10).await;

        let verifier =
            Verifier::new(VerifyOptions::default().chain_timeout(Duration::from_millis(150)));
        let result = verifier.verify_root(backend, "c", None).await;
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::Timeout);
        assert!(result.total_entries_checked < 10);
    }

    #[tokio::test]
    async fn test_transient_failure_is_not_tampering() {
        let (memory, backend) = setup();
        chain(&backend, "c", 3).await;
        memory.fail_transiently("c/000001_event.json", 1).await;

        let result = Verifier::default().verify_root(backend, "c", None).await;
        let first = result.first_violation.unwrap();
        assert_eq!(first.kind, ViolationKind::BackendUnavailable);
        assert_eq!(first.sequence, Some(1));
    }

    #[tokio::test]
    async fn test_blake3_chain() {
        let (_, backend) = setup();
        let mut writer = ChainWriter::create(Arc::clone(&backend), "b3", "b3")
            .await
            .unwrap()
            .with_algorithm(HashAlgorithm::Blake3);
        writer.append(None, json!("x")).await.unwrap();
        writer.finish().await.unwrap();

        let result = Verifier::default().verify_root(backend, "b3", None).await;
        assert!(result.passed());
        assert_eq!(result.hash_algorithm, HashAlgorithm::Blake3);
    }

    #[test]
    fn test_fallback_chain_id() {
        assert_eq!(fallback_chain_id("memory:///batch/orders"), "orders");
        assert_eq!(fallback_chain_id("/data/chains/"), "chains");
        assert_eq!(fallback_chain_id("x"), "x");
    }
}
