//! Concurrent verification of independent chains.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chainwarden_storage::StorageBackend;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::anchor::AnchorStore;
use crate::result::{Status, VerificationResult, Violation, ViolationKind};
use crate::storage::describe_root;
use crate::verify::{Verifier, VerifyOptions, fallback_chain_id};

/// Upper bound for the default worker count, to stay within typical
/// object-store connection limits.
pub const MAX_DEFAULT_CONCURRENCY: usize = 8;

/// Default worker count: available cores, capped at
/// [`MAX_DEFAULT_CONCURRENCY`].
#[must_use]
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(MAX_DEFAULT_CONCURRENCY)
}

/// One chain to verify.
#[derive(Debug, Clone)]
pub struct ChainTarget {
    /// Backend holding the chain.
    pub backend: Arc<dyn StorageBackend>,
    /// Chain root key on the backend.
    pub root: String,
    /// Anchor store overriding `<root>/anchors`.
    pub anchors: Option<AnchorStore>,
}

impl ChainTarget {
    /// Target the chain at `root`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, root: impl Into<String>) -> Self {
        Self {
            backend,
            root: root.into(),
            anchors: None,
        }
    }

    /// Read anchors from `anchors`.
    #[must_use]
    pub fn with_anchors(mut self, anchors: AnchorStore) -> Self {
        self.anchors = Some(anchors);
        self
    }
}

/// Verifies many chains with bounded concurrency.
///
/// Each chain is walked sequentially by its own task; chains run in
/// parallel up to `concurrency`. Results are returned sorted by chain id
/// (then root), independent of completion order.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    options: VerifyOptions,
    concurrency: usize,
    batch_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// Create a runner with the default concurrency.
    #[must_use]
    pub fn new(options: VerifyOptions) -> Self {
        Self {
            options,
            concurrency: default_concurrency(),
            batch_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the worker count (at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Bound the whole batch; unfinished chains are reported cancelled.
    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Cancel the batch when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Verify every target. Never fails; each chain's problems are in its
    /// own result.
    pub async fn verify_all(&self, targets: Vec<ChainTarget>) -> Vec<VerificationResult> {
        if targets.is_empty() {
            return Vec::new();
        }

        let total = targets.len();
        let batch_token = self.cancel.child_token();
        let deadline_guard = self.batch_timeout.map(|timeout| {
            let token = batch_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Batch deadline reached, cancelling"
                );
                token.cancel();
            })
        });

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<(usize, VerificationResult)>(total);
        let mut tasks = JoinSet::new();

        // Labels for chains whose task dies without reporting.
        let labels: Vec<String> = targets
            .iter()
            .map(|t| describe_root(t.backend.as_ref(), &t.root))
            .collect();

        for (index, target) in targets.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let verifier = Verifier::new(self.options.clone()).with_cancellation(batch_token.clone());
            tasks.spawn(async move {
                // A closed semaphore still lets the verifier report cancellation.
                let _permit = semaphore.acquire_owned().await.ok();
                let result = verifier
                    .verify_root(target.backend, &target.root, target.anchors)
                    .await;
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut slots: Vec<Option<VerificationResult>> = vec![None; total];
        while let Some((index, result)) = rx.recv().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
            }
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Chain verification task failed");
            }
        }
        if let Some(guard) = deadline_guard {
            guard.abort();
        }

        let mut results: Vec<VerificationResult> = slots
            .into_iter()
            .zip(labels)
            .map(|(slot, label)| slot.unwrap_or_else(|| aborted(&self.options, label)))
            .collect();
        results.sort_by(|a, b| a.chain_id.cmp(&b.chain_id).then_with(|| a.root.cmp(&b.root)));

        let failed = results.iter().filter(|r| !r.passed()).count();
        info!(chains = total, failed, "Batch verified");
        results
    }
}

fn aborted(options: &VerifyOptions, root: String) -> VerificationResult {
    let violation = Violation::new(ViolationKind::Cancelled, None)
        .with_detail("verification task aborted before reporting");
    let chain_id = options
        .chain_id
        .clone()
        .unwrap_or_else(|| fallback_chain_id(&root));
    VerificationResult {
        chain_id,
        root,
        hash_algorithm: chainwarden_crypto::HashAlgorithm::default(),
        total_entries_checked: 0,
        all_violations: if options.fail_fast {
            Vec::new()
        } else {
            vec![violation.clone()]
        },
        first_violation: Some(violation),
        anchor_checks: Vec::new(),
        status: Status::Fail,
        elapsed: Duration::ZERO,
    }
}
