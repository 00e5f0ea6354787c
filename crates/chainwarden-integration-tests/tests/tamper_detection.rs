//! Tamper, truncation and anchor detection on every backend.

mod common;

use std::sync::Arc;

use chainwarden_audit::{Anchor, ChainWriter, Status, Verifier, VerifyOptions, ViolationKind};
use chainwarden_crypto::{Digest, HashAlgorithm};
use chainwarden_storage::StorageBackend;
use chainwarden_test::{
    ChainFixture, TestStore, delete_entry, fixture_time, forge_extension, overwrite_entry_raw,
    restore_entry, set_declared_length, setup_test_logging_default, tamper_payload,
};
use common::{collect_all, findings, first, verify};
use serde_json::{Value, json};

#[tokio::test]
async fn test_untouched_chain_verifies_identically_twice() {
    setup_test_logging_default();
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 8)
            .with_anchor_at(3)
            .with_anchor_at(7)
            .build(&store)
            .await;

        let once = verify(&store, &chain, VerifyOptions::default()).await;
        let twice = verify(&store, &chain, VerifyOptions::default()).await;

        assert!(once.passed(), "{}: {:?}", store.name(), once.first_violation);
        assert_eq!(once.total_entries_checked, 8);
        assert_eq!(once.anchor_checks.len(), 2);
        assert_eq!(once.anchors_matched(), 2);
        assert_eq!(once.without_timing(), twice.without_timing(), "{}", store.name());
    }
}

#[tokio::test]
async fn test_payload_tamper_reported_at_its_sequence() {
    let len = 6;
    for store in TestStore::all() {
        let chain = ChainFixture::new("payments", len).build(&store).await;

        for i in 0..len {
            tamper_payload(&store, &chain, i, json!({"amount": 1_000_000})).await;

            let result = verify(&store, &chain, VerifyOptions::default()).await;
            assert_eq!(result.status, Status::Fail);
            assert_eq!(
                first(&result),
                Some((ViolationKind::HashMismatch, Some(i))),
                "{} tampered at {i}",
                store.name()
            );
            assert!(result.all_violations.is_empty());
            assert_eq!(result.total_entries_checked, i + 1);

            restore_entry(&store, &chain, i).await;
        }
    }
}

#[tokio::test]
async fn test_anchors_at_or_after_tamper_fail() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("payments", 6)
            .with_anchor_at(1)
            .with_anchor_at(3)
            .with_anchor_at(5)
            .build(&store)
            .await;

        for i in 0..6u64 {
            tamper_payload(&store, &chain, i, json!({"forged": i})).await;
            let result = verify(&store, &chain, collect_all()).await;

            assert_eq!(first(&result), Some((ViolationKind::HashMismatch, Some(i))));
            assert_eq!(result.total_entries_checked, 6, "walk continues past a finding");
            assert_eq!(result.anchor_checks.len(), 3);
            for check in &result.anchor_checks {
                assert_eq!(
                    check.matched,
                    check.sequence_at_anchor < i,
                    "{}: anchor at {} with tamper at {i}",
                    store.name(),
                    check.sequence_at_anchor
                );
            }

            let anchor_failures: Vec<_> = findings(&result)
                .into_iter()
                .filter(|(kind, _)| *kind == ViolationKind::AnchorMismatch)
                .map(|(_, seq)| seq)
                .collect();
            let expected: Vec<_> = [1u64, 3, 5]
                .into_iter()
                .filter(|k| *k >= i)
                .map(Some)
                .collect();
            assert_eq!(anchor_failures, expected);

            restore_entry(&store, &chain, i).await;
        }
    }
}

#[tokio::test]
async fn test_restoring_original_bytes_passes_again() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 4).with_anchor_at(3).build(&store).await;
        let baseline = verify(&store, &chain, VerifyOptions::default()).await;

        tamper_payload(&store, &chain, 2, json!({"seq": 2, "rewritten": true})).await;
        assert!(!verify(&store, &chain, VerifyOptions::default()).await.passed());

        restore_entry(&store, &chain, 2).await;
        let restored = verify(&store, &chain, VerifyOptions::default()).await;
        assert!(restored.passed(), "{}", store.name());
        assert_eq!(restored.without_timing(), baseline.without_timing());
    }
}

#[tokio::test]
async fn test_corrupt_then_restore_scenario() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("orders", 5).build(&store).await;
        assert!(chain.entry_key(3).ends_with("000003_settled.json"));

        overwrite_entry_raw(&store, &chain, 3, br#"{"corrupted": true}"#.to_vec()).await;
        let result = verify(&store, &chain, VerifyOptions::default()).await;
        assert_eq!(result.status, Status::Fail);
        let (kind, sequence) = first(&result).unwrap();
        assert!(
            matches!(kind, ViolationKind::CorruptEntry | ViolationKind::HashMismatch),
            "{}: {kind}",
            store.name()
        );
        assert_eq!(sequence, Some(3));

        restore_entry(&store, &chain, 3).await;
        let result = verify(&store, &chain, VerifyOptions::default()).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.total_entries_checked, 5);
    }
}

#[tokio::test]
async fn test_deleted_tail_is_fatal_truncation() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 5).build(&store).await;
        delete_entry(&store, &chain, 4).await;

        for options in [VerifyOptions::default(), collect_all()] {
            let result = verify(&store, &chain, options).await;
            assert_eq!(first(&result), Some((ViolationKind::Truncation, Some(4))));
            assert_eq!(result.total_entries_checked, 0, "truncation stops before the walk");
            assert!(result.all_violations.len() <= 1);
        }
    }
}

#[tokio::test]
async fn test_deleted_middle_entry_reported_where_missing() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 5).build(&store).await;
        delete_entry(&store, &chain, 2).await;

        let result = verify(&store, &chain, collect_all()).await;
        assert_eq!(findings(&result), vec![(ViolationKind::Truncation, Some(2))]);
    }
}

#[tokio::test]
async fn test_extension_beyond_declared_length_rejected() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 5).build(&store).await;
        forge_extension(&store, &chain, json!({"seq": 5, "late": true})).await;

        let result = verify(&store, &chain, collect_all()).await;
        let violation = result.first_violation.as_ref().unwrap();
        assert_eq!(violation.kind, ViolationKind::Truncation, "{}", store.name());
        assert_eq!(violation.sequence, Some(5));
        assert!(violation.detail.as_deref().unwrap().contains("extends beyond"));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_entry_reported_not_truncated() {
    let store = TestStore::fs();
    let chain = ChainFixture::new("ledger", 4).build(&store).await;

    let outside = tempfile::tempdir().unwrap();
    let copy = outside.path().join("000002.json");
    std::fs::write(&copy, &chain.originals[&2].1).unwrap();
    delete_entry(&store, &chain, 2).await;
    std::os::unix::fs::symlink(&copy, store.local_path(chain.entry_key(2)).unwrap()).unwrap();

    let result = verify(&store, &chain, VerifyOptions::default()).await;
    let violation = result.first_violation.as_ref().unwrap();
    assert_eq!(violation.kind, ViolationKind::NotFound);
    assert_eq!(violation.sequence, Some(2));
    assert!(violation.detail.as_deref().unwrap().contains("symbolic link"));
    assert_eq!(result.total_entries_checked, 2);
}

#[tokio::test]
async fn test_manifest_shrunk_below_stored_entries_rejected() {
    let store = TestStore::memory();
    let chain = ChainFixture::new("ledger", 5).build(&store).await;
    set_declared_length(&store, &chain, 3).await;

    let result = verify(&store, &chain, VerifyOptions::default()).await;
    assert_eq!(first(&result), Some((ViolationKind::Truncation, Some(3))));
}

#[tokio::test]
async fn test_rollback_detected_by_anchor_past_tip() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 5).with_anchor_at(4).build(&store).await;

        // Drop the last entry and rewrite the manifest to match.
        delete_entry(&store, &chain, 4).await;
        set_declared_length(&store, &chain, 4).await;

        let result = verify(&store, &chain, VerifyOptions::default()).await;
        assert_eq!(result.total_entries_checked, 4);
        assert_eq!(first(&result), Some((ViolationKind::AnchorMismatch, Some(4))));
        assert_eq!(result.anchor_checks[0].actual_root, None);
    }
}

#[tokio::test]
async fn test_fail_fast_reports_first_of_two_findings() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 7).build(&store).await;
        tamper_payload(&store, &chain, 2, json!({"x": 2})).await;
        tamper_payload(&store, &chain, 5, json!({"x": 5})).await;

        let fast = verify(&store, &chain, VerifyOptions::default()).await;
        assert_eq!(findings(&fast), vec![(ViolationKind::HashMismatch, Some(2))]);
        assert!(fast.all_violations.is_empty());

        let all = verify(&store, &chain, collect_all()).await;
        assert_eq!(
            findings(&all),
            vec![
                (ViolationKind::HashMismatch, Some(2)),
                (ViolationKind::HashMismatch, Some(5)),
            ],
            "{}",
            store.name()
        );
        assert_eq!(all.first_violation.as_ref(), all.all_violations.first());
    }
}

#[tokio::test]
async fn test_blake3_chain_verifies_and_detects_tamper() {
    let store = TestStore::fs();
    let chain = ChainFixture::new("ledger", 4)
        .with_algorithm(HashAlgorithm::Blake3)
        .with_anchor_at(3)
        .build(&store)
        .await;
    assert_eq!(chain.manifest.hash_algorithm, HashAlgorithm::Blake3);

    let result = verify(&store, &chain, VerifyOptions::default()).await;
    assert!(result.passed());
    assert_eq!(result.hash_algorithm, HashAlgorithm::Blake3);

    tamper_payload(&store, &chain, 1, json!({"x": 1})).await;
    let result = verify(&store, &chain, VerifyOptions::default()).await;
    assert_eq!(first(&result), Some((ViolationKind::HashMismatch, Some(1))));
}

#[tokio::test]
async fn test_number_precision_edits_detected() {
    let edits = [
        ("0.1", "0.10000000000000001"),
        ("18446744073709551616", "18446744073709551617"),
    ];
    for store in TestStore::all() {
        let backend = store.backend();
        let mut writer = ChainWriter::create(Arc::clone(&backend), "prices", "prices")
            .await
            .unwrap();
        let payload: Value =
            serde_json::from_str(r#"{"amount":0.1,"units":18446744073709551616}"#).unwrap();
        writer.append_at(Some("pay"), payload, fixture_time(0)).await.unwrap();
        writer
            .append_at(Some("ack"), json!({"ok": true}), fixture_time(60))
            .await
            .unwrap();
        writer.finish().await.unwrap();

        let key = "prices/000000_pay.json";
        let original = backend.get(key).await.unwrap();
        let untouched = Verifier::default().verify_root(Arc::clone(&backend), "prices", None).await;
        assert!(untouched.passed(), "{}: {:?}", store.name(), untouched.first_violation);

        for (stored, edited) in edits {
            let text = String::from_utf8(original.clone()).unwrap();
            assert!(text.contains(stored));
            let bytes = text.replacen(stored, edited, 1).into_bytes();
            store.raw().overwrite_raw(key, bytes).await.unwrap();

            let result = Verifier::default().verify_root(Arc::clone(&backend), "prices", None).await;
            assert_eq!(result.status, Status::Fail, "{}: {stored} -> {edited}", store.name());
            assert_eq!(first(&result), Some((ViolationKind::HashMismatch, Some(0))));

            store.raw().overwrite_raw(key, original.clone()).await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_unlabelled_entries_verify() {
    let store = TestStore::object_store();
    let chain = ChainFixture::new("ledger", 3).without_labels().build(&store).await;
    assert!(chain.entry_key(0).ends_with("000000.json"));
    assert!(verify(&store, &chain, VerifyOptions::default()).await.passed());
}

#[tokio::test]
async fn test_pinned_anchor_replaces_discovery() {
    for store in TestStore::all() {
        let chain = ChainFixture::new("ledger", 5)
            .with_anchor_at(1)
            .with_anchor_at(4)
            .build(&store)
            .await;

        let pinned = VerifyOptions::default().pinned_anchor(chain.anchors[0].clone());
        let result = verify(&store, &chain, pinned).await;
        assert!(result.passed());
        assert_eq!(result.anchor_checks.len(), 1);
        assert_eq!(result.anchor_checks[0].sequence_at_anchor, 1);

        let mut forged = chain.anchors[1].clone();
        forged.root_hash = Digest::from_bytes([7u8; 32]);
        let result = verify(&store, &chain, VerifyOptions::default().pinned_anchor(forged)).await;
        assert_eq!(first(&result), Some((ViolationKind::AnchorMismatch, Some(4))));
    }
}

#[tokio::test]
async fn test_pinned_anchor_for_other_chain_rejected() {
    let store = TestStore::memory();
    let chain = ChainFixture::new("ledger", 2).build(&store).await;
    let foreign = Anchor::new("other", 0, chain.tip(), fixture_time(0));

    let result = verify(&store, &chain, VerifyOptions::default().pinned_anchor(foreign)).await;
    assert_eq!(first(&result).map(|(kind, _)| kind), Some(ViolationKind::ChainIdMismatch));
}

#[tokio::test]
async fn test_strict_mode_requires_an_anchor() {
    for store in TestStore::all() {
        let bare = ChainFixture::new("bare", 3).build(&store).await;
        let result = verify(&store, &bare, VerifyOptions::default().strict(true)).await;
        assert_eq!(first(&result), Some((ViolationKind::MissingAnchor, None)));

        let anchored = ChainFixture::new("anchored", 3).with_anchor_at(2).build(&store).await;
        let result = verify(&store, &anchored, VerifyOptions::default().strict(true)).await;
        assert!(result.passed(), "{}", store.name());

        assert!(verify(&store, &bare, VerifyOptions::default()).await.passed());
    }
}

#[tokio::test]
async fn test_chain_id_filter() {
    let store = TestStore::fs();
    let chain = ChainFixture::new("ledger", 2).at_root("batch/ledger").build(&store).await;

    let wrong = verify(&store, &chain, VerifyOptions::default().chain_id("payments")).await;
    assert_eq!(first(&wrong).map(|(kind, _)| kind), Some(ViolationKind::ChainIdMismatch));
    assert_eq!(wrong.total_entries_checked, 0);

    // A filter lets a batch root stand in for the chain root.
    let nested = chainwarden_audit::Verifier::new(VerifyOptions::default().chain_id("ledger"))
        .verify_root(store.backend(), "batch", None)
        .await;
    assert!(nested.passed(), "{:?}", nested.first_violation);
    assert_eq!(nested.chain_id, "ledger");
}

#[tokio::test]
async fn test_missing_manifest_is_not_found() {
    for store in TestStore::all() {
        let result = chainwarden_audit::Verifier::default()
            .verify_root(store.backend(), "nowhere", None)
            .await;
        assert_eq!(first(&result), Some((ViolationKind::NotFound, None)));
        assert_eq!(result.chain_id, "nowhere");
    }
}
