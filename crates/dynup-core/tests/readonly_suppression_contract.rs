//! Architectural Contract Test: Read-Only Record Suppression
//!
//! This test verifies that provider-locked records always win over
//! local addresses.
//!
//! Constraints verified:
//! - A read-only record is never removed, whatever its value
//! - A read-only record suppresses additions for its whole IP version
//! - Editable records sharing a locked version become surplus
//! - Suppression covers one version, not the whole hostname
//! - Read-only records of other hostnames suppress nothing
//!
//! If this test fails, the engine fights records it cannot change.

mod common;

use common::*;
use dynup_core::{CycleOutcome, ReconcileSummary};

#[tokio::test]
async fn read_only_record_is_never_removed() {
    // The locked A record carries a stale value; the engine must leave
    // it alone and must not add a competing record either
    let (handle, outcome) = run_single_pass(
        addresses(Some("203.0.113.8"), None),
        vec![provider_record(TEST_HOST, "203.0.113.7", false)],
        ("203.0.113.7", "::1"),
    )
    .await;

    assert!(
        handle.ops().is_empty(),
        "a locked record admits no writes for its version"
    );
    assert_eq!(outcome, CycleOutcome::Reconciled(ReconcileSummary::default()));
}

#[tokio::test]
async fn locked_version_makes_matching_editable_records_surplus() {
    // The editable twin matches the desired address exactly; the locked
    // record still owns the version, so the twin is surplus
    let (handle, _) = run_single_pass(
        addresses(Some("203.0.113.7"), None),
        vec![
            provider_record(TEST_HOST, "203.0.113.7", false),
            provider_record(TEST_HOST, "203.0.113.7", true),
        ],
        ("198.51.100.1", "::1"),
    )
    .await;

    assert_eq!(
        handle.ops(),
        vec![ProviderOp::Remove {
            name: TEST_HOST.to_string(),
            value: "203.0.113.7".to_string(),
        }],
        "only the editable twin may be removed"
    );
}

#[tokio::test]
async fn suppression_covers_only_the_locked_version() {
    // v4 locked, v6 free: the v6 side still reconciles normally
    let (handle, _) = run_single_pass(
        addresses(Some("203.0.113.8"), Some("2001:db8::8")),
        vec![provider_record(TEST_HOST, "203.0.113.7", false)],
        ("203.0.113.7", "2001:db8::7"),
    )
    .await;

    assert_eq!(
        handle.ops(),
        vec![ProviderOp::Add {
            name: TEST_HOST.to_string(),
            address: "2001:db8::8".parse().unwrap(),
        }],
        "the free version must reconcile despite the locked one"
    );
}

#[tokio::test]
async fn locked_records_of_other_hostnames_suppress_nothing() {
    let (handle, _) = run_single_pass(
        addresses(Some("203.0.113.8"), None),
        vec![provider_record("locked.example.com", "198.51.100.9", false)],
        ("203.0.113.7", "::1"),
    )
    .await;

    assert_eq!(
        handle.ops(),
        vec![ProviderOp::Add {
            name: TEST_HOST.to_string(),
            address: "203.0.113.8".parse().unwrap(),
        }],
        "a foreign locked record must not suppress our additions"
    );
}
