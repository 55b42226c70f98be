//! Behavior Contract Test: Host-Scheduled Retry Signalling
//!
//! Constraints verified:
//! - A pending provider action yields an explicit RetryAfter outcome with
//!   the fixed 30 second backoff hint, never an in-process sleep
//! - A pending poll does not mutate the persisted resource state
//! - The retry delay is a positive, fixed constant
//!
//! If these fail, retry scheduling has leaked out of the host and into the
//! operation.

mod common;

use std::time::Duration;

use common::*;
use droplet_core::{ACTION_RETRY_DELAY, ActionStatus, DropletReconciler, Outcome, ServerStatus};

#[tokio::test]
async fn pending_stop_signals_fixed_retry_delay() {
    let provider =
        MockComputeProvider::new().with_server(sample_server(42, ServerStatus::Active));
    provider.script_action(ActionStatus::Pending);

    let (store, ctx) = test_context();
    seed_resource_id(&ctx, 42).await;
    let before = store.snapshot().await;

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.stop().await;

    assert_eq!(provider.shutdown_calls(), 1, "shutdown should be issued");
    match outcome {
        Outcome::RetryAfter { delay, .. } => {
            assert_eq!(delay, Duration::from_secs(30));
        }
        other => panic!("expected RetryAfter, got {:?}", other),
    }

    let after = store.snapshot().await;
    assert_eq!(before, after, "a pending poll must not mutate state");
}

#[tokio::test]
async fn pending_start_signals_retry_and_leaves_state_untouched() {
    let provider = MockComputeProvider::new().with_server(sample_server(42, ServerStatus::Off));
    provider.script_action(ActionStatus::Pending);

    let (store, ctx) = test_context();
    seed_resource_id(&ctx, 42).await;
    let before = store.snapshot().await;

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.start().await;

    assert_eq!(provider.power_on_calls(), 1);
    match outcome {
        Outcome::RetryAfter { delay, reason } => {
            assert!(delay > Duration::ZERO, "retry delay must be positive");
            assert!(!reason.is_empty(), "retry reason must be descriptive");
        }
        other => panic!("expected RetryAfter, got {:?}", other),
    }

    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn completed_stop_succeeds() {
    let provider =
        MockComputeProvider::new().with_server(sample_server(42, ServerStatus::Active));
    provider.script_action(ActionStatus::Completed);

    let (_store, ctx) = test_context();
    seed_resource_id(&ctx, 42).await;

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.stop().await;

    assert!(outcome.is_success(), "expected success, got {:?}", outcome);
    assert_eq!(provider.shutdown_calls(), 1);
}

#[test]
fn retry_delay_is_thirty_seconds() {
    assert_eq!(ACTION_RETRY_DELAY, Duration::from_secs(30));
}
