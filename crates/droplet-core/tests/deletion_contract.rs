//! Behavior Contract Test: Deletion Confirmation
//!
//! Constraints verified:
//! - Deletion is confirmed only by observing the droplet absent from a
//!   fresh listing, never by the destroy action settling alone
//! - A droplet still listed after a completed destroy yields
//!   DeletionNotConfirmed, never silent success
//! - A droplet already absent counts as deleted without a destroy call
//! - A pending destroy yields a retry signal instead of looping in-process
//!
//! If these fail, "deleted" can lie and leak billable droplets.

mod common;

use std::time::Duration;

use common::*;
use droplet_core::{ActionStatus, DropletReconciler, Error, Outcome, ServerStatus};

#[tokio::test]
async fn delete_confirms_by_absence() {
    let provider =
        MockComputeProvider::new().with_server(sample_server(42, ServerStatus::Active));
    provider.script_action(ActionStatus::Completed);

    let (_store, ctx) = test_context();
    seed_resource_id(&ctx, 42).await;

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.delete().await;

    assert!(outcome.is_success(), "expected success, got {:?}", outcome);
    assert_eq!(provider.destroy_calls(), 1);
}

#[tokio::test]
async fn lingering_droplet_yields_deletion_not_confirmed() {
    let provider =
        MockComputeProvider::new().with_server(sample_server(42, ServerStatus::Active));
    provider.script_action(ActionStatus::Completed);
    provider.keep_servers_on_destroy();

    let (_store, ctx) = test_context();
    seed_resource_id(&ctx, 42).await;

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.delete().await;

    match outcome {
        Outcome::Failure(Error::DeletionNotConfirmed(id)) => assert_eq!(id.0, 42),
        other => panic!("expected DeletionNotConfirmed, got {:?}", other),
    }

    assert_eq!(provider.destroy_calls(), 1);
}

#[tokio::test]
async fn pending_destroy_signals_retry() {
    let provider =
        MockComputeProvider::new().with_server(sample_server(42, ServerStatus::Active));
    provider.script_action(ActionStatus::Pending);
    provider.keep_servers_on_destroy();

    let (_store, ctx) = test_context();
    seed_resource_id(&ctx, 42).await;

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.delete().await;

    match outcome {
        Outcome::RetryAfter { delay, .. } => assert_eq!(delay, Duration::from_secs(30)),
        other => panic!("expected RetryAfter, got {:?}", other),
    }
}

#[tokio::test]
async fn absent_droplet_counts_as_deleted_without_destroy_call() {
    let provider = MockComputeProvider::new(); // empty listing
    let (_store, ctx) = test_context();
    seed_resource_id(&ctx, 42).await;

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.delete().await;

    assert!(outcome.is_success());
    assert_eq!(
        provider.destroy_calls(),
        0,
        "destroy must not be issued for a droplet that is already gone"
    );
}

#[tokio::test]
async fn delete_without_recorded_id_fails() {
    let provider = MockComputeProvider::new();
    let (_store, ctx) = test_context();

    let reconciler = DropletReconciler::new(&provider, &ctx);
    let outcome = reconciler.delete().await;

    match outcome {
        Outcome::Failure(Error::MissingResourceId(op)) => assert_eq!(op, "delete"),
        other => panic!("expected MissingResourceId, got {:?}", other),
    }
}
