//! Operation outcome type
//!
//! Every lifecycle operation returns an explicit [`Outcome`] instead of
//! signalling retry or failure by raising through the host: the scheduler
//! branches on the value. `RetryAfter` is the only retryable outcome; every
//! `Failure` is terminal for the current workflow run.

use std::time::Duration;

use crate::error::Error;
use crate::recorder::PersistedResourceState;

/// Result of one lifecycle operation invocation
#[derive(Debug)]
pub enum Outcome {
    /// The operation finished; the persisted state reflects the droplet
    Success(PersistedResourceState),
    /// The provider has not settled yet; re-invoke after `delay`
    RetryAfter {
        /// How long the host should wait before re-dispatching
        delay: Duration,
        /// Human-readable description of what is still pending
        reason: String,
    },
    /// The operation failed terminally; requires manual correction or a
    /// fresh operation
    Failure(Error),
}

impl Outcome {
    /// Build a retry outcome
    pub fn retry_after(delay: Duration, reason: impl Into<String>) -> Self {
        Self::RetryAfter {
            delay,
            reason: reason.into(),
        }
    }

    /// Whether the operation finished successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Whether the host should re-invoke later
    pub fn is_retry(&self) -> bool {
        matches!(self, Outcome::RetryAfter { .. })
    }

    /// Whether the operation failed terminally
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

impl From<Error> for Outcome {
    fn from(err: Error) -> Self {
        Self::Failure(err)
    }
}
