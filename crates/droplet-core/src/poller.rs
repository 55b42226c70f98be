//! Asynchronous action polling
//!
//! The provider executes create/power-on/shutdown/destroy asynchronously and
//! exposes a status for the most recent action. The poller queries that
//! status exactly once per invocation: the host scheduler owns retry, so a
//! pending action yields control with a fixed backoff hint instead of
//! sleeping in-process. Blocking here would hold the host's resources and
//! risk its own timeouts.
//!
//! Only the most recent action is authoritative; history is never consulted.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::traits::{ActionStatus, ComputeProvider, ServerId};

/// Fixed backoff hint handed to the host when an action is still pending
pub const ACTION_RETRY_DELAY: Duration = Duration::from_secs(30);

/// What a single poll observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// The latest action settled successfully (or none is on record)
    Done,
    /// The latest action is still running; re-invoke after the given delay
    RetryLater(Duration),
}

/// Polls the provider for completion of the most recent action
pub struct ActionPoller<'a> {
    provider: &'a dyn ComputeProvider,
}

impl<'a> ActionPoller<'a> {
    /// Create a poller over the given provider
    pub fn new(provider: &'a dyn ComputeProvider) -> Self {
        Self { provider }
    }

    /// Query the latest action status once
    ///
    /// - `Pending` maps to [`Poll::RetryLater`] with [`ACTION_RETRY_DELAY`]
    /// - `Completed` maps to [`Poll::Done`]
    /// - `Errored` is a terminal failure
    /// - No action on record counts as settled
    ///
    /// Never sleeps, never loops, never mutates persisted state.
    pub async fn confirm(&self, id: ServerId) -> Result<Poll> {
        match self.provider.latest_action(id).await? {
            Some(ActionStatus::Pending) => {
                tracing::debug!("action on droplet {} still in progress", id);
                Ok(Poll::RetryLater(ACTION_RETRY_DELAY))
            }
            Some(ActionStatus::Completed) => {
                tracing::debug!("action on droplet {} completed", id);
                Ok(Poll::Done)
            }
            Some(ActionStatus::Errored) => Err(Error::action_errored(format!(
                "most recent action on droplet {} failed server-side",
                id
            ))),
            None => {
                tracing::debug!("no action on record for droplet {}", id);
                Ok(Poll::Done)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ServerHandle, ServerSpec};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider stub whose latest action is scripted per call
    struct ScriptedProvider {
        statuses: Mutex<Vec<Option<ActionStatus>>>,
    }

    impl ScriptedProvider {
        fn new(statuses: Vec<Option<ActionStatus>>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
            }
        }
    }

    #[async_trait]
    impl ComputeProvider for ScriptedProvider {
        async fn create_server(&self, _spec: &ServerSpec) -> Result<ServerHandle> {
            unimplemented!("not exercised by poller tests")
        }

        async fn list_servers(&self) -> Result<Vec<ServerHandle>> {
            Ok(Vec::new())
        }

        async fn latest_action(&self, _id: ServerId) -> Result<Option<ActionStatus>> {
            let mut statuses = self.statuses.lock().unwrap();
            Ok(statuses.remove(0))
        }

        async fn power_on(&self, _id: ServerId) -> Result<()> {
            Ok(())
        }

        async fn shutdown(&self, _id: ServerId) -> Result<()> {
            Ok(())
        }

        async fn destroy(&self, _id: ServerId) -> Result<()> {
            Ok(())
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn pending_yields_fixed_retry_delay() {
        let provider = ScriptedProvider::new(vec![Some(ActionStatus::Pending)]);
        let poller = ActionPoller::new(&provider);

        let poll = poller.confirm(ServerId(42)).await.unwrap();
        assert_eq!(poll, Poll::RetryLater(ACTION_RETRY_DELAY));
        assert!(ACTION_RETRY_DELAY > Duration::ZERO);
    }

    #[tokio::test]
    async fn completed_is_done() {
        let provider = ScriptedProvider::new(vec![Some(ActionStatus::Completed)]);
        let poller = ActionPoller::new(&provider);

        assert_eq!(poller.confirm(ServerId(42)).await.unwrap(), Poll::Done);
    }

    #[tokio::test]
    async fn errored_is_terminal() {
        let provider = ScriptedProvider::new(vec![Some(ActionStatus::Errored)]);
        let poller = ActionPoller::new(&provider);

        let err = poller.confirm(ServerId(42)).await.unwrap_err();
        assert!(matches!(err, Error::ActionErrored(_)));
    }

    #[tokio::test]
    async fn no_action_on_record_counts_as_settled() {
        let provider = ScriptedProvider::new(vec![None]);
        let poller = ActionPoller::new(&provider);

        assert_eq!(poller.confirm(ServerId(42)).await.unwrap(), Poll::Done);
    }
}
