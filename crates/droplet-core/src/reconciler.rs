//! Droplet lifecycle reconciler
//!
//! The reconciler turns one declared lifecycle operation into provider calls
//! and persisted state transitions:
//!
//! ```text
//! absent -> creating -> active -> stopping -> stopped -> deleting -> deleted
//! ```
//!
//! plus a synthetic errored state reachable from any transition. Each
//! operation runs to completion or to a retry signal within one invocation;
//! the host scheduler re-dispatches on [`Outcome::RetryAfter`] and treats
//! every [`Outcome::Failure`] as terminal for the run.
//!
//! ## Re-invocation safety
//!
//! - create binds the droplet id at provider acceptance, so a re-invoked
//!   create resumes the pending droplet instead of provisioning a second one
//! - start/stop short-circuit when the droplet is already in the target
//!   state, so a re-dispatch after a pending poll converges
//! - delete treats an already-absent droplet as done, and confirms an actual
//!   destroy only by observing the droplet gone from a fresh listing
//!
//! ## Caller obligations
//!
//! The orchestrator must not run two operations concurrently against the
//! same instance record; the reconciler assumes exclusive access for the
//! duration of one invocation and locks nothing itself. Total retry budget
//! is also the orchestrator's: the reconciler signals "retry in 30" but
//! never loops in-process.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::outcome::Outcome;
use crate::poller::{ActionPoller, Poll};
use crate::recorder::{
    OwnershipContext, PersistedResourceState, ResourceProperties, StateRecorder,
};
use crate::traits::{ComputeProvider, RuntimeContext, ServerHandle, ServerId, ServerSpec};

/// Fixed placeholder name used when the caller does not supply one
pub const DEFAULT_SERVER_NAME: &str = "unnamed-droplet";

/// Inputs for a create operation
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Droplet name; a fixed placeholder is used when absent
    pub name: Option<String>,
    /// Region slug
    pub region: String,
    /// Image slug
    pub image: String,
    /// Size slug
    pub size_slug: String,
    /// Whether automated backups are enabled (defaults to on)
    pub backups: bool,
    /// SSH key identifiers to attach
    pub ssh_keys: Vec<String>,
}

impl CreateRequest {
    /// Build a request with the default backups setting and no name
    pub fn new(
        region: impl Into<String>,
        image: impl Into<String>,
        size_slug: impl Into<String>,
    ) -> Self {
        Self {
            name: None,
            region: region.into(),
            image: image.into(),
            size_slug: size_slug.into(),
            backups: true,
            ssh_keys: Vec::new(),
        }
    }

    /// Set the droplet name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable or disable automated backups
    pub fn with_backups(mut self, backups: bool) -> Self {
        self.backups = backups;
        self
    }

    /// Attach SSH keys
    pub fn with_ssh_keys(mut self, keys: Vec<String>) -> Self {
        self.ssh_keys = keys;
        self
    }

    /// Resolve the request into the spec handed to the provider
    fn to_spec(&self) -> ServerSpec {
        ServerSpec {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            region: self.region.clone(),
            image: self.image.clone(),
            size_slug: self.size_slug.clone(),
            backups: self.backups,
            ssh_keys: self.ssh_keys.clone(),
        }
    }
}

/// Reconciles one declared droplet against the provider's actual state
///
/// Constructed fresh for every invocation: the credential and the provider
/// connection are never cached across invocations.
pub struct DropletReconciler<'a> {
    provider: &'a dyn ComputeProvider,
    ctx: &'a RuntimeContext,
}

impl<'a> DropletReconciler<'a> {
    /// Create a reconciler over a provider and the host's runtime context
    pub fn new(provider: &'a dyn ComputeProvider, ctx: &'a RuntimeContext) -> Self {
        Self { provider, ctx }
    }

    /// Create the droplet declared by `request`
    ///
    /// Refuses when a fully provisioned droplet is already recorded for this
    /// instance; a second provider create call is never issued. A creation
    /// left pending by an earlier invocation is resumed instead.
    pub async fn create(&self, request: &CreateRequest) -> Outcome {
        match self.try_create(request).await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Failure(err),
        }
    }

    /// Power on the recorded droplet
    pub async fn start(&self) -> Outcome {
        match self.try_start().await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Failure(err),
        }
    }

    /// Gracefully shut the recorded droplet down
    pub async fn stop(&self) -> Outcome {
        match self.try_stop().await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Failure(err),
        }
    }

    /// Destroy the recorded droplet and confirm it is gone
    pub async fn delete(&self) -> Outcome {
        match self.try_delete().await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Failure(err),
        }
    }

    async fn try_create(&self, request: &CreateRequest) -> Result<Outcome> {
        let recorder = StateRecorder::new(self.ctx);
        let poller = ActionPoller::new(self.provider);

        if let Some(state) = recorder.read().await? {
            if state.is_provisioned() {
                return Err(Error::AlreadyProvisioned(state.resource_id));
            }
            // An earlier invocation bound the id but the creation action had
            // not settled yet.
            info!("resuming creation of droplet {}", state.resource_id);
            return self
                .settle_creation(&recorder, &poller, state.resource_id, request)
                .await;
        }

        let spec = request.to_spec();
        info!(
            name = %spec.name,
            region = %spec.region,
            image = %spec.image,
            size = %spec.size_slug,
            backups = spec.backups,
            "creating droplet"
        );

        // A rejection here means no id was ever bound: abort without polling.
        let handle = self.provider.create_server(&spec).await?;
        recorder.bind_resource_id(handle.id).await?;

        self.settle_creation(&recorder, &poller, handle.id, request)
            .await
    }

    /// Poll the pending creation and commit the full record once it settles
    async fn settle_creation(
        &self,
        recorder: &StateRecorder<'_>,
        poller: &ActionPoller<'_>,
        id: ServerId,
        request: &CreateRequest,
    ) -> Result<Outcome> {
        match poller.confirm(id).await? {
            Poll::RetryLater(delay) => Ok(Outcome::retry_after(
                delay,
                format!("waiting for droplet {} creation to complete", id),
            )),
            Poll::Done => {
                let mut handle = self
                    .find_server(id)
                    .await?
                    .ok_or(Error::ResourceNotFound(id))?;
                // The listing does not echo key associations; carry the
                // requested keys into the snapshot.
                handle.ssh_keys = request.ssh_keys.clone();

                let context = OwnershipContext::generate(self.ctx.identity());
                let properties = ResourceProperties::from_handle(&handle);
                recorder.commit(&handle, &context, &properties).await?;

                info!("droplet {} active", id);
                Ok(Outcome::Success(PersistedResourceState {
                    resource_id: handle.id,
                    resource_context: Some(context),
                    resource_properties: Some(properties),
                }))
            }
        }
    }

    async fn try_start(&self) -> Result<Outcome> {
        let recorder = StateRecorder::new(self.ctx);
        let poller = ActionPoller::new(self.provider);

        let state = recorder
            .read()
            .await?
            .ok_or(Error::MissingResourceId("start"))?;
        let id = state.resource_id;

        let handle = self
            .find_server(id)
            .await?
            .ok_or(Error::ResourceNotFound(id))?;

        if handle.status.is_active() {
            debug!("droplet {} is already active", id);
            return Ok(Outcome::Success(state));
        }

        info!("powering droplet {} on", id);
        self.provider.power_on(id).await?;

        match poller.confirm(id).await? {
            Poll::RetryLater(delay) => Ok(Outcome::retry_after(
                delay,
                format!("waiting for droplet {} to power on", id),
            )),
            Poll::Done => {
                info!("droplet {} powered on", id);
                Ok(Outcome::Success(state))
            }
        }
    }

    async fn try_stop(&self) -> Result<Outcome> {
        let recorder = StateRecorder::new(self.ctx);
        let poller = ActionPoller::new(self.provider);

        let state = recorder
            .read()
            .await?
            .ok_or(Error::MissingResourceId("stop"))?;
        let id = state.resource_id;

        let handle = self
            .find_server(id)
            .await?
            .ok_or(Error::ResourceNotFound(id))?;

        if handle.status.is_off() {
            debug!("droplet {} is already off", id);
            return Ok(Outcome::Success(state));
        }

        info!("shutting droplet {} down", id);
        // TODO: fall back to a hard power_off when a graceful shutdown never
        // settles within the orchestrator's retry budget
        self.provider.shutdown(id).await?;

        match poller.confirm(id).await? {
            Poll::RetryLater(delay) => Ok(Outcome::retry_after(
                delay,
                format!("waiting for droplet {} to shut down", id),
            )),
            Poll::Done => {
                info!("droplet {} shut down", id);
                Ok(Outcome::Success(state))
            }
        }
    }

    async fn try_delete(&self) -> Result<Outcome> {
        let recorder = StateRecorder::new(self.ctx);
        let poller = ActionPoller::new(self.provider);

        let state = recorder
            .read()
            .await?
            .ok_or(Error::MissingResourceId("delete"))?;
        let id = state.resource_id;

        if self.find_server(id).await?.is_none() {
            info!("droplet {} is already absent", id);
            return Ok(Outcome::Success(state));
        }

        info!("destroying droplet {}", id);
        self.provider.destroy(id).await?;

        match poller.confirm(id).await? {
            Poll::RetryLater(delay) => Ok(Outcome::retry_after(
                delay,
                format!("waiting for droplet {} to be destroyed", id),
            )),
            Poll::Done => {
                // Acceptance of the destroy action is not enough: deletion is
                // confirmed only by observing the droplet absent from a fresh
                // listing.
                if self.find_server(id).await?.is_some() {
                    return Err(Error::DeletionNotConfirmed(id));
                }
                info!("droplet {} destroyed", id);
                Ok(Outcome::Success(state))
            }
        }
    }

    /// Look a droplet up by id
    ///
    /// The provider API exposes no direct get-by-id for this surface, so the
    /// lookup scans the full listing. Linear in the number of droplets the
    /// credential owns; no cache is kept, since a stale entry could break the
    /// one-droplet-per-instance invariant.
    async fn find_server(&self, id: ServerId) -> Result<Option<ServerHandle>> {
        let servers = self.provider.list_servers().await?;
        Ok(servers.into_iter().find(|s| s.id == id))
    }
}
