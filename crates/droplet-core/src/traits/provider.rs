// # Compute Provider Trait
//
// Defines the interface for executing droplet lifecycle actions against the
// provider API.
//
// ## Implementations
//
// - DigitalOcean: `droplet-provider-digitalocean` crate
//
// ## Trust Level: Untrusted
//
// Providers are single-shot executors with strict limitations:
//
// Allowed:
// - Perform HTTP/HTTPS API calls to their endpoints only
// - Parse provider-specific responses into the types below
// - Return success or failure (the reconciler decides what happens next)
//
// Forbidden:
// - Implement retry, backoff or polling loops (owned by the reconciler
//   and the host scheduler)
// - Access the runtime store (owned by the reconciler)
// - Cache state between requests, including the credential
// - Spawn tasks or sleep in-process
//
// If a call does not settle, the provider reports the pending action status
// and returns; the host scheduler re-invokes the whole operation later.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned droplet identifier, immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub i64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ServerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Status of the most recent asynchronous action taken against a droplet
///
/// Never persisted; read fresh on every poll. The provider reports
/// `"in-progress"` on the wire for [`ActionStatus::Pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// The action was accepted but has not finished
    Pending,
    /// The action finished successfully
    Completed,
    /// The action failed server-side
    Errored,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Pending => write!(f, "pending"),
            ActionStatus::Completed => write!(f, "completed"),
            ActionStatus::Errored => write!(f, "errored"),
        }
    }
}

/// Power/provisioning state the provider reports for a droplet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    /// Still provisioning
    New,
    /// Powered on and running
    Active,
    /// Powered off
    Off,
    /// Being archived/deleted
    Archive,
    /// Anything the provider reports that we do not recognize
    Unknown,
}

impl ServerStatus {
    /// Whether the droplet is powered on and running
    pub fn is_active(&self) -> bool {
        matches!(self, ServerStatus::Active)
    }

    /// Whether the droplet is powered off
    pub fn is_off(&self) -> bool {
        matches!(self, ServerStatus::Off)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::New => write!(f, "new"),
            ServerStatus::Active => write!(f, "active"),
            ServerStatus::Off => write!(f, "off"),
            ServerStatus::Archive => write!(f, "archive"),
            ServerStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Request to create a droplet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSpec {
    /// Droplet name
    pub name: String,
    /// Region slug (e.g. "nyc3")
    pub region: String,
    /// Image slug (e.g. "ubuntu-14-04-x64")
    pub image: String,
    /// Size slug determining RAM/CPU/bandwidth (e.g. "512mb")
    pub size_slug: String,
    /// Whether automated backups are enabled
    pub backups: bool,
    /// SSH key identifiers to attach
    pub ssh_keys: Vec<String>,
}

/// One remote droplet as the provider reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHandle {
    /// Provider-assigned id
    pub id: ServerId,
    /// Droplet name
    pub name: String,
    /// Region slug
    pub region: String,
    /// Image slug or name
    pub image: String,
    /// Size slug
    pub size_slug: String,
    /// Current power/provisioning state
    pub status: ServerStatus,
    /// Whether automated backups are enabled
    pub backups: bool,
    /// Disk size in GB
    pub disk: i64,
    /// Memory in MB
    pub memory: i64,
    /// vCPU count
    pub vcpus: i32,
    /// SSH keys attached at creation (the listing does not echo these;
    /// populated by `create_server` from the request)
    pub ssh_keys: Vec<String>,
    /// Tags
    pub tags: Vec<String>,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
}

/// Trait for compute provider implementations
///
/// Every method maps to exactly one provider API call. Implementations must
/// be thread-safe and usable across async tasks, and must never log the
/// credential they hold.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Create a droplet
    ///
    /// Returns the handle the provider assigned. Acceptance does not mean the
    /// droplet is ready: the creation action runs asynchronously and is
    /// observed through [`ComputeProvider::latest_action`].
    async fn create_server(&self, spec: &ServerSpec) -> Result<ServerHandle, crate::Error>;

    /// List every droplet owned by the credential
    ///
    /// The provider API exposes no direct get-by-id for the operations we
    /// consume, so lookups scan this listing. Linear in the number of
    /// droplets on the account; acceptable at tens to low hundreds, but not
    /// constant-time.
    async fn list_servers(&self) -> Result<Vec<ServerHandle>, crate::Error>;

    /// Status of the most recent action taken against the droplet
    ///
    /// Only the latest action is authoritative; history is never consulted.
    /// `None` means the provider has no action on record for the droplet.
    async fn latest_action(&self, id: ServerId) -> Result<Option<ActionStatus>, crate::Error>;

    /// Power the droplet on
    async fn power_on(&self, id: ServerId) -> Result<(), crate::Error>;

    /// Shut the droplet down gracefully
    async fn shutdown(&self, id: ServerId) -> Result<(), crate::Error>;

    /// Destroy the droplet
    ///
    /// Acceptance is not confirmation: callers must re-list and observe the
    /// droplet absent before treating the deletion as done.
    async fn destroy(&self, id: ServerId) -> Result<(), crate::Error>;

    /// Provider name (for logging and credential scoping)
    fn provider_name(&self) -> &'static str;
}
