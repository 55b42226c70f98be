//! Resource state recorder
//!
//! Reads and writes the durable record that ties one orchestration instance
//! to one droplet: the resource id, the ownership context and the
//! descriptive property snapshot. The record is the single source of truth
//! for "do we already have a resource".
//!
//! The three fields live under three named keys of the per-instance runtime
//! store. Single-key atomicity is the store's guarantee; the recorder adds no
//! transaction of its own. Each commit fully overwrites the property
//! snapshot, never merges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::{RuntimeContext, ServerHandle, ServerId, WorkflowIdentity};

/// Store key holding the provider-assigned droplet id
pub const RESOURCE_ID_KEY: &str = "resource_id";
/// Store key holding the ownership context
pub const RESOURCE_CONTEXT_KEY: &str = "resource_context";
/// Store key holding the descriptive property snapshot
pub const RESOURCE_PROPERTIES_KEY: &str = "resource_properties";

/// Orchestration identities that caused the droplet to exist
///
/// Written once at successful creation, never mutated afterwards. Read-only
/// metadata for audit and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipContext {
    /// Locally generated correlation id
    pub correlation_id: String,
    /// Node instance id
    pub instance_id: String,
    /// Node id
    pub node_id: String,
    /// Deployment id
    pub deployment_id: String,
    /// Blueprint id
    pub blueprint_id: String,
}

impl OwnershipContext {
    /// Build a context for the dispatching workflow, generating a fresh
    /// correlation id
    pub fn generate(identity: &WorkflowIdentity) -> Self {
        Self {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            instance_id: identity.instance_id.clone(),
            node_id: identity.node_id.clone(),
            deployment_id: identity.deployment_id.clone(),
            blueprint_id: identity.blueprint_id.clone(),
        }
    }
}

/// Descriptive snapshot of a droplet at creation time
///
/// The credential token is deliberately not part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProperties {
    /// Droplet name
    pub name: String,
    /// Image slug or name
    pub image: String,
    /// Size slug
    pub size: String,
    /// Region slug
    pub region: String,
    /// Disk size in GB
    pub disk: i64,
    /// Memory in MB
    pub memory: i64,
    /// vCPU count
    pub vcpus: i32,
    /// SSH keys attached at creation
    pub ssh_keys: Vec<String>,
    /// Tags
    pub tags: Vec<String>,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Whether automated backups are enabled
    pub backups: bool,
}

impl ResourceProperties {
    /// Snapshot the descriptive fields of a handle
    pub fn from_handle(handle: &ServerHandle) -> Self {
        Self {
            name: handle.name.clone(),
            image: handle.image.clone(),
            size: handle.size_slug.clone(),
            region: handle.region.clone(),
            disk: handle.disk,
            memory: handle.memory,
            vcpus: handle.vcpus,
            ssh_keys: handle.ssh_keys.clone(),
            tags: handle.tags.clone(),
            created_at: handle.created_at,
            backups: handle.backups,
        }
    }
}

/// The durable record read and written across invocations
///
/// `resource_context` and `resource_properties` are absent while a creation
/// is still settling: the id is bound at provider acceptance, the rest only
/// once the creation action completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedResourceState {
    /// Provider-assigned droplet id
    pub resource_id: ServerId,
    /// Ownership context, present once creation completed
    pub resource_context: Option<OwnershipContext>,
    /// Property snapshot, present once creation completed
    pub resource_properties: Option<ResourceProperties>,
}

impl PersistedResourceState {
    /// Whether creation has fully completed for this record
    pub fn is_provisioned(&self) -> bool {
        self.resource_properties.is_some()
    }
}

/// Reads and writes the persisted resource record through a runtime context
pub struct StateRecorder<'a> {
    ctx: &'a RuntimeContext,
}

impl<'a> StateRecorder<'a> {
    /// Create a recorder over the given context
    pub fn new(ctx: &'a RuntimeContext) -> Self {
        Self { ctx }
    }

    /// The recorded droplet id, if any
    pub async fn resource_id(&self) -> Result<Option<ServerId>> {
        match self.ctx.store().get(RESOURCE_ID_KEY).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// The last committed state, or `None` if no droplet was ever bound
    pub async fn read(&self) -> Result<Option<PersistedResourceState>> {
        let Some(resource_id) = self.resource_id().await? else {
            return Ok(None);
        };

        let resource_context = match self.ctx.store().get(RESOURCE_CONTEXT_KEY).await? {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };

        let resource_properties = match self.ctx.store().get(RESOURCE_PROPERTIES_KEY).await? {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };

        Ok(Some(PersistedResourceState {
            resource_id,
            resource_context,
            resource_properties,
        }))
    }

    /// Record the droplet id alone
    ///
    /// Done at provider acceptance, before the creation action settles, so a
    /// re-invoked create resumes this droplet instead of provisioning a
    /// second one.
    pub async fn bind_resource_id(&self, id: ServerId) -> Result<()> {
        tracing::info!("using resource {}", id);
        self.ctx
            .store()
            .set(RESOURCE_ID_KEY, serde_json::to_value(id)?)
            .await
    }

    /// Commit the full record: id, ownership context and property snapshot
    ///
    /// Overwrites any previous snapshot. Atomicity across the three keys is
    /// the runtime store's concern.
    pub async fn commit(
        &self,
        handle: &ServerHandle,
        context: &OwnershipContext,
        properties: &ResourceProperties,
    ) -> Result<()> {
        tracing::debug!("committing resource state for droplet {}", handle.id);

        let store = self.ctx.store();
        store
            .set(RESOURCE_ID_KEY, serde_json::to_value(handle.id)?)
            .await?;
        store
            .set(RESOURCE_CONTEXT_KEY, serde_json::to_value(context)?)
            .await?;
        store
            .set(RESOURCE_PROPERTIES_KEY, serde_json::to_value(properties)?)
            .await?;

        Ok(())
    }
}
