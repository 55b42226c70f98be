//! Test doubles and common utilities for behavior contract tests
//!
//! The mock provider tracks every call with atomic counters and serves a
//! scripted sequence of action statuses, so tests can assert exactly which
//! provider calls an operation issued and what the host scheduler was told.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use droplet_core::error::{Error, Result};
use droplet_core::state::MemoryRuntimeStore;
use droplet_core::traits::{
    ActionStatus, ComputeProvider, RuntimeContext, ServerHandle, ServerId, ServerSpec,
    ServerStatus, WorkflowIdentity,
};

/// A mock ComputeProvider with scripted actions and call counters
pub struct MockComputeProvider {
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    action_calls: AtomicUsize,
    power_on_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    destroy_calls: AtomicUsize,

    /// Droplets the provider currently lists
    servers: Mutex<Vec<ServerHandle>>,
    /// Scripted latest-action statuses, consumed one per poll; an empty
    /// script reports "no action on record"
    actions: Mutex<VecDeque<ActionStatus>>,
    /// Whether destroy removes the droplet from the listing
    destroy_removes_server: AtomicBool,
    /// When set, create_server fails with ProviderRejected
    reject_create: Mutex<Option<String>>,
    /// Ids handed to created droplets
    next_id: AtomicI64,
}

impl MockComputeProvider {
    pub fn new() -> Self {
        Self {
            create_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            action_calls: AtomicUsize::new(0),
            power_on_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            servers: Mutex::new(Vec::new()),
            actions: Mutex::new(VecDeque::new()),
            destroy_removes_server: AtomicBool::new(true),
            reject_create: Mutex::new(None),
            next_id: AtomicI64::new(1001),
        }
    }

    /// Pre-populate the listing with a droplet
    pub fn with_server(self, server: ServerHandle) -> Self {
        self.servers.lock().unwrap().push(server);
        self
    }

    /// Queue a latest-action status for the next poll
    pub fn script_action(&self, status: ActionStatus) {
        self.actions.lock().unwrap().push_back(status);
    }

    /// Make destroy leave the droplet in the listing (the provider accepted
    /// the action but it is not yet effective)
    pub fn keep_servers_on_destroy(&self) {
        self.destroy_removes_server.store(false, Ordering::SeqCst);
    }

    /// Make create_server fail with the given message
    pub fn reject_create(&self, message: impl Into<String>) {
        *self.reject_create.lock().unwrap() = Some(message.into());
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn action_calls(&self) -> usize {
        self.action_calls.load(Ordering::SeqCst)
    }

    pub fn power_on_calls(&self) -> usize {
        self.power_on_calls.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeProvider for MockComputeProvider {
    async fn create_server(&self, spec: &ServerSpec) -> Result<ServerHandle> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.reject_create.lock().unwrap().clone() {
            return Err(Error::provider_rejected(message));
        }

        let id = ServerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let handle = ServerHandle {
            id,
            name: spec.name.clone(),
            region: spec.region.clone(),
            image: spec.image.clone(),
            size_slug: spec.size_slug.clone(),
            status: ServerStatus::New,
            backups: spec.backups,
            disk: 20,
            memory: 512,
            vcpus: 1,
            ssh_keys: spec.ssh_keys.clone(),
            tags: Vec::new(),
            created_at: None,
        };
        self.servers.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    async fn list_servers(&self) -> Result<Vec<ServerHandle>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.servers.lock().unwrap().clone())
    }

    async fn latest_action(&self, _id: ServerId) -> Result<Option<ActionStatus>> {
        self.action_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.actions.lock().unwrap().pop_front())
    }

    async fn power_on(&self, _id: ServerId) -> Result<()> {
        self.power_on_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self, _id: ServerId) -> Result<()> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self, id: ServerId) -> Result<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if self.destroy_removes_server.load(Ordering::SeqCst) {
            self.servers.lock().unwrap().retain(|s| s.id != id);
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A droplet handle with the given id and status
pub fn sample_server(id: i64, status: ServerStatus) -> ServerHandle {
    ServerHandle {
        id: ServerId(id),
        name: "web-01".to_string(),
        region: "nyc3".to_string(),
        image: "ubuntu-14-04-x64".to_string(),
        size_slug: "512mb".to_string(),
        status,
        backups: true,
        disk: 20,
        memory: 512,
        vcpus: 1,
        ssh_keys: Vec::new(),
        tags: Vec::new(),
        created_at: None,
    }
}

/// Workflow identity used by all contract tests
pub fn test_identity() -> WorkflowIdentity {
    WorkflowIdentity {
        instance_id: "web_server_abc123".to_string(),
        node_id: "web_server".to_string(),
        deployment_id: "staging-deployment".to_string(),
        blueprint_id: "web-blueprint".to_string(),
    }
}

/// A runtime context over a shared memory store
///
/// The returned store handle shares state with the context, so tests can
/// inspect what an operation persisted.
pub fn test_context() -> (MemoryRuntimeStore, RuntimeContext) {
    let store = MemoryRuntimeStore::new();
    let ctx = RuntimeContext::new(Box::new(store.clone()), test_identity());
    (store, ctx)
}

/// Record a resource id as if an earlier invocation had bound it
pub async fn seed_resource_id(ctx: &RuntimeContext, id: i64) {
    droplet_core::StateRecorder::new(ctx)
        .bind_resource_id(ServerId(id))
        .await
        .expect("seeding resource id succeeds");
}
