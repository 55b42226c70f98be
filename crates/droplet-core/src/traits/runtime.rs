// # Runtime Store Trait
//
// Defines the interface to the orchestration engine's per-instance runtime
// store, the durable record a lifecycle operation reads and writes across
// invocations.
//
// ## Purpose
//
// The runtime store is what makes operations re-invocable: after a partial
// failure or an orchestrator restart, the next invocation reads the store to
// recognize the droplet it already manages instead of creating a duplicate.
//
// ## Implementations
//
// - Memory-backed: `MemoryRuntimeStore` (tests, embedding)
// - File-backed: `FileRuntimeStore` (crash recovery via atomic writes)
// - The real orchestration engine supplies its own store when embedding
//
// ## Guarantees required of implementations
//
// - Single-key writes are atomic: a reader never observes a torn value
// - Async I/O only, no blocking calls
// - Thread-safe; methods may be called from any task
//
// Cross-key transactions are NOT required; the reconciler does not assume
// them. Exclusive access per instance for the duration of one operation is a
// caller obligation, not something the store enforces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trait for per-instance runtime store implementations
///
/// Keys are plain strings scoped to one orchestration instance; values are
/// arbitrary JSON.
#[async_trait]
pub trait RuntimeStore: Send + Sync {
    /// Get the value stored under `key`
    ///
    /// Returns `Ok(None)` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<Value>, crate::Error>;

    /// Atomically set the value stored under `key`
    async fn set(&self, key: &str, value: Value) -> Result<(), crate::Error>;

    /// Remove the value stored under `key` (absent keys are not an error)
    async fn remove(&self, key: &str) -> Result<(), crate::Error>;
}

/// Orchestration identities that caused a resource to exist
///
/// Supplied by the engine when it dispatches an operation; recorded into the
/// ownership context at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowIdentity {
    /// Node instance id
    pub instance_id: String,
    /// Node id
    pub node_id: String,
    /// Deployment id
    pub deployment_id: String,
    /// Blueprint id
    pub blueprint_id: String,
}

/// Everything an operation receives from the host: the per-instance store
/// plus the workflow identities
///
/// Passed explicitly into each operation; there is no process-wide context
/// singleton. Retry and abort are expressed through the operation's
/// [`crate::Outcome`] return value, so the context carries no control-flow
/// primitives.
pub struct RuntimeContext {
    store: Box<dyn RuntimeStore>,
    identity: WorkflowIdentity,
}

impl RuntimeContext {
    /// Create a context from a store and the dispatching workflow's identity
    pub fn new(store: Box<dyn RuntimeStore>, identity: WorkflowIdentity) -> Self {
        Self { store, identity }
    }

    /// The per-instance runtime store
    pub fn store(&self) -> &dyn RuntimeStore {
        self.store.as_ref()
    }

    /// The workflow identities this operation runs under
    pub fn identity(&self) -> &WorkflowIdentity {
        &self.identity
    }
}
