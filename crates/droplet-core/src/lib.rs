// # droplet-core
//
// Core library for droplet lifecycle reconciliation.
//
// ## Architecture Overview
//
// One lifecycle operation (create/start/stop/delete) reconciles a declared
// droplet against the provider's actual state:
//
// - **ComputeProvider**: trait for the cloud provider API calls
// - **RuntimeStore / RuntimeContext**: trait for the orchestration engine's
//   per-instance runtime record, plus the workflow identities
// - **credentials**: layered token resolution (explicit, then YAML files)
// - **ActionPoller**: single-shot confirmation of the provider's most recent
//   asynchronous action
// - **DropletReconciler**: the create/start/stop/delete state machine
// - **StateRecorder**: the persisted resource id/context/properties record
// - **Outcome**: explicit success/retry/failure result the host branches on
//
// ## Design Principles
//
// 1. **Host-scheduled retry**: a pending provider action yields control with
//    a fixed backoff hint; nothing sleeps or loops in-process
// 2. **Re-invocation safety**: persisted state lets a re-dispatched
//    operation continue managing the same droplet instead of duplicating it
// 3. **Explicit dependencies**: the runtime context is passed into each
//    operation; there is no process-wide singleton
// 4. **Stateless connections**: credentials and HTTP clients are rebuilt
//    every invocation, trading efficiency for restart safety

pub mod credentials;
pub mod error;
pub mod outcome;
pub mod poller;
pub mod reconciler;
pub mod recorder;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use credentials::{Credential, default_search_paths, resolve};
pub use error::{Error, Result};
pub use outcome::Outcome;
pub use poller::{ACTION_RETRY_DELAY, ActionPoller, Poll};
pub use reconciler::{CreateRequest, DEFAULT_SERVER_NAME, DropletReconciler};
pub use recorder::{
    OwnershipContext, PersistedResourceState, ResourceProperties, StateRecorder,
};
pub use state::{FileRuntimeStore, MemoryRuntimeStore};
pub use traits::{
    ActionStatus, ComputeProvider, RuntimeContext, RuntimeStore, ServerHandle, ServerId,
    ServerSpec, ServerStatus, WorkflowIdentity,
};
