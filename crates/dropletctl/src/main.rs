// # dropletctl - Droplet Lifecycle Harness
//
// Runs exactly one lifecycle operation per process and maps the outcome to
// an exit code, so any scheduler that can re-run a command on a delay can
// drive the reconciliation loop.
//
// This is a THIN integration layer only:
// - No lifecycle logic, retry logic or state handling here
// - All reconciliation logic lives in droplet-core
// - Configuration is via environment variables only
//
// ## Configuration
//
// ### Operation
// - `DROPLET_OPERATION`: Lifecycle operation (create, start, stop, delete)
//
// ### Credentials
// - `DROPLET_TOKEN`: Explicit API token (optional; wins over files)
// - `DROPLET_CREDENTIALS_PATHS`: Colon-separated credential file paths
//   (optional; defaults to the standard search paths)
//
// ### Create inputs
// - `DROPLET_NAME`: Droplet name (optional; fixed placeholder if absent)
// - `DROPLET_REGION`: Region slug (required for create)
// - `DROPLET_IMAGE`: Image slug (required for create)
// - `DROPLET_SIZE`: Size slug (required for create)
// - `DROPLET_BACKUPS`: Enable automated backups (optional; default true)
// - `DROPLET_SSH_KEYS`: Comma-separated SSH key ids (optional)
//
// ### Runtime state
// - `DROPLET_STATE_PATH`: Path to the per-instance state file (required)
//
// ### Workflow identity
// - `DROPLET_INSTANCE_ID`, `DROPLET_NODE_ID`, `DROPLET_DEPLOYMENT_ID`,
//   `DROPLET_BLUEPRINT_ID`: Orchestration identities (optional; "local")
//
// ### Logging
// - `DROPLET_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Exit codes
//
// - 0: operation finished successfully
// - 1: configuration error
// - 2: operation failed terminally
// - 3: not settled yet; re-run after the delay printed on stdout
//
// ## Example
//
// ```bash
// export DROPLET_OPERATION=create
// export DROPLET_REGION=nyc3
// export DROPLET_IMAGE=ubuntu-14-04-x64
// export DROPLET_SIZE=512mb
// export DROPLET_STATE_PATH=/var/lib/droplet-ops/web_server_1.json
//
// dropletctl
// ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use droplet_core::{
    CreateRequest, DropletReconciler, FileRuntimeStore, Outcome, RuntimeContext,
    WorkflowIdentity,
};
use droplet_provider_digitalocean::{DigitalOceanProvider, PROVIDER_NAME};

/// Exit codes for the scheduler driving this harness
#[derive(Debug, Clone, Copy)]
enum HarnessExitCode {
    /// Operation finished successfully
    Success = 0,
    /// Configuration error
    ConfigError = 1,
    /// Operation failed terminally
    OperationFailed = 2,
    /// Provider has not settled; re-run after the printed delay
    RetryLater = 3,
}

impl From<HarnessExitCode> for ExitCode {
    fn from(code: HarnessExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    operation: String,
    token: Option<String>,
    credentials_paths: Vec<PathBuf>,
    name: Option<String>,
    region: Option<String>,
    image: Option<String>,
    size: Option<String>,
    backups: bool,
    ssh_keys: Vec<String>,
    state_path: String,
    identity: WorkflowIdentity,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let credentials_paths = match env::var("DROPLET_CREDENTIALS_PATHS") {
            Ok(joined) => joined
                .split(':')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
            Err(_) => droplet_core::default_search_paths(),
        };

        Ok(Self {
            operation: env::var("DROPLET_OPERATION").unwrap_or_default(),
            token: env::var("DROPLET_TOKEN").ok(),
            credentials_paths,
            name: env::var("DROPLET_NAME").ok(),
            region: env::var("DROPLET_REGION").ok(),
            image: env::var("DROPLET_IMAGE").ok(),
            size: env::var("DROPLET_SIZE").ok(),
            backups: env::var("DROPLET_BACKUPS")
                .ok()
                .map(|s| s.trim().eq_ignore_ascii_case("true") || s.trim() == "1")
                .unwrap_or(true),
            ssh_keys: env::var("DROPLET_SSH_KEYS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            state_path: env::var("DROPLET_STATE_PATH").unwrap_or_default(),
            identity: WorkflowIdentity {
                instance_id: env::var("DROPLET_INSTANCE_ID")
                    .unwrap_or_else(|_| "local".to_string()),
                node_id: env::var("DROPLET_NODE_ID").unwrap_or_else(|_| "local".to_string()),
                deployment_id: env::var("DROPLET_DEPLOYMENT_ID")
                    .unwrap_or_else(|_| "local".to_string()),
                blueprint_id: env::var("DROPLET_BLUEPRINT_ID")
                    .unwrap_or_else(|_| "local".to_string()),
            },
            log_level: env::var("DROPLET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.operation.as_str() {
            "create" | "start" | "stop" | "delete" => {}
            "" => anyhow::bail!(
                "DROPLET_OPERATION is required. \
                Set it via: export DROPLET_OPERATION=create"
            ),
            other => anyhow::bail!(
                "DROPLET_OPERATION '{}' is not supported. \
                Supported operations: create, start, stop, delete",
                other
            ),
        }

        if self.operation == "create" {
            for (var, value) in [
                ("DROPLET_REGION", &self.region),
                ("DROPLET_IMAGE", &self.image),
                ("DROPLET_SIZE", &self.size),
            ] {
                if value.as_ref().is_none_or(|v| v.is_empty()) {
                    anyhow::bail!("{} is required when DROPLET_OPERATION=create", var);
                }
            }
        }

        if self.state_path.is_empty() {
            anyhow::bail!(
                "DROPLET_STATE_PATH is required. \
                Set it via: export DROPLET_STATE_PATH=/var/lib/droplet-ops/state.json"
            );
        }

        if self.credentials_paths.is_empty() && self.token.as_ref().is_none_or(|t| t.is_empty()) {
            anyhow::bail!(
                "No credential source configured. \
                Set DROPLET_TOKEN or DROPLET_CREDENTIALS_PATHS"
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "DROPLET_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return HarnessExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return HarnessExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HarnessExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return HarnessExitCode::OperationFailed.into();
        }
    };

    rt.block_on(async {
        match run_operation(&config).await {
            Ok(outcome) => report(&config.operation, outcome),
            Err(e) => {
                error!("{} failed: {:#}", config.operation, e);
                HarnessExitCode::OperationFailed
            }
        }
    })
    .into()
}

/// Run one lifecycle operation end to end
///
/// Credentials and the HTTP client are built fresh here on every run; the
/// state file is the only thing that carries over between invocations.
async fn run_operation(config: &Config) -> Result<Outcome> {
    info!("running {} operation", config.operation);

    let store = FileRuntimeStore::new(&config.state_path).await?;
    let ctx = RuntimeContext::new(Box::new(store), config.identity.clone());

    let credential = droplet_core::resolve(
        PROVIDER_NAME,
        config.token.as_deref(),
        &config.credentials_paths,
    )?;
    let provider = DigitalOceanProvider::new(&credential)?;

    let reconciler = DropletReconciler::new(&provider, &ctx);

    let outcome = match config.operation.as_str() {
        "create" => {
            // Presence validated up front
            let mut request = CreateRequest::new(
                config.region.clone().unwrap_or_default(),
                config.image.clone().unwrap_or_default(),
                config.size.clone().unwrap_or_default(),
            )
            .with_backups(config.backups)
            .with_ssh_keys(config.ssh_keys.clone());
            if let Some(name) = &config.name {
                request = request.with_name(name.clone());
            }
            reconciler.create(&request).await
        }
        "start" => reconciler.start().await,
        "stop" => reconciler.stop().await,
        "delete" => reconciler.delete().await,
        other => anyhow::bail!("unsupported operation: {}", other),
    };

    Ok(outcome)
}

/// Map an outcome to logs and an exit code
fn report(operation: &str, outcome: Outcome) -> HarnessExitCode {
    match outcome {
        Outcome::Success(state) => {
            info!(
                resource_id = %state.resource_id,
                "{} finished successfully",
                operation
            );
            HarnessExitCode::Success
        }
        Outcome::RetryAfter { delay, reason } => {
            warn!("{} not settled: {}", operation, reason);
            // Machine-readable hint for the scheduler driving this harness
            println!("retry-after: {}", delay.as_secs());
            HarnessExitCode::RetryLater
        }
        Outcome::Failure(err) => {
            error!("{} failed: {}", operation, err);
            HarnessExitCode::OperationFailed
        }
    }
}
