//! Error types for droplet lifecycle operations
//!
//! Every variant here is terminal for the current workflow run: retryable
//! "not done yet" conditions are not errors and are signalled through
//! [`crate::Outcome::RetryAfter`] instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::traits::ServerId;

/// Result type alias for droplet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for droplet lifecycle operations
#[derive(Error, Debug)]
pub enum Error {
    /// No credential resolvable for the provider; the operator must supply one
    #[error(
        "could not resolve credentials for {}; supply a token explicitly \
         or place one under: {}", .provider, join_paths(.searched)
    )]
    CredentialsNotFound {
        /// Provider the credentials were requested for
        provider: String,
        /// Every path the resolver looked at, in order
        searched: Vec<PathBuf>,
    },

    /// A credentials file exists but cannot be parsed; an operator error,
    /// not a "try the next path" condition
    #[error("credentials file {} is not valid YAML: {}", .path.display(), .reason)]
    CredentialsMalformed {
        /// Offending file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A credentials file exists but cannot be read
    #[error("credentials file {} is not accessible: {}", .path.display(), .reason)]
    CredentialsUnreadable {
        /// Offending file
        path: PathBuf,
        /// I/O message
        reason: String,
    },

    /// The provider call itself failed (bad parameters, quota, auth)
    #[error("provider rejected the request: {0}")]
    ProviderRejected(String),

    /// The provider reports the action failed server-side
    #[error("provider action failed: {0}")]
    ActionErrored(String),

    /// An expected resource id is absent from the provider's listing;
    /// the resource vanished out-of-band and is never recreated implicitly
    #[error("droplet {0} is not present in the provider listing")]
    ResourceNotFound(ServerId),

    /// Destroy was accepted but the resource is still listed afterwards;
    /// surfaced for manual intervention
    #[error("destroy was accepted but droplet {0} is still listed")]
    DeletionNotConfirmed(ServerId),

    /// A create was invoked while a fully provisioned droplet is already
    /// recorded for this instance
    #[error("droplet {0} is already provisioned for this instance")]
    AlreadyProvisioned(ServerId),

    /// start/stop/delete invoked before any resource id was recorded
    #[error("no resource id recorded; cannot {0} a droplet that was never created")]
    MissingResourceId(&'static str),

    /// Runtime store failures (read, write, corruption)
    #[error("runtime store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport errors from the provider API
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider rejection error
    pub fn provider_rejected(msg: impl Into<String>) -> Self {
        Self::ProviderRejected(msg.into())
    }

    /// Create a server-side action failure error
    pub fn action_errored(msg: impl Into<String>) -> Self {
        Self::ActionErrored(msg.into())
    }

    /// Create a runtime store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
