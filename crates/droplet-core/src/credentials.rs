//! Credential resolution for provider API access
//!
//! A credential is an opaque bearer token scoped to one provider name. It is
//! resolved once per operation invocation and never cached across
//! invocations.
//!
//! ## Resolution order
//!
//! 1. An explicit token supplied by the caller wins outright.
//! 2. Otherwise the search paths are scanned in order. Each is a YAML file
//!    mapping provider names to credential blocks:
//!
//!    ```yaml
//!    digitalocean:
//!      token: mylongtoken
//!
//!    aws:
//!      aws_secret_key: mysecretkey
//!      aws_secret_key_id: mysecretkeyid
//!    ```
//!
//!    The first path that parses and yields a non-empty `token` under the
//!    provider key wins.
//! 3. If nothing matches, resolution fails naming every path searched.
//!
//! A file that exists but does not parse aborts the whole scan: a malformed
//! credentials file is an operator error, not a "try elsewhere" condition. A
//! file that parses but lacks the provider key, or maps it to an empty
//! token, is simply "not found here" and the scan continues.

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// An opaque bearer token scoped to one provider
///
/// The token never appears in `Debug` output; keep it out of logs.
#[derive(Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The raw token, for the provider's Authorization header only
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Default credential file locations, in search order
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("droplet-ops").join("credentials.yaml"));
    }
    paths.push(PathBuf::from("/etc/droplet-ops/credentials.yaml"));
    paths
}

/// Resolve a credential for `provider`
///
/// `explicit` is the caller-supplied token from the operation inputs; an
/// empty string counts as not supplied. `search_paths` are consulted in
/// order only when no explicit token is given.
pub fn resolve(
    provider: &str,
    explicit: Option<&str>,
    search_paths: &[PathBuf],
) -> Result<Credential> {
    if let Some(token) = explicit {
        if !token.is_empty() {
            tracing::debug!("using explicitly supplied credentials for {}", provider);
            return Ok(Credential::new(token));
        }
        tracing::debug!("explicit token for {} is empty, falling back to files", provider);
    }

    for path in search_paths {
        if !path.is_file() {
            tracing::debug!("credentials file {} does not exist", path.display());
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::CredentialsUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| Error::CredentialsMalformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        match token_for_provider(&parsed, provider) {
            Some(token) => {
                tracing::info!(
                    "credentials for {} found under {}",
                    provider,
                    path.display()
                );
                return Ok(Credential::new(token));
            }
            None => {
                tracing::debug!(
                    "credentials for {} were not found under {}",
                    provider,
                    path.display()
                );
            }
        }
    }

    Err(Error::CredentialsNotFound {
        provider: provider.to_string(),
        searched: search_paths.to_vec(),
    })
}

/// Extract a non-empty `token` from the provider's credential block, if any
fn token_for_provider(parsed: &serde_yaml::Value, provider: &str) -> Option<String> {
    let token = parsed.get(provider)?.get("token")?.as_str()?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
