// # DigitalOcean Compute Provider
//
// ComputeProvider implementation over the DigitalOcean API v2.
//
// ## Scope
//
// - One HTTP request per trait call (list pagination being the exception)
// - Full error propagation to the reconciler; no retry, backoff or caching
//   here, since coordination is owned by the reconciler and the host scheduler
// - HTTP timeout of 30 seconds on every request
// - The API token never appears in logs or `Debug` output
//
// ## API Reference
//
// - <https://docs.digitalocean.com/reference/api/>
// - Create droplet: POST `/droplets`
// - List droplets: GET `/droplets?per_page=N` (paginated via `links.pages`)
// - Droplet actions: GET `/droplets/:id/actions`, POST `/droplets/:id/actions`
// - Destroy droplet: DELETE `/droplets/:id`

pub mod models;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use droplet_core::credentials::Credential;
use droplet_core::error::{Error, Result};
use droplet_core::traits::{ActionStatus, ComputeProvider, ServerHandle, ServerId, ServerSpec};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::models::{
    ActionListResponse, ActionResponse, CreateDropletRequest, Droplet, DropletListResponse,
    DropletResponse, ImageIdentifier, PowerActionRequest, parse_action_status,
    parse_server_status,
};

/// Provider name, used for logging and credential scoping
pub const PROVIDER_NAME: &str = "digitalocean";

/// Base URL for the DigitalOcean API
const API_BASE_URL: &str = "https://api.digitalocean.com/v2";

/// Timeout applied to every API request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for droplet listings
const LIST_PAGE_SIZE: u32 = 200;

/// DigitalOcean provider
///
/// Holds the API token for exactly one operation invocation; nothing is
/// cached across invocations.
pub struct DigitalOceanProvider {
    /// HTTP client
    client: Client,
    /// API token; never log this value
    api_token: String,
}

impl fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl DigitalOceanProvider {
    /// Create a provider from a resolved credential
    pub fn new(credential: &Credential) -> Result<Self> {
        if credential.token().is_empty() {
            return Err(Error::config("DigitalOcean API token cannot be empty"));
        }

        let client = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_token: credential.token().to_string(),
        })
    }

    /// Authenticated GET against an absolute URL (pagination follows these)
    async fn get_url<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("GET {} failed: {}", url, e)))?;

        Self::handle_response(response).await
    }

    /// Authenticated GET against an API path
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_url(&format!("{API_BASE_URL}{path}")).await
    }

    /// Authenticated POST against an API path
    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{API_BASE_URL}{path}");
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("POST {} failed: {}", url, e)))?;

        Self::handle_response(response).await
    }

    /// Authenticated DELETE against an API path
    ///
    /// 404 counts as success: the resource is already gone.
    async fn delete(&self, path: &str) -> Result<()> {
        let url = format!("{API_BASE_URL}{path}");
        debug!(url = %url, "DELETE request");

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("DELETE {} failed: {}", url, e)))?;

        let status = response.status();
        if status.is_success()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_FOUND
        {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(map_api_error(status, &text))
        }
    }

    /// Parse a JSON response or map the error status
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("failed to read response body: {}", e)))?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, "failed to parse API response");
                Error::Json(e)
            })
        } else {
            Err(map_api_error(status, &text))
        }
    }

    /// Convert an API droplet to the core handle type
    fn to_handle(droplet: &Droplet) -> ServerHandle {
        ServerHandle {
            id: ServerId(droplet.id),
            name: droplet.name.clone(),
            region: droplet.region.slug.clone(),
            image: droplet.image.identifier(),
            size_slug: droplet.size_slug.clone(),
            status: parse_server_status(&droplet.status),
            backups: droplet.backups_enabled(),
            disk: droplet.disk,
            memory: droplet.memory,
            vcpus: droplet.vcpus,
            ssh_keys: Vec::new(),
            tags: droplet.tags.clone(),
            created_at: chrono::DateTime::parse_from_rfc3339(&droplet.created_at)
                .ok()
                .map(|dt| dt.with_timezone(&chrono::Utc)),
        }
    }
}

/// Map an API error status to the core error taxonomy
fn map_api_error(status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::provider_rejected(format!(
            "authentication failed: invalid API token or insufficient permissions ({})",
            status
        )),
        404 => Error::provider_rejected(format!("not found ({}): {}", status, body)),
        422 => Error::provider_rejected(format!("unprocessable request: {}", body)),
        429 => Error::provider_rejected(format!("rate limit exceeded ({})", status)),
        500..=599 => {
            Error::provider_rejected(format!("server error (transient) {}: {}", status, body))
        }
        _ => Error::provider_rejected(format!("request failed {}: {}", status, body)),
    }
}

#[async_trait]
impl ComputeProvider for DigitalOceanProvider {
    async fn create_server(&self, spec: &ServerSpec) -> Result<ServerHandle> {
        info!(
            name = %spec.name,
            region = %spec.region,
            size = %spec.size_slug,
            "creating droplet"
        );

        let body = CreateDropletRequest {
            name: spec.name.clone(),
            region: spec.region.clone(),
            size: spec.size_slug.clone(),
            image: ImageIdentifier::Slug(spec.image.clone()),
            backups: spec.backups,
            ssh_keys: spec.ssh_keys.clone(),
        };

        let response: DropletResponse = self.post("/droplets", &body).await?;
        info!(droplet_id = response.droplet.id, "droplet create accepted");

        // The API does not echo key associations; carry the requested keys
        // onto the handle.
        let mut handle = Self::to_handle(&response.droplet);
        handle.ssh_keys = spec.ssh_keys.clone();
        Ok(handle)
    }

    async fn list_servers(&self) -> Result<Vec<ServerHandle>> {
        let mut servers = Vec::new();
        let mut url = format!("{API_BASE_URL}/droplets?per_page={LIST_PAGE_SIZE}");

        loop {
            let page: DropletListResponse = self.get_url(&url).await?;
            servers.extend(page.droplets.iter().map(Self::to_handle));

            match page.links.and_then(|l| l.pages).and_then(|p| p.next) {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(count = servers.len(), "listed droplets");
        Ok(servers)
    }

    async fn latest_action(&self, id: ServerId) -> Result<Option<ActionStatus>> {
        // The listing is most-recent-first; one entry is all we consult.
        let result: Result<ActionListResponse> =
            self.get(&format!("/droplets/{}/actions?per_page=1", id)).await;

        match result {
            Ok(response) => Ok(response
                .actions
                .first()
                .map(|action| parse_action_status(&action.status))),
            // A destroyed droplet's actions endpoint disappears with it;
            // report "nothing in flight" and let the caller re-list.
            Err(Error::ProviderRejected(msg)) if msg.starts_with("not found") => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn power_on(&self, id: ServerId) -> Result<()> {
        info!(droplet_id = %id, "powering droplet on");
        let _: ActionResponse = self
            .post(
                &format!("/droplets/{}/actions", id),
                &PowerActionRequest {
                    action_type: "power_on".to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn shutdown(&self, id: ServerId) -> Result<()> {
        info!(droplet_id = %id, "shutting droplet down");
        let _: ActionResponse = self
            .post(
                &format!("/droplets/{}/actions", id),
                &PowerActionRequest {
                    action_type: "shutdown".to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn destroy(&self, id: ServerId) -> Result<()> {
        info!(droplet_id = %id, "destroying droplet");
        self.delete(&format!("/droplets/{}", id)).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
