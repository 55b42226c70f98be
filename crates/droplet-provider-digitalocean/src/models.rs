//! DigitalOcean API request and response models
//!
//! API Documentation: <https://docs.digitalocean.com/reference/api/>

use droplet_core::{ActionStatus, ServerStatus};
use serde::{Deserialize, Serialize};

// ============================================================================
// Droplet types
// ============================================================================

/// Droplet (instance) from the API
#[derive(Debug, Clone, Deserialize)]
pub struct Droplet {
    /// Droplet id
    pub id: i64,
    /// Droplet name
    pub name: String,
    /// Memory in MB
    pub memory: i64,
    /// vCPU count
    pub vcpus: i32,
    /// Disk size in GB
    pub disk: i64,
    /// Status: "new", "active", "off", "archive"
    pub status: String,
    /// Region info
    pub region: Region,
    /// Size (plan) slug
    pub size_slug: String,
    /// Image info
    pub image: Image,
    /// Enabled features (contains "backups" when backups are on)
    #[serde(default)]
    pub features: Vec<String>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Created at (RFC 3339)
    pub created_at: String,
}

impl Droplet {
    /// Whether automated backups are enabled
    pub fn backups_enabled(&self) -> bool {
        self.features.iter().any(|f| f == "backups")
    }
}

/// Single droplet response
#[derive(Debug, Deserialize)]
pub struct DropletResponse {
    /// Droplet details
    pub droplet: Droplet,
}

/// Droplet list response
#[derive(Debug, Deserialize)]
pub struct DropletListResponse {
    /// One page of droplets
    pub droplets: Vec<Droplet>,
    /// Links for pagination
    pub links: Option<Links>,
}

/// Region information
#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    /// Region slug
    pub slug: String,
    /// Region name
    pub name: String,
}

/// Image information
#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    /// Image id
    pub id: i64,
    /// Image name
    pub name: String,
    /// Image slug (absent for snapshots and retired images)
    pub slug: Option<String>,
    /// Distribution
    pub distribution: String,
}

impl Image {
    /// Slug when available, otherwise the name
    pub fn identifier(&self) -> String {
        self.slug.clone().unwrap_or_else(|| self.name.clone())
    }
}

/// Pagination links
#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    /// Pages
    pub pages: Option<Pages>,
}

/// Page links
#[derive(Debug, Clone, Deserialize)]
pub struct Pages {
    /// First page
    pub first: Option<String>,
    /// Previous page
    pub prev: Option<String>,
    /// Next page
    pub next: Option<String>,
    /// Last page
    pub last: Option<String>,
}

// ============================================================================
// Create Droplet types
// ============================================================================

/// Request body for creating a droplet
#[derive(Debug, Serialize)]
pub struct CreateDropletRequest {
    /// Droplet name
    pub name: String,
    /// Region slug
    pub region: String,
    /// Size (plan) slug
    pub size: String,
    /// Image slug or id
    pub image: ImageIdentifier,
    /// Whether automated backups are enabled
    pub backups: bool,
    /// SSH key ids or fingerprints
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<String>,
}

/// Image identifier (slug or numeric id)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageIdentifier {
    /// Image slug
    Slug(String),
    /// Image id
    Id(i64),
}

// ============================================================================
// Action types
// ============================================================================

/// Droplet action
#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    /// Action id
    pub id: i64,
    /// Action status: "in-progress", "completed", "errored"
    pub status: String,
    /// Action type
    #[serde(rename = "type")]
    pub action_type: String,
    /// Started at
    pub started_at: Option<String>,
    /// Completed at
    pub completed_at: Option<String>,
}

/// Single action response
#[derive(Debug, Deserialize)]
pub struct ActionResponse {
    /// Action details
    pub action: Action,
}

/// Action list response
#[derive(Debug, Deserialize)]
pub struct ActionListResponse {
    /// Actions, most recent first
    pub actions: Vec<Action>,
    /// Links for pagination
    pub links: Option<Links>,
}

/// Power action request
#[derive(Debug, Serialize)]
pub struct PowerActionRequest {
    /// Action type: `power_on`, `shutdown`, `power_off`
    #[serde(rename = "type")]
    pub action_type: String,
}

// ============================================================================
// Wire string mappings
// ============================================================================

/// Map the API's action status string
///
/// Unrecognized statuses are treated as still in progress; the host
/// scheduler's retry budget bounds how long that can go on.
pub fn parse_action_status(status: &str) -> ActionStatus {
    match status {
        "in-progress" => ActionStatus::Pending,
        "completed" => ActionStatus::Completed,
        "errored" => ActionStatus::Errored,
        other => {
            tracing::warn!("unrecognized action status {:?}, treating as in progress", other);
            ActionStatus::Pending
        }
    }
}

/// Map the API's droplet status string
pub fn parse_server_status(status: &str) -> ServerStatus {
    match status {
        "new" => ServerStatus::New,
        "active" => ServerStatus::Active,
        "off" => ServerStatus::Off,
        "archive" => ServerStatus::Archive,
        _ => ServerStatus::Unknown,
    }
}
