//! Configuration loading, validation, and management for learnflow.
//!
//! Loads configuration from `~/.learnflow/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.learnflow/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tag identifying our items at the presentation layer
    #[serde(default = "default_service_tag")]
    pub service_tag: String,

    /// Log output format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Content addressing and graph vocabulary
    #[serde(default)]
    pub content: ContentConfig,

    /// Secondary-activity seeding
    #[serde(default)]
    pub secondary: SecondaryConfig,

    /// The assessment item appended to every list
    #[serde(default)]
    pub assessment: AssessmentConfig,

    /// Optional item pushed to every known session on demand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<FixedItemConfig>,

    /// Launch action addresses
    #[serde(default)]
    pub actions: ActionConfig,

    /// Collaborator endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Liveness heartbeat
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

fn default_service_tag() -> String {
    "lbd".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_true() -> bool {
    true
}

/// How the "machines in workplace groups" stage queries the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachinesLookup {
    /// Reuse the stations query on the same groups (observed behavior)
    #[default]
    SameAsStations,
    /// Query devices typed as machines
    MachineRelation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Prefix marking native knowledge-graph objects
    #[serde(default = "default_ontology_namespace")]
    pub ontology_namespace: String,

    /// Scheme prefix of static document identifiers
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Path static documents are served from
    #[serde(default = "default_external_content_root")]
    pub external_content_root: String,

    /// Thumbnail directory below the content root
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,

    /// Preview used when a result row carries none
    #[serde(default = "default_preview")]
    pub default_preview: String,

    /// Language tag for label lookups
    #[serde(default = "default_label_locale")]
    pub label_locale: String,

    /// Operating-state class the state query is scoped to
    #[serde(default = "default_functional_state")]
    pub functional_state: String,

    #[serde(default)]
    pub machines_lookup: MachinesLookup,
}

fn default_ontology_namespace() -> String {
    "http://www.appsist.de/ontology/".into()
}
fn default_static_prefix() -> String {
    "file:///static/".into()
}
fn default_external_content_root() -> String {
    "/services/cds/static/externalContent/".into()
}
fn default_thumbnail_dir() -> String {
    "thumbnails/".into()
}
fn default_preview() -> String {
    "defaultLIPreview.jpg".into()
}
fn default_label_locale() -> String {
    "de".into()
}
fn default_functional_state() -> String {
    "http://www.appsist.de/ontology/FunkionsfaehigerZustand".into()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            ontology_namespace: default_ontology_namespace(),
            static_prefix: default_static_prefix(),
            external_content_root: default_external_content_root(),
            thumbnail_dir: default_thumbnail_dir(),
            default_preview: default_preview(),
            label_locale: default_label_locale(),
            functional_state: default_functional_state(),
            machines_lookup: MachinesLookup::default(),
        }
    }
}

impl ContentConfig {
    /// Full thumbnail URL for a preview image identifier.
    pub fn thumbnail_url(&self, preview: &str) -> String {
        format!(
            "{}{}{}",
            self.external_content_root, self.thumbnail_dir, preview
        )
    }

    /// Rewrite a static-scheme identifier to its served path.
    pub fn served_path(&self, content_id: &str) -> String {
        match content_id.strip_prefix(&self.static_prefix) {
            Some(rest) => format!("{}{}", self.external_content_root, rest),
            None => content_id.to_string(),
        }
    }

    /// Whether an identifier names a native knowledge-graph object.
    pub fn is_native(&self, content_id: &str) -> bool {
        content_id.starts_with(&self.ontology_namespace)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// Preview paired with mandated content unless overridden
    #[serde(default = "default_mandated_preview")]
    pub mandated_preview: String,

    /// Known content items with their own preview
    #[serde(default = "default_preview_overrides")]
    pub preview_overrides: BTreeMap<String, String>,
}

fn default_mandated_preview() -> String {
    "MPSStationRoboterProgrammierhandbuch.png".into()
}
fn default_preview_overrides() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "file:///static/7_Basiswissen_Pneumatik_HM/index.html?skipcheck".to_string(),
            "7_Basiswissen_Pneumatik_HM.png".to_string(),
        ),
        (
            "http://www.appsist.de/ontology/demonstrator/b2280e82-2d6f-4888-9edc-6cf5ccc8bd08"
                .to_string(),
            "b2280e82-2d6f-4888-9edc-6cf5ccc8bd08.png".to_string(),
        ),
    ])
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            mandated_preview: default_mandated_preview(),
            preview_overrides: default_preview_overrides(),
        }
    }
}

impl SecondaryConfig {
    /// Preview for a mandated content item.
    pub fn preview_for(&self, content_id: &str) -> &str {
        self.preview_overrides
            .get(content_id)
            .map(String::as_str)
            .unwrap_or(&self.mandated_preview)
    }
}

/// A statically configured presentable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedItemConfig {
    pub id: String,
    pub title: String,
    /// Served path of the document
    pub content_path: String,
    /// Preview image below the thumbnail directory
    pub preview: String,
    pub priority: u32,
}

/// Where the assessment item lands in the list.
///
/// With `Fixed`, lists longer than the configured priority place dynamic
/// items after the assessment. Item ids stay distinct either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityPolicy {
    /// Always use the configured priority
    #[default]
    Fixed,
    /// One past the last dynamic priority
    AfterLast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    #[serde(flatten)]
    pub item: FixedItemConfig,

    #[serde(default)]
    pub priority_policy: PriorityPolicy,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            item: FixedItemConfig {
                id: "lbd-13".into(),
                title: "Übung: Bauteile des Zylinders".into(),
                content_path:
                    "/services/cds/static/externalContent/d69a640a-5526-42dd-b121-d8102b1ad4be/index.html"
                        .into(),
                preview: "d69a640a-5526-42dd-b121-d8102b1ad4be.png".into(),
                priority: 13,
            },
            priority_policy: PriorityPolicy::default(),
        }
    }
}

/// The featured item shipped as an example in `default_toml`.
pub fn example_featured_item() -> FixedItemConfig {
    FixedItemConfig {
        id: "lbd-14".into(),
        title: "DSBC Basiswissen".into(),
        content_path: "/services/cds/static/externalContent/5_DSBC_Basiswissen/index.html?skipcheck"
            .into(),
        preview: "5_DSBC_Basiswissen.jpg".into(),
        priority: 14,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default = "default_start_learning_object")]
    pub start_learning_object: String,

    #[serde(default = "default_open_external_content")]
    pub open_external_content: String,

    /// Token used when a trigger carries none
    #[serde(default = "default_token")]
    pub default_token: String,
}

fn default_start_learning_object() -> String {
    "appsist:content-navigation-service#learningObjectStart".into()
}
fn default_open_external_content() -> String {
    "appsist:openExternalContent".into()
}
fn default_token() -> String {
    "token".into()
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            start_learning_object: default_start_learning_object(),
            open_external_content: default_open_external_content(),
            default_token: default_token(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_profile_url")]
    pub profile_url: String,

    #[serde(default = "default_presentation_url")]
    pub presentation_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_graph_url() -> String {
    "http://127.0.0.1:7080/sparql".into()
}
fn default_auth_url() -> String {
    "http://127.0.0.1:7081/auth".into()
}
fn default_profile_url() -> String {
    "http://127.0.0.1:7082/usermodel".into()
}
fn default_presentation_url() -> String {
    "http://127.0.0.1:7083/iid".into()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            graph_url: default_graph_url(),
            auth_url: default_auth_url(),
            profile_url: default_profile_url(),
            presentation_url: default_presentation_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
}

fn default_heartbeat_interval() -> u64 {
    60
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_heartbeat_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.learnflow/config.toml).
    ///
    /// Environment overrides:
    /// - `LEARNFLOW_GRAPH_URL`
    /// - `LEARNFLOW_SERVICE_TAG`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if let Ok(url) = std::env::var("LEARNFLOW_GRAPH_URL") {
            config.endpoints.graph_url = url;
        }
        if let Ok(tag) = std::env::var("LEARNFLOW_SERVICE_TAG") {
            config.service_tag = tag;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".learnflow")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service_tag.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service_tag must not be empty".into(),
            ));
        }

        if !self.content.external_content_root.ends_with('/') {
            return Err(ConfigError::ValidationError(
                "content.external_content_root must end with '/'".into(),
            ));
        }

        if self.content.label_locale.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "content.label_locale must not be empty".into(),
            ));
        }

        if self.heartbeat.enabled && self.heartbeat.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "heartbeat.interval_secs must be > 0 when enabled".into(),
            ));
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "log_format must be \"text\" or \"json\", got \"{}\"",
                self.log_format
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string, with the example featured item.
    pub fn default_toml() -> String {
        let config = Self {
            featured: Some(example_featured_item()),
            ..Self::default()
        };
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_tag: default_service_tag(),
            log_format: default_log_format(),
            content: ContentConfig::default(),
            secondary: SecondaryConfig::default(),
            assessment: AssessmentConfig::default(),
            featured: None,
            actions: ActionConfig::default(),
            endpoints: EndpointConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
