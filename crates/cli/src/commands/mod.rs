//! Subcommand implementations.

pub mod config_cmd;
pub mod query;
pub mod serve;
pub mod trigger;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use learnflow_config::AppConfig;
use learnflow_core::EventBus;
use learnflow_pipeline::{Dispatcher, Pipeline};

/// The config file in use: `path` if given, else the default location.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load_with_env(&config_path(path))
        .map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}

/// Log which configuration was used. Runs once tracing is initialised.
pub fn log_config_source(path: &Path) {
    if path.exists() {
        tracing::info!(path = %path.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %path.display(), "No config file found, using defaults");
    }
}

/// A dispatcher wired to the configured collaborators.
pub struct Runtime {
    pub dispatcher: Arc<Dispatcher>,
    pub event_bus: Arc<EventBus>,
}

impl Runtime {
    pub fn build(config: &AppConfig, log_only: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let connectors = learnflow_connectors::build_from_config(config, log_only)?;
        let event_bus = Arc::new(EventBus::default());
        let pipeline = Arc::new(Pipeline::new(
            config,
            connectors.graph,
            connectors.profiles,
            connectors.presenter,
            event_bus.clone(),
        ));
        let dispatcher = Dispatcher::new(pipeline, connectors.sessions)
            .with_featured(config.featured.clone());
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            event_bus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_path_wins() {
        let path = Path::new("/etc/learnflow/config.toml");
        assert_eq!(config_path(Some(path)), path);
    }

    #[test]
    fn default_config_path_is_in_config_dir() {
        let path = config_path(None);
        assert!(path.ends_with(".learnflow/config.toml"));
    }

    #[test]
    fn missing_config_file_loads_defaults() {
        let path = Path::new("/nonexistent/learnflow/config.toml");
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.service_tag, "lbd");
    }
}
