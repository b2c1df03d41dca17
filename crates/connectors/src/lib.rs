//! Collaborator implementations for learnflow.
//!
//! Every external service is reached over HTTP with a shared `reqwest`
//! client. [`build_from_config`] wires all four from the endpoint settings.

pub mod graph;
pub mod presentation;
pub mod profile;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use learnflow_config::AppConfig;
use learnflow_core::{GraphStore, PresentationConnector, ProfileService, SessionResolver};

pub use graph::HttpGraphStore;
pub use presentation::{HttpPresentationConnector, LogPresentation};
pub use profile::HttpProfileService;
pub use session::HttpSessionResolver;

/// The four collaborators a pipeline needs.
pub struct Connectors {
    pub graph: Arc<dyn GraphStore>,
    pub sessions: Arc<dyn SessionResolver>,
    pub profiles: Arc<dyn ProfileService>,
    pub presenter: Arc<dyn PresentationConnector>,
}

/// A client with the configured request timeout.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, learnflow_core::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| learnflow_core::Error::Config {
            message: format!("Failed to create HTTP client: {e}"),
        })
}

/// Build HTTP collaborators from configuration.
///
/// With `log_only`, lists go to the log instead of the presentation service.
pub fn build_from_config(
    config: &AppConfig,
    log_only: bool,
) -> Result<Connectors, learnflow_core::Error> {
    let endpoints = &config.endpoints;
    let client = http_client(endpoints.request_timeout_secs)?;

    let presenter: Arc<dyn PresentationConnector> = if log_only {
        Arc::new(LogPresentation)
    } else {
        Arc::new(HttpPresentationConnector::new(
            &endpoints.presentation_url,
            client.clone(),
        ))
    };

    Ok(Connectors {
        graph: Arc::new(HttpGraphStore::new(&endpoints.graph_url, client.clone())),
        sessions: Arc::new(HttpSessionResolver::new(&endpoints.auth_url, client.clone())),
        profiles: Arc::new(HttpProfileService::new(&endpoints.profile_url, client)),
        presenter,
    })
}
