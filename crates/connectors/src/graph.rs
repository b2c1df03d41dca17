//! HTTP bridge to the knowledge-graph query service.
//!
//! Queries are posted as `{"sparql": {"query": "..."}}` and answered with a
//! SPARQL JSON results document.

use async_trait::async_trait;
use learnflow_core::error::GraphError;
use learnflow_core::{GraphStore, ResultSet};
use serde_json::json;
use tracing::{debug, warn};

pub struct HttpGraphStore {
    url: String,
    client: reqwest::Client,
}

impl HttpGraphStore {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body(query: &str) -> serde_json::Value {
        json!({ "sparql": { "query": query } })
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn run_query(&self, query: &str) -> std::result::Result<ResultSet, GraphError> {
        debug!(url = %self.url, len = query.len(), "Sending graph query");

        let response = self
            .client
            .post(&self.url)
            .json(&Self::request_body(query))
            .send()
            .await
            .map_err(|e| GraphError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Graph service returned error");
            return Err(GraphError::ApiError {
                status_code: status,
                message: body,
            });
        }

        let doc: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GraphError::MalformedResponse(format!("Failed to parse response: {e}")))?;
        let results = ResultSet::from_sparql_json(&doc)?;
        debug!(rows = results.len(), "Graph query answered");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wraps_query() {
        let body = HttpGraphStore::request_body("SELECT ?x WHERE {}");
        assert_eq!(body["sparql"]["query"], "SELECT ?x WHERE {}");
    }

    #[test]
    fn keeps_configured_url() {
        let store = HttpGraphStore::new("http://graph:7080/sparql", reqwest::Client::new());
        assert_eq!(store.url(), "http://graph:7080/sparql");
        assert_eq!(store.name(), "http");
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        let store = HttpGraphStore::new("http://127.0.0.1:9/sparql", reqwest::Client::new());
        let err = store.run_query("SELECT * WHERE {}").await.unwrap_err();
        assert!(matches!(err, GraphError::Network(_)));
    }
}
