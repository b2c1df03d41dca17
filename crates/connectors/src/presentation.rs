//! Presentation connectors: the HTTP bridge and a logging sink.

use async_trait::async_trait;
use learnflow_core::error::PresentationError;
use learnflow_core::{PresentableItem, PresentationConnector, SessionId};
use serde_json::json;
use tracing::{debug, info};

/// Posts purges to `{base}/purge` and item lists to `{base}/items`.
pub struct HttpPresentationConnector {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPresentationConnector {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("{url} returned {}", response.status()))
        }
    }
}

#[async_trait]
impl PresentationConnector for HttpPresentationConnector {
    fn name(&self) -> &str {
        "http"
    }

    async fn purge_service_items(
        &self,
        session_id: &SessionId,
        service: &str,
    ) -> std::result::Result<(), PresentationError> {
        debug!(session_id = %session_id, service, "Purging service items");
        self.post(
            "purge",
            json!({ "sessionId": session_id.as_str(), "service": service }),
        )
        .await
        .map_err(|reason| PresentationError::PurgeFailed {
            session_id: session_id.to_string(),
            reason,
        })
    }

    async fn add_service_items(
        &self,
        session_id: &SessionId,
        items: &[PresentableItem],
    ) -> std::result::Result<(), PresentationError> {
        debug!(session_id = %session_id, count = items.len(), "Adding service items");
        self.post(
            "items",
            json!({ "sessionId": session_id.as_str(), "items": items }),
        )
        .await
        .map_err(|reason| PresentationError::AddFailed {
            session_id: session_id.to_string(),
            reason,
        })
    }
}

/// Writes every list to the log instead of a display.
#[derive(Debug, Default)]
pub struct LogPresentation;

#[async_trait]
impl PresentationConnector for LogPresentation {
    fn name(&self) -> &str {
        "log"
    }

    async fn purge_service_items(
        &self,
        session_id: &SessionId,
        service: &str,
    ) -> std::result::Result<(), PresentationError> {
        info!(session_id = %session_id, service, "purge");
        Ok(())
    }

    async fn add_service_items(
        &self,
        session_id: &SessionId,
        items: &[PresentableItem],
    ) -> std::result::Result<(), PresentationError> {
        for item in items {
            info!(
                session_id = %session_id,
                priority = item.priority,
                id = %item.id,
                title = %item.title,
                target = item.action.process_id().unwrap_or_default(),
                "item"
            );
        }
        Ok(())
    }
}
