//! Presentation connector trait and the items it displays.
//!
//! The presentation layer shows an ordered list of items per session and
//! service. We can only purge a service's items and add new ones; there is no
//! atomic replace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PresentationError;
use crate::session::SessionId;

/// What happens when the user opens an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaunchAction {
    /// Native knowledge-graph learning object
    StartLearningObject {
        address: String,
        body: serde_json::Value,
    },
    /// External document served from the content root
    OpenExternalContent {
        address: String,
        body: serde_json::Value,
    },
}

impl LaunchAction {
    /// Bus address the action sends its message to.
    pub fn address(&self) -> &str {
        match self {
            LaunchAction::StartLearningObject { address, .. }
            | LaunchAction::OpenExternalContent { address, .. } => address,
        }
    }

    /// Message body the action sends.
    pub fn body(&self) -> &serde_json::Value {
        match self {
            LaunchAction::StartLearningObject { body, .. }
            | LaunchAction::OpenExternalContent { body, .. } => body,
        }
    }

    /// The content identifier or path the action opens.
    pub fn process_id(&self) -> Option<&str> {
        self.body()
            .get("body")
            .and_then(|b| b.get("processId"))
            .and_then(|p| p.as_str())
    }
}

/// A single recommendation as sent to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentableItem {
    pub id: String,

    /// Lower is more prominent
    pub priority: u32,

    pub title: String,

    /// Owning-service tag
    pub service: String,

    pub image_url: String,

    /// Set for external documents only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub external: bool,

    pub action: LaunchAction,
}

/// Displays recommendation lists for sessions.
#[async_trait]
pub trait PresentationConnector: Send + Sync {
    /// Human-readable connector name (e.g., "http", "log").
    fn name(&self) -> &str;

    /// Remove every item owned by `service` from the session's surface.
    async fn purge_service_items(
        &self,
        session_id: &SessionId,
        service: &str,
    ) -> std::result::Result<(), PresentationError>;

    /// Append items to the session's surface.
    async fn add_service_items(
        &self,
        session_id: &SessionId,
        items: &[PresentableItem],
    ) -> std::result::Result<(), PresentationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_camel_case() {
        let item = PresentableItem {
            id: "lbd-1".into(),
            priority: 1,
            title: "Pump Guide".into(),
            service: "lbd".into(),
            image_url: "/thumbs/p1.jpg".into(),
            mime_type: None,
            external: false,
            action: LaunchAction::StartLearningObject {
                address: "learningObjectStart".into(),
                body: serde_json::json!({"body": {"processId": "urn:c1"}}),
            },
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("imageUrl"));
        assert!(json.contains("start_learning_object"));
        assert!(!json.contains("mimeType"));
        assert_eq!(item.action.process_id(), Some("urn:c1"));
        assert_eq!(item.action.address(), "learningObjectStart");
    }
}
