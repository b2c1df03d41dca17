//! Recommendation list builder.
//!
//! Turns ordered content candidates into presentable items: priorities count
//! up from 1 in candidate order, native graph objects start a learning
//! object, everything else opens as an external document. The assessment
//! item is always appended last.
//!
//! Content items are identified as `<tag>-<priority>`. An id that would equal
//! a configured fixed item's id becomes `<tag>-content-<priority>` instead.

use std::collections::{BTreeSet, HashMap};

use learnflow_config::{
    ActionConfig, AppConfig, AssessmentConfig, ContentConfig, FixedItemConfig, PriorityPolicy,
};
use learnflow_core::{ContentCandidates, LaunchAction, PresentableItem, SessionId};
use serde_json::json;

/// Mime type from the text after the last `.`, case-insensitive.
pub fn detect_mime_type(content_id: &str) -> &'static str {
    let extension = content_id
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or(content_id)
        .to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        _ => "text/html",
    }
}

#[derive(Debug, Clone)]
pub struct ListBuilder {
    service_tag: String,
    content: ContentConfig,
    actions: ActionConfig,
    assessment: AssessmentConfig,
    reserved_ids: BTreeSet<String>,
}

impl ListBuilder {
    pub fn new(config: &AppConfig) -> Self {
        let reserved_ids = std::iter::once(&config.assessment.item)
            .chain(config.featured.as_ref())
            .map(|item| item.id.clone())
            .collect();
        Self {
            service_tag: config.service_tag.clone(),
            content: config.content.clone(),
            actions: config.actions.clone(),
            assessment: config.assessment.clone(),
            reserved_ids,
        }
    }

    pub fn service_tag(&self) -> &str {
        &self.service_tag
    }

    /// Build the full list for a session.
    ///
    /// `titles` maps raw content identifiers to labels; unlabelled content is
    /// titled with its identifier.
    pub fn build(
        &self,
        session_id: &SessionId,
        token: &str,
        candidates: &ContentCandidates,
        titles: &HashMap<String, String>,
    ) -> Vec<PresentableItem> {
        let mut items: Vec<PresentableItem> = candidates
            .iter()
            .zip(1u32..)
            .map(|(candidate, priority)| {
                let title = titles
                    .get(&candidate.content_id)
                    .cloned()
                    .unwrap_or_else(|| candidate.content_id.clone());
                self.content_item(
                    session_id,
                    token,
                    &candidate.content_id,
                    &candidate.preview,
                    priority,
                    title,
                )
            })
            .collect();

        let assessment_priority = match self.assessment.priority_policy {
            PriorityPolicy::Fixed => self.assessment.item.priority,
            PriorityPolicy::AfterLast => items.len() as u32 + 1,
        };
        items.push(self.fixed_item(
            &self.assessment.item,
            session_id,
            token,
            assessment_priority,
        ));
        items
    }

    fn content_item(
        &self,
        session_id: &SessionId,
        token: &str,
        content_id: &str,
        preview: &str,
        priority: u32,
        title: String,
    ) -> PresentableItem {
        let native = self.content.is_native(content_id);
        let (action, mime_type) = if native {
            let action = LaunchAction::StartLearningObject {
                address: self.actions.start_learning_object.clone(),
                body: action_body(session_id, token, content_id),
            };
            (action, None)
        } else {
            let target = if content_id.starts_with("http") {
                content_id.to_string()
            } else {
                self.content.served_path(content_id)
            };
            let action = LaunchAction::OpenExternalContent {
                address: self.actions.open_external_content.clone(),
                body: action_body(session_id, token, &target),
            };
            (action, Some(detect_mime_type(content_id).to_string()))
        };

        let mut id = format!("{}-{}", self.service_tag, priority);
        if self.reserved_ids.contains(&id) {
            id = format!("{}-content-{}", self.service_tag, priority);
        }

        PresentableItem {
            id,
            priority,
            title,
            service: self.service_tag.clone(),
            image_url: self.content.thumbnail_url(preview),
            mime_type,
            external: !native,
            action,
        }
    }

    /// A configured external item at the given priority.
    pub fn fixed_item(
        &self,
        item: &FixedItemConfig,
        session_id: &SessionId,
        token: &str,
        priority: u32,
    ) -> PresentableItem {
        PresentableItem {
            id: item.id.clone(),
            priority,
            title: item.title.clone(),
            service: self.service_tag.clone(),
            image_url: self.content.thumbnail_url(&item.preview),
            mime_type: Some(detect_mime_type(&item.content_path).to_string()),
            external: true,
            action: LaunchAction::OpenExternalContent {
                address: self.actions.open_external_content.clone(),
                body: action_body(session_id, token, &item.content_path),
            },
        }
    }
}

fn action_body(session_id: &SessionId, token: &str, process_id: &str) -> serde_json::Value {
    json!({
        "body": {
            "sessionId": session_id.as_str(),
            "token": token,
            "processId": process_id,
        }
    })
}
