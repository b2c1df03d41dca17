//! Pipeline event system: observable stage outcomes.
//!
//! End users never see pipeline failures. Everything funnels to logs and to
//! this bus, so operators and tests can still watch each run progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Named pipeline stages, in the order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResolveSession,
    Profile,
    Stations,
    OperatingStates,
    Machines,
    MainContent,
    SeedMandated,
    ItemsContent,
    PositionItems,
    MeasureItems,
    Ordering,
    Labels,
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ResolveSession => "resolve_session",
            Stage::Profile => "profile",
            Stage::Stations => "stations",
            Stage::OperatingStates => "operating_states",
            Stage::Machines => "machines",
            Stage::MainContent => "main_content",
            Stage::SeedMandated => "seed_mandated",
            Stage::ItemsContent => "items_content",
            Stage::PositionItems => "position_items",
            Stage::MeasureItems => "measure_items",
            Stage::Ordering => "ordering",
            Stage::Labels => "labels",
            Stage::Publish => "publish",
        };
        f.pad(name)
    }
}

/// All pipeline events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A trigger started a new run for a session
    RunStarted {
        session_id: String,
        generation: u64,
        secondary: bool,
        timestamp: DateTime<Utc>,
    },

    /// A stage finished and committed its result
    StageCompleted {
        session_id: String,
        generation: u64,
        stage: Stage,
        result_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A stage failed; the run was aborted without publishing
    StageFailed {
        session_id: String,
        generation: u64,
        stage: Stage,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A newer trigger superseded this run; its result was dropped
    StaleRunDiscarded {
        session_id: String,
        generation: u64,
        stage: Stage,
        timestamp: DateTime<Utc>,
    },

    /// The recommendation list reached the presentation connector
    RecommendationsPublished {
        session_id: String,
        generation: u64,
        item_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Purge or add failed at the presentation connector
    PublishFailed {
        session_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// The session this event concerns.
    pub fn session_id(&self) -> &str {
        match self {
            PipelineEvent::RunStarted { session_id, .. }
            | PipelineEvent::StageCompleted { session_id, .. }
            | PipelineEvent::StageFailed { session_id, .. }
            | PipelineEvent::StaleRunDiscarded { session_id, .. }
            | PipelineEvent::RecommendationsPublished { session_id, .. }
            | PipelineEvent::PublishFailed { session_id, .. } => session_id,
        }
    }
}

/// A broadcast-based event bus for pipeline events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Subscribers receive every event and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<PipelineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(PipelineEvent::StageCompleted {
            session_id: "s1".into(),
            generation: 1,
            stage: Stage::Stations,
            result_count: 2,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            PipelineEvent::StageCompleted {
                stage,
                result_count,
                ..
            } => {
                assert_eq!(*stage, Stage::Stations);
                assert_eq!(*result_count, 2);
            }
            _ => panic!("Expected StageCompleted event"),
        }
        assert_eq!(event.session_id(), "s1");
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(PipelineEvent::PublishFailed {
            session_id: "s1".into(),
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn stage_display_is_snake_case() {
        assert_eq!(Stage::OperatingStates.to_string(), "operating_states");
        assert_eq!(format!("{:<8}|", Stage::Labels), "labels  |");
        let json = serde_json::to_string(&Stage::MeasureItems).unwrap();
        assert_eq!(json, "\"measure_items\"");
    }
}
