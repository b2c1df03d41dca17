//! Event trigger dispatcher: the entry points that start or steer runs.
//!
//! Session starts resolve the session owner first; activity switches reuse
//! the owner already on record. Every trigger that starts a run bumps the
//! session generation, so a newer trigger always supersedes runs still in
//! flight. A session start that fails to resolve starts nothing and leaves
//! running work alone. Failures are logged, never surfaced.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use learnflow_config::FixedItemConfig;
use learnflow_core::{Activity, PipelineEvent, SessionId, SessionResolver, Stage, Trigger};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::orchestrator::{Pipeline, RunOutcome};

pub struct Dispatcher {
    pipeline: Arc<Pipeline>,
    sessions: Arc<dyn SessionResolver>,
    featured: Option<FixedItemConfig>,
}

impl Dispatcher {
    pub fn new(pipeline: Arc<Pipeline>, sessions: Arc<dyn SessionResolver>) -> Self {
        Self {
            pipeline,
            sessions,
            featured: None,
        }
    }

    /// Item pushed by [`Self::push_featured_item`].
    pub fn with_featured(mut self, item: Option<FixedItemConfig>) -> Self {
        self.featured = item;
        self
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Handle a trigger to completion.
    ///
    /// Returns the run outcome for triggers that start a run.
    pub async fn handle(&self, trigger: Trigger) -> Option<RunOutcome> {
        match trigger {
            Trigger::SessionStart { sid, token } => {
                self.on_session_trigger(&SessionId(sid), &token).await
            }
            Trigger::UserOnline {
                session_id,
                user_id,
            } => {
                self.on_user_online(&SessionId(session_id), &user_id).await;
                None
            }
            Trigger::ActivitySwitch {
                session_id,
                activity,
            } => {
                self.on_activity_switch(&SessionId(session_id), activity)
                    .await
            }
            Trigger::PushFeatured => {
                self.push_featured_item().await;
                None
            }
        }
    }

    /// Handle a trigger on its own task.
    pub fn spawn(self: &Arc<Self>, trigger: Trigger) -> JoinHandle<Option<RunOutcome>> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.handle(trigger).await })
    }

    /// Resolve the session owner, then run the branch currently selected.
    pub async fn on_session_trigger(
        &self,
        session_id: &SessionId,
        token: &str,
    ) -> Option<RunOutcome> {
        let store = self.pipeline.store();
        let session = match self.sessions.resolve(session_id, token).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                info!(session_id = %session_id, "Session not known to auth service, skipping");
                return None;
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Session resolution failed");
                let generation = store
                    .snapshot(session_id)
                    .await
                    .map_or(0, |ctx| ctx.generation());
                self.pipeline.event_bus().publish(PipelineEvent::StageFailed {
                    session_id: session_id.to_string(),
                    generation,
                    stage: Stage::ResolveSession,
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return None;
            }
        };

        let ticket = store.begin_run(session_id).await;
        store
            .set_user(session_id, &session.user_id, Some(token))
            .await;
        Some(self.pipeline.run(ticket).await)
    }

    /// Record the owner of a session. Does not start a run.
    pub async fn on_user_online(&self, session_id: &SessionId, user_id: &str) {
        debug!(session_id = %session_id, user_id, "User online");
        self.pipeline
            .store()
            .set_user(session_id, user_id, None)
            .await;
    }

    /// Switch the session's branch and re-run it.
    pub async fn on_activity_switch(
        &self,
        session_id: &SessionId,
        activity: Activity,
    ) -> Option<RunOutcome> {
        let store = self.pipeline.store();
        store
            .set_activity(session_id, activity.is_secondary())
            .await;

        let known_user = store
            .snapshot(session_id)
            .await
            .and_then(|ctx| ctx.user_id)
            .is_some();
        if !known_user {
            warn!(
                session_id = %session_id,
                activity = ?activity,
                "Activity switch for session without known user, skipping run"
            );
            return None;
        }

        info!(session_id = %session_id, activity = ?activity, "Activity switched");
        let ticket = store.begin_run(session_id).await;
        Some(self.pipeline.run(ticket).await)
    }

    /// Append the featured item to every session with a known owner.
    ///
    /// Existing items are kept. Returns the number of sessions reached.
    pub async fn push_featured_item(&self) -> usize {
        let Some(item) = &self.featured else {
            debug!("No featured item configured");
            return 0;
        };

        let sessions = self.pipeline.store().sessions_with_user().await;
        let builder = self.pipeline.builder();
        let presenter = self.pipeline.presenter();

        let deliveries = sessions.iter().map(|(session_id, _user, token)| {
            let token = token
                .as_deref()
                .unwrap_or_else(|| self.pipeline.default_token());
            let featured = builder.fixed_item(item, session_id, token, item.priority);
            async move {
                match presenter.add_service_items(session_id, &[featured]).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Featured item push failed");
                        false
                    }
                }
            }
        });

        let delivered = join_all(deliveries).await.into_iter().filter(|ok| *ok).count();
        info!(
            sessions = sessions.len(),
            delivered,
            item = %item.id,
            "Featured item pushed"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tokio::sync::Notify;

    fn dispatcher(h: &Harness, sessions: FixedSessions) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(h.pipeline.clone(), Arc::new(sessions)))
    }

    #[tokio::test]
    async fn session_trigger_resolves_and_publishes() {
        let h = Harness::new(main_scenario_graph());
        let d = dispatcher(&h, FixedSessions::user("u1"));
        let id = SessionId::from("s1");

        let outcome = d.on_session_trigger(&id, "t1").await.unwrap();
        assert_eq!(outcome.items().unwrap().len(), 2);

        let ctx = h.pipeline.store().snapshot(&id).await.unwrap();
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
        assert_eq!(ctx.token.as_deref(), Some("t1"));
        assert!(!ctx.in_secondary_activity);
    }

    #[tokio::test]
    async fn unresolved_session_runs_nothing() {
        let h = Harness::new(main_scenario_graph());
        let d = dispatcher(&h, FixedSessions::unknown());

        assert!(d.on_session_trigger(&SessionId::from("s1"), "t").await.is_none());
        assert_eq!(h.graph.calls(), 0);
        assert_eq!(h.presenter.purges(), 0);
    }

    #[tokio::test]
    async fn activity_switch_selects_secondary_branch() {
        let h = Harness::new(main_scenario_graph());
        let d = dispatcher(&h, FixedSessions::user("u1"));
        let id = SessionId::from("s1");

        d.on_user_online(&id, "u1").await;
        let outcome = d.on_activity_switch(&id, Activity::Side).await.unwrap();
        assert!(outcome.items().is_some());
        assert_eq!(h.graph.calls_matching("?device app:isPartOf"), 0);
        assert_eq!(h.graph.calls_matching("app:hatMassnahme"), 1);

        let outcome = d.on_activity_switch(&id, Activity::Main).await.unwrap();
        assert!(outcome.items().is_some());
        assert_eq!(h.graph.calls_matching("?device app:isPartOf"), 2);
    }

    #[tokio::test]
    async fn activity_switch_without_user_is_skipped() {
        let h = Harness::new(main_scenario_graph());
        let d = dispatcher(&h, FixedSessions::user("u1"));
        let id = SessionId::from("s1");

        assert!(d.on_activity_switch(&id, Activity::Side).await.is_none());
        let ctx = h.pipeline.store().snapshot(&id).await.unwrap();
        assert!(ctx.in_secondary_activity);
        assert_eq!(h.graph.calls(), 0);
    }

    #[tokio::test]
    async fn reentry_discards_the_older_run() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(main_scenario_graph().gated_on("?device app:isPartOf", gate.clone()));
        let d = dispatcher(&h, FixedSessions::user("u1"));
        let id = SessionId::from("s1");

        let first = d.spawn(Trigger::SessionStart {
            sid: "s1".into(),
            token: "t1".into(),
        });
        while h.graph.calls_matching("?device app:isPartOf") == 0 {
            tokio::task::yield_now().await;
        }

        let second = d.on_activity_switch(&id, Activity::Side).await.unwrap();
        assert!(second.items().is_some());

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(
            first,
            RunOutcome::Discarded {
                stage: Stage::Stations
            }
        ));

        assert_eq!(h.presenter.published().len(), 1);
        let ctx = h.pipeline.store().snapshot(&id).await.unwrap();
        assert!(ctx.stations.is_empty());
        assert_eq!(ctx.generation(), 2);
    }

    #[tokio::test]
    async fn superseded_run_cannot_publish_over_newer_list() {
        let gate = Arc::new(Notify::new());
        let h = Harness::with_presenter(
            main_scenario_graph(),
            RecordingPresenter::gated_purge(gate.clone()),
        );
        let d = dispatcher(&h, FixedSessions::user("u1"));
        let id = SessionId::from("s1");

        let first = d.spawn(Trigger::SessionStart {
            sid: "s1".into(),
            token: "t1".into(),
        });
        while h.presenter.purges() == 0 {
            tokio::task::yield_now().await;
        }

        let second = {
            let d = d.clone();
            let id = id.clone();
            tokio::spawn(async move { d.on_activity_switch(&id, Activity::Side).await })
        };
        while h.pipeline.store().snapshot(&id).await.unwrap().generation() < 2 {
            tokio::task::yield_now().await;
        }

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(
            first,
            RunOutcome::Discarded {
                stage: Stage::Publish
            }
        ));
        let second = second.await.unwrap().unwrap();
        let side_items = second.items().expect("published");

        let published = h.presenter.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, side_items.to_vec());
        assert_eq!(published[0].1[0].title, "urn:m1");
        assert_eq!(h.presenter.purges(), 2);
    }

    #[tokio::test]
    async fn failed_resolution_leaves_running_pipeline_alone() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(main_scenario_graph().gated_on("?device app:isPartOf", gate.clone()));
        let known = dispatcher(&h, FixedSessions::user("u1"));
        let unknown = dispatcher(&h, FixedSessions::unknown());
        let id = SessionId::from("s1");

        let running = known.spawn(Trigger::SessionStart {
            sid: "s1".into(),
            token: "t1".into(),
        });
        while h.graph.calls_matching("?device app:isPartOf") == 0 {
            tokio::task::yield_now().await;
        }

        assert!(unknown.on_session_trigger(&id, "t2").await.is_none());
        gate.notify_one();

        let outcome = running.await.unwrap().unwrap();
        assert!(outcome.items().is_some());
        assert_eq!(h.presenter.published().len(), 1);
        let ctx = h.pipeline.store().snapshot(&id).await.unwrap();
        assert_eq!(ctx.generation(), 1);
    }

    #[tokio::test]
    async fn resolution_error_is_reported_as_stage_failure() {
        let h = Harness::new(main_scenario_graph());
        let d = dispatcher(&h, FixedSessions::failing());
        let mut events = h.event_bus.subscribe();

        assert!(d.on_session_trigger(&SessionId::from("s1"), "t").await.is_none());

        let event = events.try_recv().unwrap();
        assert!(matches!(
            event.as_ref(),
            PipelineEvent::StageFailed {
                stage: Stage::ResolveSession,
                generation: 0,
                ..
            }
        ));
        assert!(h.pipeline.store().is_empty().await);
        assert_eq!(h.profiles.calls(), 0);
    }

    #[tokio::test]
    async fn featured_item_reaches_known_sessions() {
        let h = Harness::new(main_scenario_graph());
        let d = Dispatcher::new(h.pipeline.clone(), Arc::new(FixedSessions::user("u1")))
            .with_featured(Some(learnflow_config::example_featured_item()));

        d.on_user_online(&SessionId::from("s1"), "u1").await;
        d.on_user_online(&SessionId::from("s2"), "u2").await;
        assert_eq!(d.push_featured_item().await, 2);

        let published = h.presenter.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1[0].id, "lbd-14");
        assert_eq!(published[0].1[0].priority, 14);
        assert_eq!(h.presenter.purges(), 0);
    }

    #[tokio::test]
    async fn push_without_featured_item_is_noop() {
        let h = Harness::new(main_scenario_graph());
        let d = dispatcher(&h, FixedSessions::user("u1"));
        assert!(d.handle(Trigger::PushFeatured).await.is_none());
        assert!(h.presenter.published().is_empty());
    }

    #[tokio::test]
    async fn malformed_profile_aborts_without_publish() {
        let h = Harness::with_profiles(main_scenario_graph(), FixedProfiles::malformed());
        let d = dispatcher(&h, FixedSessions::user("u1"));

        let outcome = d
            .handle(Trigger::SessionStart {
                sid: "s1".into(),
                token: "t".into(),
            })
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::Aborted {
                stage: Stage::Profile,
                ..
            }
        ));
        assert_eq!(h.profiles.calls(), 1);
        assert_eq!(h.graph.calls(), 0);
        assert_eq!(h.presenter.purges(), 0);
    }
}
