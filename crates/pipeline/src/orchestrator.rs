//! Pipeline orchestrator: the main and secondary recommendation branches.
//!
//! A run is a linear sequence of stages. Each stage reads what the previous
//! stage committed to the session context, runs one graph query and commits
//! its own result. Commits are checked against the run's generation, so a
//! run overtaken by a newer trigger stops at its next stage boundary without
//! writing anything.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use learnflow_config::{AppConfig, ContentConfig, SecondaryConfig};
use learnflow_core::error::PipelineError;
use learnflow_core::{
    ContentCandidates, Error, EventBus, GraphStore, PipelineEvent, PresentableItem,
    PresentationConnector, ProfileService, Result, ResultSet, Stage,
};
use learnflow_graph::{QueryBuilder, bracket, interpret};
use tracing::{debug, info, warn};

use crate::builder::ListBuilder;
use crate::context::{RunTicket, SessionStore};
use crate::labels::LabelCache;
use crate::ordering::{CandidateOrdering, PassthroughOrdering};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The list reached the presentation connector
    Published(Vec<PresentableItem>),
    /// A newer trigger took over; nothing was written or published
    Discarded { stage: Stage },
    /// A stage failed; nothing was published
    Aborted { stage: Stage, error: Error },
}

impl RunOutcome {
    pub fn items(&self) -> Option<&[PresentableItem]> {
        match self {
            RunOutcome::Published(items) => Some(items),
            _ => None,
        }
    }
}

struct StageFailure {
    stage: Stage,
    error: Error,
}

/// Stage results that can report a size for logs and events.
trait StageOutput {
    fn count(&self) -> usize;
}

impl StageOutput for usize {
    fn count(&self) -> usize {
        *self
    }
}

impl StageOutput for ContentCandidates {
    fn count(&self) -> usize {
        self.len()
    }
}

impl StageOutput for Vec<PresentableItem> {
    fn count(&self) -> usize {
        self.len()
    }
}

/// Drives recommendation runs against the collaborators.
pub struct Pipeline {
    graph: Arc<dyn GraphStore>,
    profiles: Arc<dyn ProfileService>,
    presenter: Arc<dyn PresentationConnector>,
    store: Arc<SessionStore>,
    labels: Arc<LabelCache>,
    ordering: Arc<dyn CandidateOrdering>,
    queries: QueryBuilder,
    builder: ListBuilder,
    content: ContentConfig,
    secondary: SecondaryConfig,
    default_token: String,
    event_bus: Arc<EventBus>,
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        graph: Arc<dyn GraphStore>,
        profiles: Arc<dyn ProfileService>,
        presenter: Arc<dyn PresentationConnector>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            graph,
            profiles,
            presenter,
            store: Arc::new(SessionStore::new()),
            labels: Arc::new(LabelCache::new(&config.content)),
            ordering: Arc::new(PassthroughOrdering),
            queries: QueryBuilder::new(&config.content),
            builder: ListBuilder::new(config),
            content: config.content.clone(),
            secondary: config.secondary.clone(),
            default_token: config.actions.default_token.clone(),
            event_bus,
        }
    }

    /// Share a session store with other components.
    pub fn with_store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = store;
        self
    }

    /// Share a label cache across pipelines.
    pub fn with_label_cache(mut self, labels: Arc<LabelCache>) -> Self {
        self.labels = labels;
        self
    }

    /// Replace the secondary-branch ordering stage.
    pub fn with_ordering(mut self, ordering: Arc<dyn CandidateOrdering>) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn labels(&self) -> &Arc<LabelCache> {
        &self.labels
    }

    pub fn builder(&self) -> &ListBuilder {
        &self.builder
    }

    pub fn presenter(&self) -> &Arc<dyn PresentationConnector> {
        &self.presenter
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn default_token(&self) -> &str {
        &self.default_token
    }

    /// Run the branch the ticket selected, from profile refresh to publish.
    pub async fn run(&self, ticket: RunTicket) -> RunOutcome {
        info!(
            session_id = %ticket.session_id,
            generation = ticket.generation,
            run_id = %ticket.run_id,
            secondary = ticket.secondary,
            "Pipeline run started"
        );
        self.event_bus.publish(PipelineEvent::RunStarted {
            session_id: ticket.session_id.to_string(),
            generation: ticket.generation,
            secondary: ticket.secondary,
            timestamp: Utc::now(),
        });

        let result = if ticket.secondary {
            self.run_secondary(&ticket).await
        } else {
            self.run_main(&ticket).await
        };

        match result {
            Ok(items) => RunOutcome::Published(items),
            Err(StageFailure { stage, error }) if error.is_stale() => {
                warn!(
                    session_id = %ticket.session_id,
                    generation = ticket.generation,
                    stage = %stage,
                    "Run superseded by a newer trigger, discarding"
                );
                self.event_bus.publish(PipelineEvent::StaleRunDiscarded {
                    session_id: ticket.session_id.to_string(),
                    generation: ticket.generation,
                    stage,
                    timestamp: Utc::now(),
                });
                RunOutcome::Discarded { stage }
            }
            Err(StageFailure { stage, error }) => {
                warn!(
                    session_id = %ticket.session_id,
                    generation = ticket.generation,
                    stage = %stage,
                    error = %error,
                    "Pipeline stage failed, run aborted"
                );
                let event = if stage == Stage::Publish {
                    PipelineEvent::PublishFailed {
                        session_id: ticket.session_id.to_string(),
                        error_message: error.to_string(),
                        timestamp: Utc::now(),
                    }
                } else {
                    PipelineEvent::StageFailed {
                        session_id: ticket.session_id.to_string(),
                        generation: ticket.generation,
                        stage,
                        error_message: error.to_string(),
                        timestamp: Utc::now(),
                    }
                };
                self.event_bus.publish(event);
                RunOutcome::Aborted { stage, error }
            }
        }
    }

    async fn run_main(&self, t: &RunTicket) -> std::result::Result<Vec<PresentableItem>, StageFailure> {
        self.step(t, Stage::Profile, self.refresh_profile(t)).await?;
        self.step(t, Stage::Stations, self.stations(t)).await?;
        self.step(t, Stage::OperatingStates, self.operating_states(t)).await?;
        self.step(t, Stage::Machines, self.machines(t)).await?;
        let candidates = self.step(t, Stage::MainContent, self.main_content(t)).await?;
        self.step(t, Stage::Labels, self.resolve_labels(&candidates)).await?;
        self.step(t, Stage::Publish, self.publish(t, &candidates)).await
    }

    async fn run_secondary(
        &self,
        t: &RunTicket,
    ) -> std::result::Result<Vec<PresentableItem>, StageFailure> {
        self.step(t, Stage::Profile, self.refresh_profile(t)).await?;
        self.step(t, Stage::SeedMandated, self.seed_mandated(t)).await?;
        self.step(t, Stage::ItemsContent, self.items_content(t)).await?;
        self.step(t, Stage::PositionItems, self.position_items(t)).await?;
        self.step(t, Stage::MeasureItems, self.measure_items(t)).await?;
        let candidates = self.step(t, Stage::Ordering, self.order_side_content(t)).await?;
        self.step(t, Stage::Labels, self.resolve_labels(&candidates)).await?;
        self.step(t, Stage::Publish, self.publish(t, &candidates)).await
    }

    async fn step<T, F>(
        &self,
        t: &RunTicket,
        stage: Stage,
        work: F,
    ) -> std::result::Result<T, StageFailure>
    where
        T: StageOutput,
        F: Future<Output = Result<T>>,
    {
        match work.await {
            Ok(output) => {
                let count = output.count();
                debug!(
                    session_id = %t.session_id,
                    generation = t.generation,
                    stage = %stage,
                    count,
                    "Stage completed"
                );
                self.event_bus.publish(PipelineEvent::StageCompleted {
                    session_id: t.session_id.to_string(),
                    generation: t.generation,
                    stage,
                    result_count: count,
                    timestamp: Utc::now(),
                });
                Ok(output)
            }
            Err(error) => Err(StageFailure { stage, error }),
        }
    }

    async fn query(&self, t: &RunTicket, query: String) -> Result<ResultSet> {
        debug!(session_id = %t.session_id, graph = self.graph.name(), %query, "Graph query");
        Ok(self.graph.run_query(&query).await?)
    }

    // ── Shared stages ───────────────────────────────────────────────────

    async fn refresh_profile(&self, t: &RunTicket) -> Result<usize> {
        let (user_id, token) = self
            .store
            .read(t, |ctx| (ctx.user_id.clone(), ctx.token.clone()))
            .await?;
        let user_id =
            user_id.ok_or_else(|| PipelineError::UnknownUser(t.session_id.to_string()))?;
        let token = token.unwrap_or_else(|| self.default_token.clone());

        let profile = self
            .profiles
            .fetch_profile(&t.session_id, &user_id, &token)
            .await?;
        let groups = profile.workplace_groups.len();
        debug!(
            session_id = %t.session_id,
            role = %profile.role,
            groups,
            goals = profile.development_goals.len(),
            "Profile resolved"
        );
        self.store.commit(t, |ctx| ctx.apply_profile(profile)).await?;
        Ok(groups)
    }

    async fn resolve_labels(&self, candidates: &ContentCandidates) -> Result<usize> {
        let missing = self.labels.missing(candidates.content_ids()).await;
        if missing.is_empty() {
            debug!(count = candidates.len(), "All labels cached");
            return Ok(0);
        }

        let query = self.queries.labels_for(&missing);
        debug!(missing = missing.len(), %query, "Requesting labels");
        let results = self.graph.run_query(&query).await?;
        let found = interpret::labels(&results);
        for (content_id, label) in &found {
            self.labels.insert(content_id, label.as_str()).await;
        }
        Ok(found.len())
    }

    async fn publish(
        &self,
        t: &RunTicket,
        candidates: &ContentCandidates,
    ) -> Result<Vec<PresentableItem>> {
        let _guard = self.store.publish_guard(&t.session_id).await;
        let token = self
            .store
            .read(t, |ctx| ctx.token.clone())
            .await?
            .unwrap_or_else(|| self.default_token.clone());
        let titles = self.labels.labels_for(candidates.content_ids()).await;
        let items = self.builder.build(&t.session_id, &token, candidates, &titles);

        self.presenter
            .purge_service_items(&t.session_id, self.builder.service_tag())
            .await?;
        // A newer run may have started while the purge was in flight
        self.store.ensure_current(t).await?;
        self.presenter.add_service_items(&t.session_id, &items).await?;

        info!(
            session_id = %t.session_id,
            generation = t.generation,
            connector = self.presenter.name(),
            count = items.len(),
            "Recommendations published"
        );
        self.event_bus.publish(PipelineEvent::RecommendationsPublished {
            session_id: t.session_id.to_string(),
            generation: t.generation,
            item_count: items.len(),
            timestamp: Utc::now(),
        });
        Ok(items)
    }

    // ── Main branch ─────────────────────────────────────────────────────

    async fn stations(&self, t: &RunTicket) -> Result<usize> {
        let groups = self.store.read(t, |ctx| ctx.workplace_groups.clone()).await?;
        let results = self.query(t, self.queries.stations_in_groups(&groups)).await?;
        let stations = interpret::devices(&results);
        let count = stations.len();
        self.store.commit(t, |ctx| ctx.stations = stations).await?;
        Ok(count)
    }

    async fn operating_states(&self, t: &RunTicket) -> Result<usize> {
        let stations = self.store.read(t, |ctx| ctx.stations.clone()).await?;
        let results = self.query(t, self.queries.local_states(&stations)).await?;
        let local_states = interpret::local_states(&results);
        let states: std::collections::BTreeSet<String> =
            local_states.iter().map(|s| s.state.clone()).collect();
        let count = states.len();
        self.store
            .commit(t, |ctx| {
                ctx.operating_states = states;
                ctx.local_states = local_states;
            })
            .await?;
        Ok(count)
    }

    async fn machines(&self, t: &RunTicket) -> Result<usize> {
        let groups = self.store.read(t, |ctx| ctx.workplace_groups.clone()).await?;
        let results = self.query(t, self.queries.machines_in_groups(&groups)).await?;
        let machines = interpret::devices(&results);
        let count = machines.len();
        self.store.commit(t, |ctx| ctx.machines = machines).await?;
        Ok(count)
    }

    async fn main_content(&self, t: &RunTicket) -> Result<ContentCandidates> {
        let (ids, role) = self
            .store
            .read(t, |ctx| {
                let ids: std::collections::BTreeSet<String> = ctx
                    .operating_states
                    .iter()
                    .chain(&ctx.machines)
                    .chain(&ctx.stations)
                    .map(|id| bracket(id))
                    .collect();
                (ids, ctx.role.clone())
            })
            .await?;
        let results = self.query(t, self.queries.contents_for_ids(&ids, &role)).await?;
        let candidates = interpret::content_candidates(&results, &self.content.default_preview);
        self.store.ensure_current(t).await?;
        Ok(candidates)
    }

    // ── Secondary branch ────────────────────────────────────────────────

    async fn seed_mandated(&self, t: &RunTicket) -> Result<usize> {
        let secondary = &self.secondary;
        let seeded = self
            .store
            .commit(t, |ctx| {
                for content_id in &ctx.goals_detail.contents {
                    ctx.side_content_preview
                        .insert(content_id.as_str(), secondary.preview_for(content_id));
                }
                ctx.side_content_preview.len()
            })
            .await?;
        Ok(seeded)
    }

    async fn items_content(&self, t: &RunTicket) -> Result<usize> {
        let (ids, role) = self
            .store
            .read(t, |ctx| {
                let detail = &ctx.goals_detail;
                let ids: Vec<String> = std::iter::once(&detail.role)
                    .chain(&detail.items)
                    .cloned()
                    .collect();
                (ids, ctx.role.clone())
            })
            .await?;
        let query = self.queries.items_content(&ids, &role);
        self.merge_side_content(t, query).await
    }

    async fn position_items(&self, t: &RunTicket) -> Result<usize> {
        let position = self.store.read(t, |ctx| ctx.goals_detail.role.clone()).await?;
        let query = self.queries.production_items_for_position(&position);
        self.merge_side_content(t, query).await
    }

    async fn measure_items(&self, t: &RunTicket) -> Result<usize> {
        let position = self.store.read(t, |ctx| ctx.goals_detail.role.clone()).await?;
        let query = self.queries.production_items_for_position_measures(&position);
        self.merge_side_content(t, query).await
    }

    async fn merge_side_content(&self, t: &RunTicket, query: String) -> Result<usize> {
        let results = self.query(t, query).await?;
        let found = interpret::content_candidates(&results, &self.content.default_preview);
        let count = found.len();
        self.store
            .commit(t, |ctx| ctx.side_content_preview.merge(found))
            .await?;
        Ok(count)
    }

    async fn order_side_content(&self, t: &RunTicket) -> Result<ContentCandidates> {
        let (mandated, accumulated) = self
            .store
            .read(t, |ctx| {
                (
                    ctx.goals_detail.contents.clone(),
                    ctx.side_content_preview.clone(),
                )
            })
            .await?;
        let ordered = self
            .ordering
            .order(&t.session_id, &mandated, accumulated)
            .await?;
        let committed = ordered.clone();
        self.store
            .commit(t, |ctx| ctx.side_content_preview = committed)
            .await?;
        Ok(ordered)
    }
}
