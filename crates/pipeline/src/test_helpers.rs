//! Shared test helpers: scripted collaborators and a wired pipeline.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use learnflow_config::AppConfig;
use learnflow_core::error::{GraphError, PresentationError, ProfileError, SessionError};
use learnflow_core::{
    DevelopmentGoals, EventBus, GraphStore, PresentableItem, PresentationConnector,
    ProfileService, ResultSet, Session, SessionId, SessionResolver, UserProfile,
};
use tokio::sync::Notify;

use crate::orchestrator::Pipeline;

type Rows = Vec<Vec<(&'static str, &'static str)>>;

struct Rule {
    fragment: &'static str,
    answers: Vec<Rows>,
    served: usize,
}

/// A graph that answers by matching query fragments.
///
/// Rules are checked in registration order; the first rule whose fragment
/// occurs in the query answers it. Unmatched queries get an empty result.
pub struct ScriptedGraph {
    rules: Mutex<Vec<Rule>>,
    failing: Option<&'static str>,
    gate: Mutex<Option<(&'static str, Arc<Notify>)>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedGraph {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            failing: None,
            gate: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Answer every matching query with `rows`.
    pub fn on(self, fragment: &'static str, rows: Rows) -> Self {
        self.on_sequence(fragment, vec![rows])
    }

    /// Answer matching queries with successive entries, repeating the last.
    pub fn on_sequence(self, fragment: &'static str, answers: Vec<Rows>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            fragment,
            answers,
            served: 0,
        });
        self
    }

    /// Fail every query containing `fragment`.
    pub fn failing_on(mut self, fragment: &'static str) -> Self {
        self.failing = Some(fragment);
        self
    }

    /// Hold the first query containing `fragment` until `gate` is notified.
    pub fn gated_on(self, fragment: &'static str, gate: Arc<Notify>) -> Self {
        *self.gate.lock().unwrap() = Some((fragment, gate));
        self
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.contains(fragment))
            .count()
    }
}

#[async_trait::async_trait]
impl GraphStore for ScriptedGraph {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run_query(&self, query: &str) -> Result<ResultSet, GraphError> {
        self.queries.lock().unwrap().push(query.to_string());

        let held = {
            let mut gate = self.gate.lock().unwrap();
            match gate.as_ref() {
                Some((fragment, _)) if query.contains(fragment) => gate.take(),
                _ => None,
            }
        };
        if let Some((_, notify)) = held {
            notify.notified().await;
        }

        if let Some(fragment) = self.failing {
            if query.contains(fragment) {
                return Err(GraphError::Network("scripted failure".into()));
            }
        }

        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules.iter_mut().find(|r| query.contains(r.fragment)) else {
            return Ok(ResultSet::default());
        };
        let index = rule.served.min(rule.answers.len().saturating_sub(1));
        rule.served += 1;
        let rows = rule.answers.get(index).cloned().unwrap_or_default();
        Ok(ResultSet::from_pairs(rows))
    }
}

/// The graph of the reference scenario: group g1, station st1, state "on",
/// content c1 labelled "Pump Guide".
pub fn main_scenario_graph() -> ScriptedGraph {
    ScriptedGraph::new()
        .on("?device app:isPartOf", vec![vec![("device", "st1")]])
        .on(
            "?z ?station ?p",
            vec![vec![
                ("z", "on"),
                ("station", "st1"),
                ("p", "http://www.appsist.de/ontology/FunkionsfaehigerZustand"),
            ]],
        )
        .on(
            "informiertUeber ?i .",
            vec![vec![("inhalt", "c1"), ("vorschau", "p1.jpg")]],
        )
        .on("rdfs:label", vec![vec![("oc", "c1"), ("label", "Pump Guide")]])
}

/// Profile of the reference scenario.
pub fn scenario_profile() -> UserProfile {
    UserProfile {
        role: "r1".into(),
        workplace_groups: BTreeSet::from(["g1".to_string()]),
        development_goals: BTreeSet::new(),
        goals_detail: DevelopmentGoals {
            role: "app:Anlagenoperator".into(),
            items: vec!["urn:i1".into()],
            contents: vec!["urn:m1".into()],
        },
    }
}

/// Answers every profile request with the same profile, or fails.
pub struct FixedProfiles {
    profile: Option<UserProfile>,
    calls: Mutex<usize>,
}

impl FixedProfiles {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile: Some(profile),
            calls: Mutex::new(0),
        }
    }

    pub fn malformed() -> Self {
        Self {
            profile: None,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ProfileService for FixedProfiles {
    async fn fetch_profile(
        &self,
        _session_id: &SessionId,
        _user_id: &str,
        _token: &str,
    ) -> Result<UserProfile, ProfileError> {
        *self.calls.lock().unwrap() += 1;
        self.profile.clone().ok_or_else(|| ProfileError::Malformed {
            field: "workplaceGroups".into(),
            reason: "expected a JSON array".into(),
        })
    }
}

/// Resolves every session to one user, to nothing, or fails.
pub struct FixedSessions {
    user_id: Option<String>,
    fail: bool,
}

impl FixedSessions {
    pub fn user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            fail: false,
        }
    }

    pub fn unknown() -> Self {
        Self {
            user_id: None,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            user_id: None,
            fail: true,
        }
    }
}

#[async_trait::async_trait]
impl SessionResolver for FixedSessions {
    async fn resolve(
        &self,
        session_id: &SessionId,
        _token: &str,
    ) -> Result<Option<Session>, SessionError> {
        if self.fail {
            return Err(SessionError::Unavailable("auth service offline".into()));
        }
        Ok(self.user_id.as_ref().map(|user_id| Session {
            id: session_id.to_string(),
            user_id: user_id.clone(),
        }))
    }
}

/// Records purges and published lists.
#[derive(Default)]
pub struct RecordingPresenter {
    purges: Mutex<Vec<(SessionId, String)>>,
    added: Mutex<Vec<(SessionId, Vec<PresentableItem>)>>,
    fail_add: bool,
    purge_gate: Mutex<Option<Arc<Notify>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_add() -> Self {
        Self {
            fail_add: true,
            ..Self::default()
        }
    }

    /// Hold the first purge, after recording it, until `gate` is notified.
    pub fn gated_purge(gate: Arc<Notify>) -> Self {
        Self {
            purge_gate: Mutex::new(Some(gate)),
            ..Self::default()
        }
    }

    pub fn purges(&self) -> usize {
        self.purges.lock().unwrap().len()
    }

    pub fn published(&self) -> Vec<(SessionId, Vec<PresentableItem>)> {
        self.added.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PresentationConnector for RecordingPresenter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn purge_service_items(
        &self,
        session_id: &SessionId,
        service: &str,
    ) -> Result<(), PresentationError> {
        self.purges
            .lock()
            .unwrap()
            .push((session_id.clone(), service.to_string()));
        let gate = self.purge_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(())
    }

    async fn add_service_items(
        &self,
        session_id: &SessionId,
        items: &[PresentableItem],
    ) -> Result<(), PresentationError> {
        if self.fail_add {
            return Err(PresentationError::AddFailed {
                session_id: session_id.to_string(),
                reason: "connector offline".into(),
            });
        }
        self.added
            .lock()
            .unwrap()
            .push((session_id.clone(), items.to_vec()));
        Ok(())
    }
}

/// A pipeline wired to scripted collaborators.
pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub graph: Arc<ScriptedGraph>,
    pub profiles: Arc<FixedProfiles>,
    pub presenter: Arc<RecordingPresenter>,
    pub event_bus: Arc<EventBus>,
}

impl Harness {
    pub fn new(graph: ScriptedGraph) -> Self {
        Self::build(graph, FixedProfiles::new(scenario_profile()), RecordingPresenter::new())
    }

    pub fn with_presenter(graph: ScriptedGraph, presenter: RecordingPresenter) -> Self {
        Self::build(graph, FixedProfiles::new(scenario_profile()), presenter)
    }

    pub fn with_profiles(graph: ScriptedGraph, profiles: FixedProfiles) -> Self {
        Self::build(graph, profiles, RecordingPresenter::new())
    }

    fn build(graph: ScriptedGraph, profiles: FixedProfiles, presenter: RecordingPresenter) -> Self {
        let graph = Arc::new(graph);
        let profiles = Arc::new(profiles);
        let presenter = Arc::new(presenter);
        let event_bus = Arc::new(EventBus::default());
        let pipeline = Arc::new(Pipeline::new(
            &AppConfig::default(),
            graph.clone(),
            profiles.clone(),
            presenter.clone(),
            event_bus.clone(),
        ));
        Self {
            pipeline,
            graph,
            profiles,
            presenter,
            event_bus,
        }
    }
}
