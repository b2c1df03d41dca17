//! Session context store.
//!
//! One owned [`SessionContext`] per session, guarded by a single async
//! `RwLock`. Every run holds a [`RunTicket`] carrying the generation it was
//! started under; commits from a ticket whose generation is no longer current
//! are refused, so the most recent trigger always wins. Publishing is
//! serialised per session with a separate lock, so a run suspended at the
//! presentation connector cannot interleave with a newer run's publish.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use learnflow_core::error::PipelineError;
use learnflow_core::{ContentCandidates, DevelopmentGoals, SessionId, UserProfile};
use learnflow_graph::LocalState;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Everything known about one session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user_id: Option<String>,
    /// Token last presented for this session
    pub token: Option<String>,

    pub role: String,
    pub workplace_groups: BTreeSet<String>,
    pub development_goals: BTreeSet<String>,
    pub goals_detail: DevelopmentGoals,

    pub stations: BTreeSet<String>,
    pub machines: BTreeSet<String>,
    pub operating_states: BTreeSet<String>,
    /// State/station/type tuples behind `operating_states`
    pub local_states: Vec<LocalState>,

    pub in_secondary_activity: bool,

    /// Secondary-branch accumulator; survives re-entry
    pub side_content_preview: ContentCandidates,

    generation: u64,
}

impl SessionContext {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn apply_profile(&mut self, profile: UserProfile) {
        self.role = profile.role;
        self.workplace_groups = profile.workplace_groups;
        self.development_goals = profile.development_goals;
        self.goals_detail = profile.goals_detail;
    }
}

/// Handle for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub session_id: SessionId,
    pub generation: u64,
    /// Branch selected when the trigger arrived
    pub secondary: bool,
    /// Correlates log lines of one run
    pub run_id: Uuid,
}

/// Concurrency-safe map of session contexts.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionContext>>,
    publish_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run: bump the generation and capture the branch flag.
    ///
    /// Creates the context on first use.
    pub async fn begin_run(&self, session_id: &SessionId) -> RunTicket {
        let mut sessions = self.sessions.write().await;
        let ctx = sessions.entry(session_id.clone()).or_default();
        ctx.generation += 1;
        RunTicket {
            session_id: session_id.clone(),
            generation: ctx.generation,
            secondary: ctx.in_secondary_activity,
            run_id: Uuid::new_v4(),
        }
    }

    /// Record who owns a session. Last write wins.
    pub async fn set_user(&self, session_id: &SessionId, user_id: &str, token: Option<&str>) {
        let mut sessions = self.sessions.write().await;
        let ctx = sessions.entry(session_id.clone()).or_default();
        if ctx.user_id.as_deref() != Some(user_id) {
            debug!(session_id = %session_id, user_id, "Session owner updated");
        }
        ctx.user_id = Some(user_id.to_string());
        if let Some(token) = token {
            ctx.token = Some(token.to_string());
        }
    }

    /// Select the branch for the session's next run.
    pub async fn set_activity(&self, session_id: &SessionId, secondary: bool) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.clone())
            .or_default()
            .in_secondary_activity = secondary;
    }

    /// Apply `update` if the ticket is still current.
    pub async fn commit<F, R>(&self, ticket: &RunTicket, update: F) -> Result<R, PipelineError>
    where
        F: FnOnce(&mut SessionContext) -> R,
    {
        let mut sessions = self.sessions.write().await;
        let ctx = current(&mut sessions, ticket)?;
        Ok(update(ctx))
    }

    /// Read from the context if the ticket is still current.
    pub async fn read<F, R>(&self, ticket: &RunTicket, view: F) -> Result<R, PipelineError>
    where
        F: FnOnce(&SessionContext) -> R,
    {
        let mut sessions = self.sessions.write().await;
        let ctx = current(&mut sessions, ticket)?;
        Ok(view(ctx))
    }

    /// Fail with [`PipelineError::Stale`] unless the ticket is current.
    pub async fn ensure_current(&self, ticket: &RunTicket) -> Result<(), PipelineError> {
        self.read(ticket, |_| ()).await
    }

    /// Exclusive right to publish for a session, held until the guard drops.
    pub async fn publish_guard(&self, session_id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.publish_locks.lock().await;
            locks.entry(session_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// A copy of the session's context.
    pub async fn snapshot(&self, session_id: &SessionId) -> Option<SessionContext> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Sessions with a known owner: `(session, user, token)`.
    pub async fn sessions_with_user(&self) -> Vec<(SessionId, String, Option<String>)> {
        let sessions = self.sessions.read().await;
        let mut known: Vec<_> = sessions
            .iter()
            .filter_map(|(id, ctx)| {
                ctx.user_id
                    .as_ref()
                    .map(|user| (id.clone(), user.clone(), ctx.token.clone()))
            })
            .collect();
        known.sort_by(|a, b| a.0.cmp(&b.0));
        known
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn current<'a>(
    sessions: &'a mut HashMap<SessionId, SessionContext>,
    ticket: &RunTicket,
) -> Result<&'a mut SessionContext, PipelineError> {
    match sessions.get_mut(&ticket.session_id) {
        Some(ctx) if ctx.generation == ticket.generation => Ok(ctx),
        _ => Err(PipelineError::Stale {
            session_id: ticket.session_id.to_string(),
            generation: ticket.generation,
        }),
    }
}
