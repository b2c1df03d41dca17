//! Candidate ordering extension point.
//!
//! Runs after the secondary-branch merge stages and before labels. The
//! intended ordering puts unread mandatory content first, then unread, then
//! read content, using read state from the user model. Until that source
//! exists the default keeps merge order.

use async_trait::async_trait;
use learnflow_core::{ContentCandidates, Result, SessionId};

#[async_trait]
pub trait CandidateOrdering: Send + Sync {
    fn name(&self) -> &str;

    /// Reorder the accumulated candidates for a session.
    async fn order(
        &self,
        session_id: &SessionId,
        mandated: &[String],
        candidates: ContentCandidates,
    ) -> Result<ContentCandidates>;
}

/// Keeps candidates in the order they were merged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughOrdering;

#[async_trait]
impl CandidateOrdering for PassthroughOrdering {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn order(
        &self,
        _session_id: &SessionId,
        _mandated: &[String],
        candidates: ContentCandidates,
    ) -> Result<ContentCandidates> {
        Ok(candidates)
    }
}
