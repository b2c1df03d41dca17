//! The learnflow recommendation pipeline.
//!
//! A trigger flows through the [`Dispatcher`], which records the session owner
//! and starts a run on the [`Pipeline`]. The pipeline refreshes the profile,
//! then runs either the main branch (stations, operating states, machines,
//! content) or the secondary branch (mandated content, item content, position
//! items, measure items, ordering). Both finish with label resolution through
//! the shared [`LabelCache`] and publish a list built by the [`ListBuilder`].
//!
//! Per-session state lives in the [`SessionStore`]; a generation counter makes
//! the most recent trigger for a session win over runs still in flight.

pub mod builder;
pub mod context;
pub mod dispatcher;
pub mod labels;
pub mod orchestrator;
pub mod ordering;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use builder::{ListBuilder, detect_mime_type};
pub use context::{RunTicket, SessionContext, SessionStore};
pub use dispatcher::Dispatcher;
pub use labels::LabelCache;
pub use orchestrator::{Pipeline, RunOutcome};
pub use ordering::{CandidateOrdering, PassthroughOrdering};
