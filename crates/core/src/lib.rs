//! # learnflow Core
//!
//! Domain types, collaborator traits, and error definitions for the learnflow
//! recommendation service. This crate has **no transport dependencies**: it
//! defines the domain model that every other crate implements against.
//!
//! ## Collaborators
//!
//! Every external service the recommendation pipeline talks to is a trait here:
//! - [`GraphStore`]: runs knowledge-graph queries
//! - [`SessionResolver`]: resolves a session token to a user identity
//! - [`ProfileService`]: resolves a user identity to role, groups and goals
//! - [`PresentationConnector`]: displays the final recommendation list
//!
//! Implementations live in `learnflow-connectors`; tests use scripted mocks.

pub mod candidate;
pub mod error;
pub mod event;
pub mod graph;
pub mod presentation;
pub mod profile;
pub mod session;
pub mod trigger;

// Re-export key types at crate root for ergonomics
pub use candidate::{ContentCandidate, ContentCandidates};
pub use error::{Error, Result};
pub use event::{EventBus, PipelineEvent, Stage};
pub use graph::{BindingRow, GraphStore, ResultSet};
pub use presentation::{LaunchAction, PresentableItem, PresentationConnector};
pub use profile::{DevelopmentGoals, ProfileService, UserProfile};
pub use session::{Session, SessionId, SessionResolver};
pub use trigger::{Activity, Trigger};
