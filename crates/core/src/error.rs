//! Error types for the learnflow domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum.

use thiserror::Error;

/// The top-level error type for all learnflow operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Knowledge graph ---
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    // --- Session resolution ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- User profile ---
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    // --- Presentation connector ---
    #[error("Presentation error: {0}")]
    Presentation(#[from] PresentationError),

    // --- Pipeline bookkeeping ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("Graph request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed result set: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed session payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error("Profile service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed profile field '{field}': {reason}")]
    Malformed { field: String, reason: String },

    #[error("Profile field missing: {0}")]
    MissingField(String),
}

#[derive(Debug, Clone, Error)]
pub enum PresentationError {
    #[error("Purging items for {session_id} failed: {reason}")]
    PurgeFailed { session_id: String, reason: String },

    #[error("Adding items for {session_id} failed: {reason}")]
    AddFailed { session_id: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Run {generation} for session {session_id} was superseded")]
    Stale { session_id: String, generation: u64 },

    #[error("No user known for session {0}")]
    UnknownUser(String),
}

impl Error {
    /// Whether this error only means a newer run took over the session.
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Pipeline(PipelineError::Stale { .. }))
    }
}
