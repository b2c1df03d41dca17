//! Response interpreters: pull each stage's result out of a result set.
//!
//! Rows missing a required variable are skipped. A missing preview is never
//! an error; the caller's default preview stands in.

use std::collections::BTreeSet;

use learnflow_core::{ContentCandidates, ResultSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::queries::{
    CONTENT_VAR, DEVICE_VAR, LABELLED_VAR, LABEL_VAR, PREVIEW_VAR, STATE_TYPE_VAR, STATE_VAR,
    STATION_VAR,
};
use crate::sparql::bracket;

/// An operating state observed on a station.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalState {
    /// Bracketed state identifier
    pub state: String,
    /// Bracketed station identifier
    pub station: String,
    /// State class the query was scoped to
    pub state_type: String,
}

/// Equipment identifiers from a stations or machines query.
pub fn devices(results: &ResultSet) -> BTreeSet<String> {
    results.values(DEVICE_VAR).map(str::to_string).collect()
}

/// Operating states with their provenance, in result order.
pub fn local_states(results: &ResultSet) -> Vec<LocalState> {
    results
        .rows
        .iter()
        .filter_map(|row| {
            let state = row.get(STATE_VAR)?;
            let station = row.get(STATION_VAR)?;
            let state_type = row.get(STATE_TYPE_VAR)?;
            Some(LocalState {
                state: bracket(state),
                station: bracket(station),
                state_type: state_type.clone(),
            })
        })
        .collect()
}

/// Content candidates in result order, defaulting absent previews.
pub fn content_candidates(results: &ResultSet, default_preview: &str) -> ContentCandidates {
    let mut candidates = ContentCandidates::new();
    for row in &results.rows {
        let Some(content_id) = row.get(CONTENT_VAR) else {
            debug!("Result row without content identifier, skipping");
            continue;
        };
        let preview = row
            .get(PREVIEW_VAR)
            .filter(|p| !p.is_empty())
            .map(String::as_str)
            .unwrap_or(default_preview);
        candidates.insert(content_id.as_str(), preview);
    }
    candidates
}

/// `(identifier, label)` pairs from a label query.
pub fn labels(results: &ResultSet) -> Vec<(String, String)> {
    results
        .rows
        .iter()
        .filter_map(|row| Some((row.get(LABELLED_VAR)?.clone(), row.get(LABEL_VAR)?.clone())))
        .collect()
}
