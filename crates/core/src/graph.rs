//! Knowledge graph trait: the abstraction over the query service.
//!
//! The graph service accepts a query string and answers with a result set:
//! a sequence of rows, each binding variable names to string values. The
//! query language and storage behind it are not our concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::GraphError;

/// One result row: variable name to bound value.
pub type BindingRow = HashMap<String, String>;

/// The rows returned for a single query, in service order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub rows: Vec<BindingRow>,
}

impl ResultSet {
    pub fn new(rows: Vec<BindingRow>) -> Self {
        Self { rows }
    }

    /// Build a result set from `(variable, value)` pairs per row.
    pub fn from_pairs<'a, R>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    /// Parse a SPARQL JSON results document (`results.bindings[].var.value`).
    ///
    /// Entries that are not objects are skipped; bindings without a `value`
    /// are left out of their row.
    pub fn from_sparql_json(doc: &serde_json::Value) -> Result<Self, GraphError> {
        let bindings = doc
            .get("results")
            .and_then(|r| r.get("bindings"))
            .and_then(|b| b.as_array())
            .ok_or_else(|| GraphError::MalformedResponse("missing results.bindings".into()))?;

        let mut rows = Vec::with_capacity(bindings.len());
        for entry in bindings {
            let Some(object) = entry.as_object() else {
                debug!(found = %entry, "Expected binding object, skipping");
                continue;
            };
            let row: BindingRow = object
                .iter()
                .filter_map(|(var, binding)| {
                    binding
                        .get("value")
                        .and_then(|v| v.as_str())
                        .map(|v| (var.clone(), v.to_string()))
                })
                .collect();
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate the values bound to `var`, skipping rows that lack it.
    pub fn values<'a>(&'a self, var: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows
            .iter()
            .filter_map(move |row| row.get(var).map(String::as_str))
    }
}

/// The core graph query trait.
///
/// Implementations: HTTP bridge (`learnflow-connectors`), scripted mocks in tests.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// The backend name (e.g., "http", "scripted").
    fn name(&self) -> &str;

    /// Run one query and return its result set.
    async fn run_query(&self, query: &str) -> std::result::Result<ResultSet, GraphError>;
}
