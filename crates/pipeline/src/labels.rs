//! Process-wide label cache.
//!
//! Maps content identifiers to display labels. Entries are only ever added,
//! never evicted. Static-scheme identifiers are keyed by their served path on
//! both insert and lookup, so the raw and rewritten forms share one entry.

use std::collections::HashMap;

use learnflow_config::ContentConfig;
use tokio::sync::RwLock;

pub struct LabelCache {
    labels: RwLock<HashMap<String, String>>,
    content: ContentConfig,
}

impl LabelCache {
    pub fn new(content: &ContentConfig) -> Self {
        Self {
            labels: RwLock::new(HashMap::new()),
            content: content.clone(),
        }
    }

    fn key(&self, content_id: &str) -> String {
        self.content.served_path(content_id)
    }

    /// The cached label for an identifier in either form.
    pub async fn label(&self, content_id: &str) -> Option<String> {
        self.labels.read().await.get(&self.key(content_id)).cloned()
    }

    /// Identifiers from `ids` that have no label yet, in input order.
    pub async fn missing<'a, I>(&self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let labels = self.labels.read().await;
        ids.into_iter()
            .filter(|id| !labels.contains_key(&self.key(id)))
            .map(str::to_string)
            .collect()
    }

    /// Labels for the given identifiers, keyed by the identifier as passed.
    pub async fn labels_for<'a, I>(&self, ids: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let labels = self.labels.read().await;
        ids.into_iter()
            .filter_map(|id| {
                labels
                    .get(&self.key(id))
                    .map(|label| (id.to_string(), label.clone()))
            })
            .collect()
    }

    /// Store a label. An existing label for the same key is replaced.
    pub async fn insert(&self, content_id: &str, label: impl Into<String>) {
        let key = self.key(content_id);
        self.labels.write().await.insert(key, label.into());
    }

    pub async fn len(&self) -> usize {
        self.labels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.labels.read().await.is_empty()
    }
}
