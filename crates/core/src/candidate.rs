//! Content candidates: content identifiers paired with preview images.
//!
//! Candidates accumulate in insertion order, and that order becomes the
//! priority order of the published list. Re-inserting a known identifier
//! replaces its preview but keeps its position.

use std::collections::HashMap;

/// One `(content, preview)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCandidate {
    pub content_id: String,
    pub preview: String,
}

/// Insertion-ordered map from content identifier to preview image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentCandidates {
    entries: Vec<ContentCandidate>,
    index: HashMap<String, usize>,
}

impl ContentCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update. New identifiers go to the end.
    pub fn insert(&mut self, content_id: impl Into<String>, preview: impl Into<String>) {
        let content_id = content_id.into();
        let preview = preview.into();
        match self.index.get(&content_id) {
            Some(&pos) => self.entries[pos].preview = preview,
            None => {
                self.index.insert(content_id.clone(), self.entries.len());
                self.entries.push(ContentCandidate {
                    content_id,
                    preview,
                });
            }
        }
    }

    /// Merge a stage's result: new keys appended in their order, known keys
    /// updated in place.
    pub fn merge(&mut self, other: ContentCandidates) {
        for candidate in other.entries {
            self.insert(candidate.content_id, candidate.preview);
        }
    }

    pub fn get(&self, content_id: &str) -> Option<&str> {
        self.index
            .get(content_id)
            .map(|&pos| self.entries[pos].preview.as_str())
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.index.contains_key(content_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentCandidate> {
        self.entries.iter()
    }

    pub fn content_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.content_id.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ContentCandidates {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut candidates = Self::new();
        for (k, v) in iter {
            candidates.insert(k, v);
        }
        candidates
    }
}

impl IntoIterator for ContentCandidates {
    type Item = ContentCandidate;
    type IntoIter = std::vec::IntoIter<ContentCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_position_and_updates_preview() {
        let mut acc: ContentCandidates = [("A", "imgA")].into_iter().collect();
        let stage: ContentCandidates = [("A", "imgA2"), ("B", "imgB")].into_iter().collect();
        acc.merge(stage);

        assert_eq!(acc.content_ids().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(acc.get("A"), Some("imgA2"));
        assert_eq!(acc.get("B"), Some("imgB"));
    }

    #[test]
    fn insertion_order_is_kept() {
        let candidates: ContentCandidates =
            [("c3", "p"), ("c1", "p"), ("c2", "p"), ("c1", "q")].into_iter().collect();
        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates.content_ids().collect::<Vec<_>>(),
            vec!["c3", "c1", "c2"]
        );
        assert_eq!(candidates.get("c1"), Some("q"));
    }

    #[test]
    fn empty_by_default() {
        let candidates = ContentCandidates::new();
        assert!(candidates.is_empty());
        assert!(!candidates.contains("x"));
    }
}
