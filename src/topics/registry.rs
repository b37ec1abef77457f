//! Lock-guarded map of every topic discovered during a tree walk.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A topic as recorded in a [`SubtopicRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtopic {
    pub id: String,
    pub slug: String,
    pub localise_key_name: String,
    pub release_date: Option<String>,
    /// Empty for roots.
    pub parent_id: String,
}

/// Thread-safe `topic id → Subtopic` map.
///
/// Clones share the same underlying map, so the collector task in a tree walk
/// and the `Topic` that ends up in the cache see the same entries. Duplicate
/// inserts overwrite; the walk's processed set is what keeps an ID from being
/// recorded twice.
#[derive(Debug, Clone, Default)]
pub struct SubtopicRegistry {
    inner: Arc<RwLock<HashMap<String, Subtopic>>>,
}

impl SubtopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `id`.
    pub fn append_subtopic_id(&self, id: impl Into<String>, subtopic: Subtopic) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(id.into(), subtopic);
    }

    pub fn get(&self, id: &str) -> Option<Subtopic> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(id).cloned()
    }

    pub fn check_id_exists(&self, id: &str) -> bool {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.contains_key(id)
    }

    /// Comma-joined list of every held ID, for use as an unordered search filter.
    ///
    /// Ordering follows map iteration and is not stable across calls that
    /// write in between. Callers needing a stable order must sort.
    pub fn ids_query(&self) -> String {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.keys().map(String::as_str).collect::<Vec<_>>().join(",")
    }

    /// Snapshot of every held ID.
    pub fn ids(&self) -> Vec<String> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.keys().cloned().collect()
    }

    /// Snapshot of every held entry.
    pub fn subtopics(&self) -> Vec<Subtopic> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn subtopic(id: &str, parent: &str) -> Subtopic {
        Subtopic {
            id: id.to_owned(),
            slug: format!("slug-{id}"),
            localise_key_name: format!("Topic {id}"),
            release_date: None,
            parent_id: parent.to_owned(),
        }
    }

    fn id_set(query: &str) -> HashSet<String> {
        query
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn default_registry_is_usable() {
        let registry = SubtopicRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.ids_query(), "");

        registry.append_subtopic_id("1", subtopic("1", ""));
        assert!(registry.check_id_exists("1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_insert_overwrites() {
        let registry = SubtopicRegistry::new();
        registry.append_subtopic_id("1", subtopic("1", ""));
        registry.append_subtopic_id("1", subtopic("1", "9"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("1").unwrap().parent_id, "9");
    }

    #[test]
    fn missing_id() {
        let registry = SubtopicRegistry::new();
        assert!(registry.get("404").is_none());
        assert!(!registry.check_id_exists("404"));
    }

    #[test]
    fn ids_query_is_stable_without_writes() {
        let registry = SubtopicRegistry::new();
        for id in ["1", "2", "3", "4"] {
            registry.append_subtopic_id(id, subtopic(id, ""));
        }

        let first = id_set(&registry.ids_query());
        let second = id_set(&registry.ids_query());
        assert_eq!(first, second);
        assert_eq!(first, id_set("1,2,3,4"));
    }

    #[test]
    fn clones_share_entries() {
        let registry = SubtopicRegistry::new();
        let handle = registry.clone();
        handle.append_subtopic_id("7", subtopic("7", ""));
        assert!(registry.check_id_exists("7"));
    }

    #[test]
    fn concurrent_writers() {
        let registry = SubtopicRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("{t}-{i}");
                        registry.append_subtopic_id(id.clone(), subtopic(&id, ""));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }
}
