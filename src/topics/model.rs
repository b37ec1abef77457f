use super::registry::{Subtopic, SubtopicRegistry};

/// A materialised topic subtree, as stored in the topic caches.
///
/// `Topic::default()` is the empty sentinel: caches hold it before the first
/// refresh and after a failed fetch, so readers never deal with a missing value.
#[derive(Debug, Clone, Default)]
pub struct Topic {
    pub id: String,
    pub slug: String,
    /// Display title.
    pub localise_key_name: String,
    pub release_date: Option<String>,
    /// Empty for roots.
    pub parent_id: String,
    pub subtopics: SubtopicRegistry,
    /// Comma-joined IDs of every entry in `subtopics`.
    pub query: String,
}

impl Topic {
    /// Regenerate `query` from the registry's current contents.
    pub fn refresh_query(&mut self) {
        self.query = self.subtopics.ids_query();
    }

    /// True for the sentinel, or any topic that was never populated.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.subtopics.is_empty()
    }

    /// The topic's own entry, as it would appear in a parent's registry.
    pub fn as_subtopic(&self) -> Subtopic {
        Subtopic {
            id: self.id.clone(),
            slug: self.slug.clone(),
            localise_key_name: self.localise_key_name.clone(),
            release_date: self.release_date.clone(),
            parent_id: self.parent_id.clone(),
        }
    }
}
