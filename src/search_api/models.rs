use serde::{Deserialize, Serialize};

/// Parameters sent to the search API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub limit: u32,
    pub offset: u32,
    pub sort: String,
    pub content_types: Vec<String>,
    /// Comma-joined topic IDs.
    pub topics: Option<String>,
}

impl SearchQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.q.clone()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("sort", self.sort.clone()),
        ];
        if !self.content_types.is_empty() {
            pairs.push(("content_type", self.content_types.join(",")));
        }
        if let Some(topics) = self.topics.as_ref().filter(|t| !t.is_empty()) {
            pairs.push(("topics", topics.clone()));
        }
        pairs
    }

    /// The same search without content-type restriction and without results,
    /// used to count every content type for the filter panel.
    pub fn counts_only(&self) -> Self {
        Self {
            limit: 0,
            offset: 0,
            content_types: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub content_types: Vec<FacetCount>,
    #[serde(default)]
    pub topics: Vec<FacetCount>,
}

impl SearchResponse {
    pub fn content_type_count(&self, content_type: &str) -> u64 {
        self.content_types
            .iter()
            .filter(|f| f.kind == content_type)
            .map(|f| f.count)
            .sum()
    }

    pub fn topic_count(&self, topic_id: &str) -> u64 {
        self.topics
            .iter()
            .filter(|f| f.kind == topic_id)
            .map(|f| f.count)
            .sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
}
