//! Wire formats of the topic API and their normalised forms.

use serde::{Deserialize, Serialize};

/// A topic as served by the public topic API.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicDto {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub subtopic_ids: Option<Vec<String>>,
}

/// Publishing-mode envelope carrying the live and the draft version of a topic.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicEnvelope {
    pub id: String,
    #[serde(default)]
    pub current: Option<TopicDto>,
    #[serde(default)]
    pub next: Option<TopicDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublicTopicList {
    #[serde(default)]
    pub items: Option<Vec<TopicDto>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PrivateTopicList {
    #[serde(default)]
    pub items: Option<Vec<TopicEnvelope>>,
}

/// The fields of a topic the rest of the service works with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub release_date: Option<String>,
    pub subtopic_ids: Vec<String>,
}

impl TopicSummary {
    pub fn has_subtopics(&self) -> bool {
        !self.subtopic_ids.is_empty()
    }
}

impl From<TopicDto> for TopicSummary {
    fn from(dto: TopicDto) -> Self {
        Self {
            id: dto.id,
            slug: dto.slug,
            title: dto.title,
            release_date: dto.release_date,
            subtopic_ids: dto.subtopic_ids.unwrap_or_default(),
        }
    }
}

impl TopicEnvelope {
    /// Normalise to the `current` version. Topics that were never published
    /// have no `current` and are skipped.
    pub fn into_current(self) -> Option<TopicSummary> {
        let mut current = self.current?;
        if current.id.is_empty() {
            current.id = self.id;
        }
        Some(current.into())
    }
}

/// Navigation bar payload for one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<NavigationItem>,
}

impl Navigation {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationItem {
    pub uri: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localise_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_items: Option<Vec<NavigationItem>>,
}
