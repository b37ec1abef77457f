#![allow(dead_code)]

use async_trait::async_trait;
use figment::Figment;
use search_controller::config::Config;
use search_controller::topic_api::{Navigation, NavigationItem, TopicApi, TopicApiError, TopicSummary};
use search_controller::upstream::UpstreamHeaders;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Build a topic as the API would list it.
pub fn topic(id: &str, title: &str, children: &[&str]) -> TopicSummary {
    TopicSummary {
        id: id.to_owned(),
        slug: title.to_lowercase().replace(' ', "-"),
        title: title.to_owned(),
        release_date: None,
        subtopic_ids: children.iter().map(|c| c.to_string()).collect(),
    }
}

/// In-memory topic API.
///
/// Children are looked up by parent ID; an unknown parent answers 404 like the
/// real API does for leaves.
#[derive(Default)]
pub struct FakeTopicApi {
    pub roots: Vec<TopicSummary>,
    pub children: HashMap<String, Vec<TopicSummary>>,
    pub navigation: HashMap<String, Navigation>,
    /// When set, every call fails with a 503.
    pub unavailable: AtomicBool,
    pub subtopic_calls: AtomicUsize,
    /// Parent IDs in the order their subtopics were requested.
    pub subtopic_log: Mutex<Vec<String>>,
    /// Root listings wait while a test holds the write side.
    pub gate: tokio::sync::RwLock<()>,
}

impl FakeTopicApi {
    pub fn with_roots(roots: Vec<TopicSummary>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }

    pub fn child(mut self, parent: &str, child: TopicSummary) -> Self {
        self.children.entry(parent.to_owned()).or_default().push(child);
        self
    }

    pub fn nav(mut self, lang: &str, labels: &[&str]) -> Self {
        let items = labels
            .iter()
            .map(|label| NavigationItem {
                label: label.to_string(),
                uri: format!("/{}", label.to_lowercase()),
                ..Default::default()
            })
            .collect();
        self.navigation.insert(
            lang.to_owned(),
            Navigation {
                items,
                ..Default::default()
            },
        );
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self, url: &str) -> Result<(), TopicApiError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TopicApiError::Status {
                status: 503,
                url: url.to_owned(),
            });
        }
        Ok(())
    }

    pub fn subtopic_requests(&self) -> Vec<String> {
        self.subtopic_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopicApi for FakeTopicApi {
    async fn get_root_topics(
        &self,
        _headers: &UpstreamHeaders,
    ) -> Result<Vec<TopicSummary>, TopicApiError> {
        let _open = self.gate.read().await;
        self.check("/topics")?;
        Ok(self.roots.clone())
    }

    async fn get_subtopics(
        &self,
        _headers: &UpstreamHeaders,
        topic_id: &str,
    ) -> Result<Vec<TopicSummary>, TopicApiError> {
        self.check(&format!("/topics/{topic_id}/subtopics"))?;
        self.subtopic_calls.fetch_add(1, Ordering::SeqCst);
        self.subtopic_log.lock().unwrap().push(topic_id.to_owned());
        self.children
            .get(topic_id)
            .cloned()
            .ok_or_else(|| TopicApiError::NotFound(topic_id.to_owned()))
    }

    async fn get_topic(
        &self,
        _headers: &UpstreamHeaders,
        topic_id: &str,
    ) -> Result<TopicSummary, TopicApiError> {
        self.check(&format!("/topics/{topic_id}"))?;
        self.roots
            .iter()
            .chain(self.children.values().flatten())
            .find(|t| t.id == topic_id)
            .cloned()
            .ok_or_else(|| TopicApiError::NotFound(topic_id.to_owned()))
    }

    async fn get_navigation(
        &self,
        _headers: &UpstreamHeaders,
        lang: &str,
    ) -> Result<Navigation, TopicApiError> {
        self.check(&format!("/navigation?lang={lang}"))?;
        self.navigation
            .get(lang)
            .cloned()
            .ok_or_else(|| TopicApiError::NotFound(lang.to_owned()))
    }
}

pub fn ids<I: IntoIterator<Item = String>>(ids: I) -> HashSet<String> {
    ids.into_iter().collect()
}

pub fn set_of(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Config with defaults for every key `set` leaves alone.
///
/// ```ignore
/// let config = config(|f| f.merge(Serialized::default("is_publishing", true)));
/// ```
pub fn config(set: impl FnOnce(Figment) -> Figment) -> Config {
    Config::from_figment(set(Figment::new())).unwrap()
}

/// The census hierarchy used across tests:
///
/// ```text
/// 1234 Census ─┬─ 5678 Housing ── 8901 Ethnicity
///              └─ 1235 Tenure
/// 1458 Economy
/// ```
pub fn census_api() -> FakeTopicApi {
    FakeTopicApi::with_roots(vec![
        topic("1234", "Census", &["5678", "1235"]),
        topic("1458", "Economy", &[]),
    ])
    .child("1234", topic("5678", "Housing", &["8901"]))
    .child("1234", topic("1235", "Tenure", &[]))
    .child("5678", topic("8901", "Ethnicity", &[]))
}
