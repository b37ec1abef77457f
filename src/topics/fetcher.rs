//! Recursive topic-tree walks over the remote topic API.
//!
//! Every walk shares one processed set across all branches (and all roots, in
//! multi-root mode). A node already in the set is skipped, which both
//! deduplicates topics reachable from several parents and terminates cycles.
//!
//! Branch failures are tolerated: a subtopic listing that 404s is a leaf, and
//! any other error is logged and the branch treated as childless. Only failures
//! at the top of a walk (no roots, target root missing) surface as
//! [`FetchError`].

use super::model::Topic;
use super::registry::{Subtopic, SubtopicRegistry};
use crate::topic_api::{TopicApi, TopicApiError, TopicSummary};
use crate::upstream::UpstreamHeaders;
use crate::utils::fmt_duration;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// ID of the synthetic topic that parents the merged data-topic tree.
pub const DATA_TOPIC_ROOT_ID: &str = "root";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to list root topics")]
    RootTopics(#[source] TopicApiError),
    #[error("topic API returned no root topics")]
    NoRootTopics,
    #[error("root topic {0} not found")]
    RootNotFound(String),
}

/// How a single-root walk picks its root among the top-level topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSelector {
    Id(String),
    Title(String),
}

impl RootSelector {
    fn matches(&self, topic: &TopicSummary) -> bool {
        match self {
            RootSelector::Id(id) => topic.id == *id,
            RootSelector::Title(title) => topic.title == *title,
        }
    }
}

impl std::fmt::Display for RootSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootSelector::Id(id) => write!(f, "id={id}"),
            RootSelector::Title(title) => write!(f, "title={title}"),
        }
    }
}

/// Where a walk records each newly processed topic.
enum Sink<'s> {
    /// Hand off to a collector task. The send waits until the collector has room.
    Channel(&'s mpsc::Sender<Subtopic>),
    Collect(&'s mut Vec<Subtopic>),
}

impl Sink<'_> {
    /// Returns `false` once the receiving side is gone.
    async fn record(&mut self, subtopic: Subtopic) -> bool {
        match self {
            Sink::Channel(tx) => tx.send(subtopic).await.is_ok(),
            Sink::Collect(items) => {
                items.push(subtopic);
                true
            }
        }
    }
}

/// Builds topic trees from the remote topic API.
#[derive(Clone)]
pub struct TopicTreeFetcher {
    api: Arc<dyn TopicApi>,
    headers: UpstreamHeaders,
}

impl TopicTreeFetcher {
    pub fn new(api: Arc<dyn TopicApi>, headers: UpstreamHeaders) -> Self {
        Self { api, headers }
    }

    async fn root_topics(&self) -> Result<Vec<TopicSummary>, FetchError> {
        let roots = self
            .api
            .get_root_topics(&self.headers)
            .await
            .map_err(FetchError::RootTopics)?;
        if roots.is_empty() {
            return Err(FetchError::NoRootTopics);
        }
        Ok(roots)
    }

    /// Walk the subtree of the one root matching `selector`.
    ///
    /// A walker task fetches subtopics depth-first and hands each discovered
    /// topic to a collector task over a single-slot channel; the collector owns
    /// all registry writes. The returned topic's registry includes the root.
    pub async fn fetch_root_subtree(&self, selector: &RootSelector) -> Result<Topic, FetchError> {
        let start = Instant::now();
        let roots = self.root_topics().await?;
        let listed = roots
            .into_iter()
            .find(|t| selector.matches(t))
            .ok_or_else(|| FetchError::RootNotFound(selector.to_string()))?;

        let root = match self.api.get_topic(&self.headers, &listed.id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(topic_id = %listed.id, error = %e, "Failed to fetch root topic detail, using listing");
                listed
            }
        };

        let registry = SubtopicRegistry::new();
        let (tx, mut rx) = mpsc::channel::<Subtopic>(1);

        let collector = tokio::spawn({
            let registry = registry.clone();
            async move {
                while let Some(subtopic) = rx.recv().await {
                    registry.append_subtopic_id(subtopic.id.clone(), subtopic);
                }
            }
        });

        let walker = tokio::spawn({
            let api = self.api.clone();
            let headers = self.headers.clone();
            let root = root.clone();
            async move {
                let mut processed = HashSet::new();
                let mut sink = Sink::Channel(&tx);
                walk(api.as_ref(), &headers, root, String::new(), 0, &mut processed, &mut sink)
                    .await;
            }
        });

        let (walked, collected) = tokio::join!(walker, collector);
        if let Err(e) = walked {
            error!(topic_id = %root.id, error = ?e, "Topic walker task failed");
        }
        if let Err(e) = collected {
            error!(topic_id = %root.id, error = ?e, "Topic collector task failed");
        }

        let mut topic = Topic {
            id: root.id,
            slug: root.slug,
            localise_key_name: root.title,
            release_date: root.release_date,
            parent_id: String::new(),
            subtopics: registry,
            query: String::new(),
        };
        topic.refresh_query();

        info!(
            topic_id = %topic.id,
            topics = topic.subtopics.len(),
            elapsed = fmt_duration(start.elapsed()),
            "Topic subtree fetched"
        );
        Ok(topic)
    }

    /// Walk every root with one shared processed set, in discovery order.
    async fn walk_all_roots(&self) -> Result<Vec<Subtopic>, FetchError> {
        let roots = self.root_topics().await?;
        let mut processed = HashSet::new();
        let mut found = Vec::new();
        {
            let mut sink = Sink::Collect(&mut found);
            for root in roots {
                walk(
                    self.api.as_ref(),
                    &self.headers,
                    root,
                    String::new(),
                    0,
                    &mut processed,
                    &mut sink,
                )
                .await;
            }
        }
        Ok(found)
    }

    /// Walk every root and merge all topics into one registry under a
    /// synthetic [`DATA_TOPIC_ROOT_ID`] topic.
    pub async fn fetch_data_topics(&self) -> Result<Topic, FetchError> {
        let start = Instant::now();
        let found = self.walk_all_roots().await?;

        let registry = SubtopicRegistry::new();
        for subtopic in found {
            registry.append_subtopic_id(subtopic.id.clone(), subtopic);
        }

        let mut topic = Topic {
            id: DATA_TOPIC_ROOT_ID.to_owned(),
            slug: DATA_TOPIC_ROOT_ID.to_owned(),
            localise_key_name: "Root".to_owned(),
            subtopics: registry,
            ..Default::default()
        };
        topic.refresh_query();

        info!(
            topics = topic.subtopics.len(),
            elapsed = fmt_duration(start.elapsed()),
            "Data topic tree fetched"
        );
        Ok(topic)
    }

    /// Walk every root and return one flat [`Topic`] per distinct node.
    ///
    /// Each entry carries its parent ID and a single-entry registry, so its
    /// `query` is just its own ID.
    pub async fn fetch_data_topic_list(&self) -> Result<Vec<Topic>, FetchError> {
        let start = Instant::now();
        let found = self.walk_all_roots().await?;

        let topics: Vec<Topic> = found
            .into_iter()
            .map(|subtopic| {
                let registry = SubtopicRegistry::new();
                registry.append_subtopic_id(subtopic.id.clone(), subtopic.clone());
                Topic {
                    query: subtopic.id.clone(),
                    id: subtopic.id,
                    slug: subtopic.slug,
                    localise_key_name: subtopic.localise_key_name,
                    release_date: subtopic.release_date,
                    parent_id: subtopic.parent_id,
                    subtopics: registry,
                }
            })
            .collect();

        debug!(
            topics = topics.len(),
            elapsed = fmt_duration(start.elapsed()),
            "Data topic list fetched"
        );
        Ok(topics)
    }
}

/// Process one node: skip it if already processed, otherwise record it and
/// recurse into its children. Returns `false` if the sink closed and the walk
/// should stop.
fn walk<'a, 's>(
    api: &'a dyn TopicApi,
    headers: &'a UpstreamHeaders,
    node: TopicSummary,
    parent_id: String,
    depth: usize,
    processed: &'a mut HashSet<String>,
    sink: &'a mut Sink<'s>,
) -> BoxFuture<'a, bool> {
    Box::pin(async move {
        if !processed.insert(node.id.clone()) {
            debug!(topic_id = %node.id, parent_id = %parent_id, depth, "Topic already processed, skipping");
            return true;
        }

        let recorded = sink
            .record(Subtopic {
                id: node.id.clone(),
                slug: node.slug.clone(),
                localise_key_name: node.title.clone(),
                release_date: node.release_date.clone(),
                parent_id,
            })
            .await;
        if !recorded {
            warn!(topic_id = %node.id, "Topic collector closed, abandoning walk");
            return false;
        }

        for child in children_of(api, headers, &node, depth).await {
            if !walk(api, headers, child, node.id.clone(), depth + 1, processed, sink).await {
                return false;
            }
        }
        true
    })
}

/// List a node's children, treating any failure as "no children".
async fn children_of(
    api: &dyn TopicApi,
    headers: &UpstreamHeaders,
    node: &TopicSummary,
    depth: usize,
) -> Vec<TopicSummary> {
    if !node.has_subtopics() {
        return Vec::new();
    }
    match api.get_subtopics(headers, &node.id).await {
        Ok(items) => items,
        Err(e) if e.is_not_found() => {
            trace!(topic_id = %node.id, depth, "No subtopics found");
            Vec::new()
        }
        Err(e) => {
            warn!(topic_id = %node.id, depth, error = %e, "Failed to fetch subtopics, treating as leaf");
            Vec::new()
        }
    }
}
