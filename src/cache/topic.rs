//! Topic caches and the refresh functions that populate them.
//!
//! Refresh functions here never fail: a walk that cannot produce a tree logs
//! the reason and stores the empty sentinel, so the search page degrades to an
//! empty topic filter instead of erroring.

use super::polling::{CacheError, PollingCache};
use crate::topics::fetcher::{RootSelector, TopicTreeFetcher};
use crate::topics::model::Topic;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const CENSUS_TOPIC_KEY: &str = "census-topic";
pub const DATA_TOPIC_ROOT_KEY: &str = "data-topic-root";
pub const DATA_TOPIC_LIST_KEY: &str = "data-topic-list";

/// Single topic trees (census subtree, merged data-topic tree).
pub type TopicCache = PollingCache<Arc<Topic>>;
/// Flat per-node data-topic list.
pub type TopicListCache = PollingCache<Arc<Vec<Topic>>>;

pub fn new_topic_cache(interval: Option<Duration>) -> Result<TopicCache, CacheError> {
    PollingCache::new("topic", interval)
}

pub fn new_topic_list_cache(interval: Option<Duration>) -> Result<TopicListCache, CacheError> {
    PollingCache::new("topic-list", interval)
}

/// Register the census subtree (root selected by `census_topic_id`) under [`CENSUS_TOPIC_KEY`].
pub fn register_census_topic(cache: &TopicCache, fetcher: TopicTreeFetcher, census_topic_id: String) {
    let selector = RootSelector::Id(census_topic_id);
    cache.register_refresh_fn(CENSUS_TOPIC_KEY, move || {
        let fetcher = fetcher.clone();
        let selector = selector.clone();
        async move {
            match fetcher.fetch_root_subtree(&selector).await {
                Ok(topic) => Ok(Arc::new(topic)),
                Err(e) => {
                    warn!(root = %selector, error = ?e, "Census topic unavailable, caching empty topic");
                    Ok(Arc::default())
                }
            }
        }
    });
}

/// Register the merged tree of every data topic under [`DATA_TOPIC_ROOT_KEY`].
pub fn register_data_topics(cache: &TopicCache, fetcher: TopicTreeFetcher) {
    cache.register_refresh_fn(DATA_TOPIC_ROOT_KEY, move || {
        let fetcher = fetcher.clone();
        async move {
            match fetcher.fetch_data_topics().await {
                Ok(topic) => Ok(Arc::new(topic)),
                Err(e) => {
                    warn!(error = ?e, "Data topics unavailable, caching empty topic");
                    Ok(Arc::default())
                }
            }
        }
    });
}

/// Register the flat data-topic list under [`DATA_TOPIC_LIST_KEY`].
pub fn register_data_topic_list(cache: &TopicListCache, fetcher: TopicTreeFetcher) {
    cache.register_refresh_fn(DATA_TOPIC_LIST_KEY, move || {
        let fetcher = fetcher.clone();
        async move {
            match fetcher.fetch_data_topic_list().await {
                Ok(topics) => Ok(Arc::new(topics)),
                Err(e) => {
                    warn!(error = ?e, "Data topic list unavailable, caching empty list");
                    Ok(Arc::default())
                }
            }
        }
    });
}

/// Read a topic, falling back to the sentinel for unregistered keys.
pub fn topic_or_empty(cache: &TopicCache, key: &str) -> Arc<Topic> {
    cache.get(key).unwrap_or_default()
}
