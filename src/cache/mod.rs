//! Background-refreshed caches read by every search request.

pub mod navigation;
pub mod polling;
pub mod topic;

pub use navigation::{NavigationCache, navigation_key, navigation_or_empty};
pub use polling::{CacheError, PollingCache, RefreshFn};
pub use topic::{
    CENSUS_TOPIC_KEY, DATA_TOPIC_LIST_KEY, DATA_TOPIC_ROOT_KEY, TopicCache, TopicListCache,
    topic_or_empty,
};

use crate::config::Config;
use crate::topic_api::TopicApi;
use crate::topics::fetcher::TopicTreeFetcher;
use crate::upstream::UpstreamHeaders;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Every cache the service keeps, with refresh functions registered per config.
#[derive(Clone)]
pub struct CacheList {
    pub topic: TopicCache,
    pub topic_list: TopicListCache,
    pub navigation: Option<NavigationCache>,
}

impl CacheList {
    /// Build the caches and register their refresh functions.
    ///
    /// Publishing instances keep the merged data-topic tree; public instances
    /// keep the flat per-topic list. The census subtree and navigation are
    /// feature-flagged.
    pub fn new(config: &Config, api: Arc<dyn TopicApi>) -> Result<Self, CacheError> {
        let interval = config.cache_update_interval;
        let headers = UpstreamHeaders::service(config.service_auth_token.clone());
        let fetcher = TopicTreeFetcher::new(api.clone(), headers.clone());

        let topic = topic::new_topic_cache(interval)?;
        let topic_list = topic::new_topic_list_cache(interval)?;

        if config.enable_census_topic_filter_option {
            topic::register_census_topic(&topic, fetcher.clone(), config.census_topic_id.clone());
        }
        if config.is_publishing {
            topic::register_data_topics(&topic, fetcher);
        } else {
            topic::register_data_topic_list(&topic_list, fetcher);
        }

        let navigation = if config.enable_new_navbar {
            let cache = navigation::new_navigation_cache(interval)?;
            navigation::register_navigation(&cache, api, headers, &config.supported_languages);
            Some(cache)
        } else {
            None
        };

        Ok(Self {
            topic,
            topic_list,
            navigation,
        })
    }

    /// Run the first refresh pass of every cache concurrently and wait for
    /// all of them. Any failure is fatal; the failing cache has closed itself.
    pub async fn initial_refresh(&self) -> Result<(), CacheError> {
        let navigation = async {
            match &self.navigation {
                Some(navigation) => navigation.initial_refresh().await,
                None => Ok(()),
            }
        };
        let (topic, topic_list, navigation) = tokio::join!(
            self.topic.initial_refresh(),
            self.topic_list.initial_refresh(),
            navigation,
        );
        topic.and(topic_list).and(navigation)
    }

    /// Spawn the periodic refresh loop of every cache. Call after
    /// [`initial_refresh`](Self::initial_refresh) succeeds.
    pub fn spawn_updates(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = vec![
            spawn_updates(self.topic.clone(), cancel.clone()),
            spawn_updates(self.topic_list.clone(), cancel.clone()),
        ];
        if let Some(navigation) = &self.navigation {
            handles.push(spawn_updates(navigation.clone(), cancel.clone()));
        }
        handles
    }

    pub fn close(&self) {
        self.topic.close();
        self.topic_list.close();
        if let Some(navigation) = &self.navigation {
            navigation.close();
        }
    }

    /// `(cache key, populated)` for every stored key, for health reporting.
    pub fn status(&self) -> Vec<(String, bool)> {
        let mut status: Vec<(String, bool)> = Vec::new();
        for key in self.topic.keys() {
            let populated = self.topic.get(&key).is_some_and(|t| !t.is_empty());
            status.push((key, populated));
        }
        for key in self.topic_list.keys() {
            let populated = self.topic_list.get(&key).is_some_and(|l| !l.is_empty());
            status.push((key, populated));
        }
        if let Some(navigation) = &self.navigation {
            for key in navigation.keys() {
                let populated = navigation.get(&key).is_some_and(|n| !n.is_empty());
                status.push((key, populated));
            }
        }
        status.sort();
        status
    }
}

fn spawn_updates<V>(cache: PollingCache<V>, cancel: CancellationToken) -> JoinHandle<()>
where
    V: Clone + Default + Send + Sync + 'static,
{
    tokio::spawn(async move {
        cache.run_updates(cancel).await;
        info!(cache = cache.name(), "Cache update task finished");
    })
}
