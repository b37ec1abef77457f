//! Per-language navigation bar cache.

use super::polling::{CacheError, PollingCache};
use crate::topic_api::{Navigation, TopicApi};
use crate::upstream::UpstreamHeaders;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

pub type NavigationCache = PollingCache<Arc<Navigation>>;

pub fn new_navigation_cache(interval: Option<Duration>) -> Result<NavigationCache, CacheError> {
    PollingCache::new("navigation", interval)
}

pub fn navigation_key(lang: &str) -> String {
    format!("navigation:{lang}")
}

/// Register one refresh function per language.
///
/// Unlike the topic caches these propagate upstream errors, so an unreachable
/// topic API at startup fails the cache.
pub fn register_navigation(
    cache: &NavigationCache,
    api: Arc<dyn TopicApi>,
    headers: UpstreamHeaders,
    languages: &[String],
) {
    for lang in languages {
        let api = api.clone();
        let headers = headers.clone();
        let lang = lang.clone();
        cache.register_refresh_fn(navigation_key(&lang), move || {
            let api = api.clone();
            let headers = headers.clone();
            let lang = lang.clone();
            async move {
                let navigation = api
                    .get_navigation(&headers, &lang)
                    .await
                    .with_context(|| format!("failed to fetch navigation for '{lang}'"))?;
                Ok(Arc::new(navigation))
            }
        });
    }
}

/// Navigation for `lang`, or the empty sentinel.
pub fn navigation_or_empty(cache: &NavigationCache, lang: &str) -> Arc<Navigation> {
    cache.get(&navigation_key(lang)).unwrap_or_default()
}
