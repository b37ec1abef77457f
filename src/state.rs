//! State shared by every request handler.

use crate::cache::CacheList;
use crate::config::Config;
use crate::renderer::Renderer;
use crate::search_api::SearchApi;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search_api: Arc<dyn SearchApi>,
    pub renderer: Arc<dyn Renderer>,
    pub caches: CacheList,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        search_api: Arc<dyn SearchApi>,
        renderer: Arc<dyn Renderer>,
        caches: CacheList,
    ) -> Self {
        Self {
            config,
            search_api,
            renderer,
            caches,
        }
    }
}
