//! Router construction.

use axum::{
    Router,
    http::{HeaderValue, header::CACHE_CONTROL},
    response::Response,
    routing::get,
};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::middleware::security_headers::SecurityHeadersLayer;
use crate::web::{search, status};

/// Cache-Control presets.
pub mod cache {
    /// Public search pages; results follow published content closely.
    pub const SEARCH: &str = "public, max-age=60, stale-while-revalidate=60";
    /// Publishing previews carry user credentials and must never be shared.
    pub const PRIVATE: &str = "private, no-store, must-revalidate";
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn create_router(app_state: AppState) -> Router {
    let search_cache = if app_state.config.is_publishing {
        cache::PRIVATE
    } else {
        cache::SEARCH
    };

    let search_router = Router::new()
        .route("/search", get(search::search))
        .layer(axum::middleware::map_response(
            move |mut resp: Response| async move {
                if resp.status().is_success() {
                    resp.headers_mut()
                        .insert(CACHE_CONTROL, HeaderValue::from_static(search_cache));
                }
                resp
            },
        ))
        .with_state(app_state.clone());

    let router = Router::new()
        .route("/health", get(status::health))
        .with_state(app_state)
        .merge(search_router);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        SecurityHeadersLayer,
        CompressionLayer::new()
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(REQUEST_TIMEOUT),
    ))
}
