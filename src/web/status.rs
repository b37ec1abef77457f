//! Health endpoint.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every cache holds a populated value.
    Healthy,
    /// At least one cache still holds its empty sentinel.
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub commit: &'static str,
    pub timestamp: String,
    /// Cache key → populated.
    pub caches: BTreeMap<String, bool>,
}

pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    trace!("health check requested");
    let caches: BTreeMap<String, bool> = state.caches.status().into_iter().collect();
    let status = if caches.values().all(|populated| *populated) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_HASH"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        caches,
    })
}
