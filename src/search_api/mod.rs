//! Client for the search API.

pub mod models;

pub use models::{ContentItem, FacetCount, SearchQuery, SearchResponse};

use crate::json::{JsonError, parse_json};
use crate::upstream::UpstreamHeaders;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SearchApiError {
    #[error("search API returned status {status}")]
    Status { status: u16 },
    #[error("failed to parse search API response")]
    ParseFailed(#[source] JsonError),
    #[error(transparent)]
    RequestFailed(#[from] reqwest::Error),
}

#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(
        &self,
        headers: &UpstreamHeaders,
        query: &SearchQuery,
    ) -> Result<SearchResponse, SearchApiError>;
}

pub struct SearchApiClient {
    http: reqwest::Client,
    search_url: String,
}

impl SearchApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("search-controller/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            search_url: format!("{}/search", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl SearchApi for SearchApiClient {
    async fn search(
        &self,
        headers: &UpstreamHeaders,
        query: &SearchQuery,
    ) -> Result<SearchResponse, SearchApiError> {
        let response = headers
            .apply(self.http.get(&self.search_url).query(&query.to_pairs()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchApiError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let result: SearchResponse = parse_json(&body).map_err(SearchApiError::ParseFailed)?;
        debug!(count = result.count, took = result.took, "search API responded");
        Ok(result)
    }
}
