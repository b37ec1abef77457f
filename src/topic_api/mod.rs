//! Client for the remote topic hierarchy API.

pub mod errors;
pub mod models;

pub use errors::TopicApiError;
pub use models::{Navigation, NavigationItem, TopicSummary};

use crate::json::parse_json;
use crate::upstream::UpstreamHeaders;
use async_trait::async_trait;
use models::{PrivateTopicList, PublicTopicList, TopicDto, TopicEnvelope};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, trace};

/// Operations the topic tree fetcher and navigation cache need from the topic API.
///
/// Implemented over HTTP by [`TopicApiClient`]; tests provide in-memory fakes.
#[async_trait]
pub trait TopicApi: Send + Sync {
    /// Top-level topics. An absent `items` array decodes as empty.
    async fn get_root_topics(
        &self,
        headers: &UpstreamHeaders,
    ) -> Result<Vec<TopicSummary>, TopicApiError>;

    /// Direct children of `topic_id`. Leaves answer with [`TopicApiError::NotFound`].
    async fn get_subtopics(
        &self,
        headers: &UpstreamHeaders,
        topic_id: &str,
    ) -> Result<Vec<TopicSummary>, TopicApiError>;

    async fn get_topic(
        &self,
        headers: &UpstreamHeaders,
        topic_id: &str,
    ) -> Result<TopicSummary, TopicApiError>;

    async fn get_navigation(
        &self,
        headers: &UpstreamHeaders,
        lang: &str,
    ) -> Result<Navigation, TopicApiError>;
}

/// HTTP implementation of [`TopicApi`].
///
/// In publishing mode the API wraps each topic in a `{current, next}`
/// envelope; responses are always normalised to the `current` version.
pub struct TopicApiClient {
    http: reqwest::Client,
    base_url: String,
    publishing: bool,
}

impl TopicApiClient {
    pub fn new(
        base_url: impl Into<String>,
        publishing: bool,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("search-controller/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            publishing,
        })
    }

    async fn get_body(
        &self,
        headers: &UpstreamHeaders,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(String, String), TopicApiError> {
        let url = format!("{}{path}", self.base_url);
        trace!(url = %url, "topic API request");

        let response = headers
            .apply(self.http.get(&url).query(query))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TopicApiError::NotFound(path.to_owned()));
        }
        if !status.is_success() {
            return Err(TopicApiError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        Ok((url, body))
    }

    async fn get_list(
        &self,
        headers: &UpstreamHeaders,
        path: &str,
    ) -> Result<Vec<TopicSummary>, TopicApiError> {
        let (url, body) = self.get_body(headers, path, &[]).await?;

        let items = if self.publishing {
            let list: PrivateTopicList = parse_json(&body)
                .map_err(|source| TopicApiError::ParseFailed { url: url.clone(), source })?;
            list.items
                .unwrap_or_default()
                .into_iter()
                .filter_map(TopicEnvelope::into_current)
                .collect::<Vec<_>>()
        } else {
            let list: PublicTopicList = parse_json(&body)
                .map_err(|source| TopicApiError::ParseFailed { url: url.clone(), source })?;
            list.items
                .unwrap_or_default()
                .into_iter()
                .map(TopicSummary::from)
                .collect::<Vec<_>>()
        };

        debug!(url = %url, count = items.len(), "topic list fetched");
        Ok(items)
    }
}

#[async_trait]
impl TopicApi for TopicApiClient {
    async fn get_root_topics(
        &self,
        headers: &UpstreamHeaders,
    ) -> Result<Vec<TopicSummary>, TopicApiError> {
        self.get_list(headers, "/topics").await
    }

    async fn get_subtopics(
        &self,
        headers: &UpstreamHeaders,
        topic_id: &str,
    ) -> Result<Vec<TopicSummary>, TopicApiError> {
        self.get_list(headers, &format!("/topics/{topic_id}/subtopics"))
            .await
    }

    async fn get_topic(
        &self,
        headers: &UpstreamHeaders,
        topic_id: &str,
    ) -> Result<TopicSummary, TopicApiError> {
        let path = format!("/topics/{topic_id}");
        let (url, body) = self.get_body(headers, &path, &[]).await?;

        if self.publishing {
            let envelope: TopicEnvelope = parse_json(&body)
                .map_err(|source| TopicApiError::ParseFailed { url, source })?;
            envelope
                .into_current()
                .ok_or(TopicApiError::NotFound(path))
        } else {
            let dto: TopicDto = parse_json(&body)
                .map_err(|source| TopicApiError::ParseFailed { url, source })?;
            Ok(dto.into())
        }
    }

    async fn get_navigation(
        &self,
        headers: &UpstreamHeaders,
        lang: &str,
    ) -> Result<Navigation, TopicApiError> {
        let (url, body) = self
            .get_body(headers, "/navigation", &[("lang", lang)])
            .await?;
        parse_json(&body).map_err(|source| TopicApiError::ParseFailed { url, source })
    }
}
