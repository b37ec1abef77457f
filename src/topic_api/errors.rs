//! Error types for the topic API client.

use crate::json::JsonError;

#[derive(Debug, thiserror::Error)]
pub enum TopicApiError {
    /// The topic (or its subtopic listing) does not exist. Expected for leaves.
    #[error("topic resource not found: {0}")]
    NotFound(String),
    #[error("topic API returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("failed to parse topic API response from {url}")]
    ParseFailed {
        url: String,
        #[source]
        source: JsonError,
    },
    #[error(transparent)]
    RequestFailed(#[from] reqwest::Error),
}

impl TopicApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TopicApiError::NotFound(_))
    }
}
