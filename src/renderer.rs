//! Client for the remote page rendering service.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("renderer returned status {status} for template '{template}'")]
    Status { status: u16, template: String },
    #[error("failed to serialize page model")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    RequestFailed(#[from] reqwest::Error),
}

/// Turns a page model into HTML using a named template.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, template: &str, model: &serde_json::Value) -> Result<String, RendererError>;
}

pub struct RendererClient {
    http: reqwest::Client,
    base_url: String,
}

impl RendererClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl Renderer for RendererClient {
    async fn render(&self, template: &str, model: &serde_json::Value) -> Result<String, RendererError> {
        let url = format!("{}/{template}", self.base_url);
        trace!(url = %url, "rendering page");

        let body = serde_json::to_vec(model)?;
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RendererError::Status {
                status: status.as_u16(),
                template: template.to_owned(),
            });
        }
        Ok(response.text().await?)
    }
}
