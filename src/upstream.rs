//! Auth headers forwarded to upstream APIs.

use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, HeaderValue};

const FLORENCE_TOKEN: &str = "x-florence-token";

/// Credentials attached to every upstream call.
///
/// Background refreshes carry only the service token; request handlers also
/// forward the caller's access token when the service runs in publishing mode.
#[derive(Clone, Default)]
pub struct UpstreamHeaders {
    pub service_auth_token: Option<String>,
    pub user_access_token: Option<String>,
}

impl std::fmt::Debug for UpstreamHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamHeaders")
            .field("service_auth_token", &self.service_auth_token.as_ref().map(|_| "***"))
            .field("user_access_token", &self.user_access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl UpstreamHeaders {
    pub fn service(token: Option<String>) -> Self {
        Self {
            service_auth_token: token,
            user_access_token: None,
        }
    }

    pub fn with_user_token(mut self, token: Option<String>) -> Self {
        self.user_access_token = token;
        self
    }

    /// Attach the headers to an outgoing request, marking them sensitive.
    pub fn apply(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(token) = self.service_auth_token.as_deref().filter(|t| !t.is_empty())
            && let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {token}"))
        {
            value.set_sensitive(true);
            req = req.header(AUTHORIZATION, value);
        }
        if let Some(token) = self.user_access_token.as_deref().filter(|t| !t.is_empty())
            && let Ok(mut value) = HeaderValue::from_str(token)
        {
            value.set_sensitive(true);
            req = req.header(FLORENCE_TOKEN, value);
        }
        req
    }
}
