//! Transport capability and its `reqwest` implementation.
//!
//! ERROR HANDLING
//! ==============
//! A transport error means no HTTP response was received. Any response, even
//! 500, is returned as `Ok(RawResponse)` so that the classifier alone decides
//! what a status means.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{Method, RawResponse, RequestDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP client build failed: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Executes one request and reports the raw result.
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`TransportError`] only when no response was received.
    async fn execute(&self, request: RequestDescriptor) -> Result<RawResponse, TransportError>;
}

// =============================================================================
// REQWEST TRANSPORT
// =============================================================================

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: RequestDescriptor) -> Result<RawResponse, TransportError> {
        let url = join_url(&self.base_url, &request.url);
        let mut builder = self.client.request(reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        // A body cut off mid-stream means no complete response arrived.
        let body = response.text().await.map_err(|e| {
            tracing::warn!(%url, status, error = %e, "failed to read response body");
            TransportError::from(e)
        })?;
        Ok(RawResponse { status, body })
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Resolve `url` against `base`. Absolute URLs pass through untouched.
pub(crate) fn join_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_owned();
    }
    let base = base.trim_end_matches('/');
    let path = url.trim_start_matches('/');
    if path.is_empty() {
        return base.to_owned();
    }
    format!("{base}/{path}")
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;
