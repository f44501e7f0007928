//! Restmap HTTP transport adapter.
//!
//! Implements the [`model::Transport`] port over [`reqwest`]. The `model`
//! crate prepares every request (URL, query pairs, headers, JSON body); this
//! crate only puts it on the wire and hands back status, headers and body
//! text. Status interpretation stays in the dispatcher.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection pooling, TLS and timeouts live here. The
//! [`model`] crate sees only [`model::Transport`].

use std::time::Duration;

use async_trait::async_trait;
use model::{ApiConfig, Method, Transport, TransportRequest, TransportResponse};
use thiserror::Error;

/// Failures below the HTTP status level.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },

    /// The request could not be sent or no response was received.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be read.
    #[error("failed to read response from {url}: {source}")]
    Body {
        /// Target URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

/// [`Transport`] backed by a pooled [`reqwest::Client`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with an optional per-request timeout.
    ///
    /// # Errors
    ///
    /// [`TransportError::Client`] if the TLS backend cannot be initialised.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("restmap/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::Client)?;
        Ok(Self { client })
    }

    /// Creates a transport using the timeout in `config`.
    ///
    /// # Errors
    ///
    /// As [`ReqwestTransport::new`].
    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        Self::new(config.timeout_secs.map(Duration::from_secs))
    }

    /// Sends one request and collects the full response.
    ///
    /// # Errors
    ///
    /// [`TransportError::Timeout`], [`TransportError::Request`] or
    /// [`TransportError::Body`]. Non-success statuses are not errors here.
    #[tracing::instrument(
        name = "http",
        skip(self, request),
        fields(method = %request.method, url = %request.url)
    )]
    pub async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            query,
            headers,
            body,
            ..
        } = request;

        let mut builder = self.client.request(to_reqwest(method), &url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|source| {
            if source.is_timeout() {
                TransportError::Timeout { url: url.clone() }
            } else {
                TransportError::Request {
                    url: url.clone(),
                    source,
                }
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Body { url, source })?;
        tracing::debug!(status, bytes = body.len(), "HTTP response received");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.execute(request).await?)
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}
