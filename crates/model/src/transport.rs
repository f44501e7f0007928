//! The transport port.
//!
//! The core never opens a connection itself. It hands a fully prepared
//! [`TransportRequest`] to an implementation of [`Transport`] and gets back the
//! raw status, headers and body. Connection pooling, TLS, retries and
//! pipelining are the implementation's business.
//!
//! ## Implementations
//!
//! - `transport::ReqwestTransport` (infrastructure crate) for real HTTP.
//! - [`crate::mock::MockTransport`] for in-memory tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Method;

/// A single outbound HTTP call, already stripped of dispatch directives.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL without the query string.
    pub url: String,
    /// Path portion as given to the dispatcher (before joining with the base
    /// URL). Useful for routing in test doubles and for logs.
    pub path: String,
    /// Query pairs, already flattened (`GET` only).
    pub query: Vec<(String, String)>,
    /// Header pairs in the order they should be applied.
    pub headers: Vec<(String, String)>,
    /// JSON body (non-`GET` verbs only; `None` when there is nothing to send).
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Returns the value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first query value for `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The raw result of a transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl TransportResponse {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Sends one HTTP request and waits for its response.
///
/// Returning `Err` means no HTTP status was obtained (connection refused,
/// timeout, invalid URL). Non-2xx statuses are *not* errors at this level;
/// they are classified by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the call.
    async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, Box<dyn std::error::Error + Send + Sync>>;
}
