//! # In-memory Transport for Tests
//!
//! [`MockTransport`] implements [`Transport`] without any network. Responses
//! are scripted per `(method, path)` and every request is recorded, so tests
//! can assert exactly how many fetches an operation issued and what was sent.
//!
//! | | `MockTransport` | Real transport |
//! |---|---|---|
//! | **Speed** | Instant | Network-bound |
//! | **Determinism** | Full | Subject to the server |
//! | **Error injection** | `respond(500, ..)` / `fail(..)` | Hard |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use model::mock::MockTransport;
//! use model::{Dispatcher, Method};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mock = MockTransport::new();
//! mock.expect(Method::Get, "/users/1").respond_json(200, json!({"id": 1}));
//!
//! let dispatcher = Dispatcher::builder("https://api.example.com", Arc::new(mock.clone()))
//!     .build()
//!     .unwrap();
//! let envelope = dispatcher
//!     .dispatch(model::Request::new(Method::Get, "/users/1"))
//!     .await
//!     .unwrap();
//! assert!(!envelope.data.is_many());
//! assert_eq!(mock.request_count(Method::Get, "/users/1"), 1);
//! # }
//! ```
//!
//! Unmatched requests receive a `404` so a missing expectation surfaces as
//! [`crate::ResourceError::ResourceNotFound`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::lock;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use crate::types::Method;

#[derive(Debug, Clone)]
enum Outcome {
    Respond(TransportResponse),
    Fail(String),
}

#[derive(Debug)]
struct Expectation {
    method: Method,
    path: String,
    outcomes: VecDeque<Outcome>,
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<Expectation>,
    requests: Vec<TransportRequest>,
}

/// Scripted, recording [`Transport`]. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Error produced by outcomes scripted with [`ExpectationBuilder::fail`].
#[derive(Debug, thiserror::Error)]
#[error("mock transport failure: {0}")]
pub struct MockFailure(String);

impl MockTransport {
    /// Creates a transport with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an expectation for `method` on `path` (query string excluded).
    pub fn expect(&self, method: Method, path: impl Into<String>) -> ExpectationBuilder<'_> {
        ExpectationBuilder {
            mock: self,
            method,
            path: path.into(),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.state).requests.clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<TransportRequest> {
        lock(&self.state).requests.last().cloned()
    }

    /// Number of requests received for `method` on `path`.
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Total number of requests received.
    pub fn total_requests(&self) -> usize {
        lock(&self.state).requests.len()
    }

    /// Forgets recorded requests (expectations are kept).
    pub fn clear_requests(&self) {
        lock(&self.state).requests.clear();
    }

    fn push(&self, method: Method, path: String, outcome: Outcome) {
        let mut state = lock(&self.state);
        match state
            .expectations
            .iter_mut()
            .find(|e| e.method == method && e.path == path)
        {
            Some(existing) => existing.outcomes.push_back(outcome),
            None => state.expectations.push(Expectation {
                method,
                path,
                outcomes: VecDeque::from([outcome]),
            }),
        }
    }
}

/// Fluent builder returned by [`MockTransport::expect`].
///
/// Several outcomes may be queued for the same route; they are served in
/// order and the last one keeps being served once the queue is exhausted.
pub struct ExpectationBuilder<'a> {
    mock: &'a MockTransport,
    method: Method,
    path: String,
}

impl ExpectationBuilder<'_> {
    /// Responds with a raw status and body.
    pub fn respond(self, status: u16, body: impl Into<String>) {
        let outcome = Outcome::Respond(TransportResponse::new(status, body));
        self.mock.push(self.method, self.path, outcome);
    }

    /// Responds with a status and a JSON body.
    pub fn respond_json(self, status: u16, body: Value) {
        self.respond(status, body.to_string());
    }

    /// Fails at the transport level (no status).
    pub fn fail(self, message: impl Into<String>) {
        self.mock
            .push(self.method, self.path, Outcome::Fail(message.into()));
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, Box<dyn std::error::Error + Send + Sync>> {
        let outcome = {
            let mut state = lock(&self.state);
            state.requests.push(request.clone());
            state
                .expectations
                .iter_mut()
                .find(|e| e.method == request.method && e.path == request.path)
                .and_then(|e| {
                    if e.outcomes.len() > 1 {
                        e.outcomes.pop_front()
                    } else {
                        e.outcomes.front().cloned()
                    }
                })
        };
        match outcome {
            Some(Outcome::Respond(response)) => Ok(response),
            Some(Outcome::Fail(message)) => Err(Box::new(MockFailure(message))),
            None => Ok(TransportResponse::new(
                404,
                format!("no expectation for {} {}", request.method, request.path),
            )),
        }
    }
}
