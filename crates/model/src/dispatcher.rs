//! Request dispatcher: one logical request in, one normalized envelope out.
//!
//! The dispatcher holds the transport configuration supplied once at setup
//! (base URL, default headers, envelope parser, transport) and is otherwise
//! stateless. For every call it:
//!
//! 1. pulls dispatch directives out of the parameters (`_headers` is merged
//!    into the request headers; every `_`-prefixed key is dropped),
//! 2. sends the remaining parameters as a query string (`GET`) or JSON body,
//! 3. maps the status to success or a [`ResourceError`],
//! 4. parses the body into an [`Envelope`].
//!
//! ## Injection
//!
//! Resource classes hold an explicit `Arc<Dispatcher>`. A process-wide
//! dispatcher can be installed with [`Dispatcher::install_global`], but it is
//! only used by classes that opt in.

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::{ApiConfig, ApiFormat};
use crate::errors::{ResourceError, Result};
use crate::fields::value_to_string;
use crate::parser::{EnvelopeParser, JsonApiParser, JsonParser};
use crate::transport::{Transport, TransportRequest, TransportResponse};
use crate::types::{Envelope, Method, Params};

static GLOBAL: OnceLock<Arc<Dispatcher>> = OnceLock::new();

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A logical request before directives are extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP verb.
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL.
    pub path: String,
    /// Query (`GET`) or body parameters, possibly holding `_` directives.
    pub params: Params,
    /// Extra headers for this request only.
    pub headers: IndexMap<String, String>,
}

impl Request {
    /// Creates a request with no parameters or extra headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            headers: IndexMap::new(),
        }
    }

    /// Replaces the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Builds and sends single HTTP requests and normalizes their responses.
#[derive(Clone)]
pub struct Dispatcher {
    base_url: String,
    headers: IndexMap<String, String>,
    parser: Arc<dyn EnvelopeParser>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Starts building a dispatcher for `base_url` over `transport`.
    pub fn builder(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> DispatcherBuilder {
        DispatcherBuilder {
            base_url: base_url.into(),
            headers: IndexMap::new(),
            parser: Arc::new(JsonParser),
            transport,
        }
    }

    /// Builds a dispatcher from an [`ApiConfig`].
    ///
    /// # Errors
    ///
    /// [`ResourceError::Configuration`] if the base URL is not absolute.
    pub fn from_config(config: &ApiConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let parser: Arc<dyn EnvelopeParser> = match config.format {
            ApiFormat::Plain => Arc::new(JsonParser),
            ApiFormat::JsonApi => Arc::new(JsonApiParser),
        };
        let mut builder = Self::builder(config.base_url.clone(), transport).parser(parser);
        for (name, value) in &config.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        builder.build()
    }

    /// Installs the process-wide dispatcher.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Configuration`] if one is already installed.
    pub fn install_global(dispatcher: Arc<Dispatcher>) -> Result<()> {
        GLOBAL
            .set(dispatcher)
            .map_err(|_| ResourceError::configuration("a global dispatcher is already installed"))
    }

    /// The process-wide dispatcher, if one was installed.
    pub fn global() -> Option<Arc<Dispatcher>> {
        GLOBAL.get().cloned()
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The default headers sent with every request.
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Sends `request` and returns the parsed envelope.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::Transport`] if no response was obtained.
    /// - A status-derived variant for every non-success status.
    /// - [`ResourceError::Parser`] if the body cannot be parsed.
    #[tracing::instrument(
        name = "dispatch",
        skip(self, request),
        fields(method = %request.method, path = %request.path)
    )]
    pub async fn dispatch(&self, request: Request) -> Result<Envelope> {
        let response = self.send(request).await?;
        self.parser.parse(&response)
    }

    /// Sends `request` and returns the raw response after status checking.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::dispatch`] minus parsing.
    pub async fn send(&self, request: Request) -> Result<TransportResponse> {
        let prepared = self.prepare(request)?;
        tracing::debug!(url = %prepared.url, "Sending request");
        let response = self
            .transport
            .send(prepared)
            .await
            .map_err(|source| ResourceError::Transport { source })?;
        tracing::debug!(status = response.status, "Received response");
        match ResourceError::from_status(response.status, response.body.clone()) {
            None => Ok(response),
            Some(err) => {
                tracing::warn!(status = response.status, error = %err, "Request failed");
                Err(err)
            }
        }
    }

    /// Turns a logical request into the transport-level request.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Configuration`] if `_headers` is not an object.
    pub fn prepare(&self, request: Request) -> Result<TransportRequest> {
        let Request {
            method,
            path,
            mut params,
            headers: request_headers,
        } = request;

        let mut headers = self.headers.clone();
        if let Some(directive) = params.remove("_headers") {
            match directive {
                Value::Object(map) => {
                    for (name, value) in map {
                        headers.insert(name, value_to_string(&value));
                    }
                }
                Value::Null => {}
                other => {
                    return Err(ResourceError::configuration(format!(
                        "_headers must be an object, got {other}"
                    )))
                }
            }
        }
        headers.extend(request_headers);
        params.retain(|key, _| !key.starts_with('_'));

        let url = self.url_for(&path);
        let (query, body) = if method.uses_query() {
            (flatten_query(&params), None)
        } else if params.is_empty() && method == Method::Delete {
            (Vec::new(), None)
        } else {
            (Vec::new(), Some(Value::Object(params)))
        };
        Ok(TransportRequest {
            method,
            url,
            path,
            query,
            headers: headers.into_iter().collect(),
            body,
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            crate::path::join(&self.base_url, path)
        }
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    base_url: String,
    headers: IndexMap<String, String>,
    parser: Arc<dyn EnvelopeParser>,
    transport: Arc<dyn Transport>,
}

impl DispatcherBuilder {
    /// Adds a default header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replaces the envelope parser (default: [`JsonParser`]).
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn EnvelopeParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Finishes the dispatcher.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Configuration`] if the base URL is not an absolute
    /// `http`/`https` URL.
    pub fn build(self) -> Result<Dispatcher> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            ResourceError::configuration(format!("invalid base URL '{}': {e}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ResourceError::configuration(format!(
                "base URL '{}' must use http or https",
                self.base_url
            )));
        }
        Ok(Dispatcher {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            headers: self.headers,
            parser: self.parser,
            transport: self.transport,
        })
    }
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Flattens parameters into query pairs using nested-bracket encoding.
///
/// `{"a": {"b": 1}, "tags": [1, 2]}` becomes `a[b]=1`, `tags[]=1`, `tags[]=2`.
/// `null` is sent as an empty value.
pub fn flatten_query(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_into(key, value, &mut pairs);
    }
    pairs
}

fn flatten_into(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(&format!("{prefix}[{key}]"), nested, pairs);
            }
        }
        Value::Array(items) => {
            let key = format!("{prefix}[]");
            for item in items {
                flatten_into(&key, item, pairs);
            }
        }
        scalar => pairs.push((prefix.to_string(), value_to_string(scalar))),
    }
}
