//! Error taxonomy for remote resource operations.
//!
//! [`ResourceError`] covers every failure a caller of a resource operation can
//! observe: HTTP status failures (keyed by status range), malformed payloads,
//! unbuildable request paths, transport failures and setup mistakes.
//!
//! ## Propagation
//!
//! Status and transport failures propagate to the caller of the top-level
//! operation (`find`, `all`, `create`, custom verbs). Nothing here retries.
//! [`ResourceError::Path`] is the one kind the association resolver catches:
//! an association on a record without an identifier resolves to nothing
//! instead of failing.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

/// Errors produced while resolving, fetching or persisting remote resources.
///
/// Status-derived variants carry the offending HTTP `status` and the raw
/// response `body` so callers can tell validation failures
/// ([`ResourceError::ResourceInvalid`]) apart from authorization or existence
/// failures.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The server rejected the request as malformed (HTTP 400).
    #[error("Bad request ({status}): {body}")]
    BadRequest {
        /// HTTP status returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request lacked valid credentials (HTTP 401).
    #[error("Unauthorized access ({status}): {body}")]
    UnauthorizedAccess {
        /// HTTP status returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The addressed resource does not exist (HTTP 404).
    #[error("Resource not found ({status}): {body}")]
    ResourceNotFound {
        /// HTTP status returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The server refused the payload on validation grounds (HTTP 422).
    #[error("Resource invalid ({status}): {body}")]
    ResourceInvalid {
        /// HTTP status returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Any other 4xx status.
    #[error("Client error ({status}): {body}")]
    ClientError {
        /// HTTP status returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Any 5xx status.
    #[error("Server error ({status}): {body}")]
    ServerError {
        /// HTTP status returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A status outside every recognised range (1xx, 3xx, unlisted 2xx).
    ///
    /// The body is surfaced verbatim since nothing more specific is known.
    #[error("Unexpected response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A payload did not have the shape required to build a record or
    /// collection.
    #[error("Parser error: {message}")]
    Parser {
        /// Description of the shape mismatch.
        message: String,
    },

    /// A request path template could not be filled in.
    ///
    /// Caught by the association resolver; propagates everywhere else.
    #[error("Missing :_{parameter} parameter to build the request path. Path is `{path}`")]
    Path {
        /// Name of the placeholder that had no value.
        parameter: String,
        /// The template being rendered.
        path: String,
    },

    /// The transport collaborator failed before producing a response.
    #[error("Transport failure: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No resource class with this name is registered in the schema.
    #[error("Unknown model '{name}'")]
    UnknownModel {
        /// The requested class name.
        name: String,
    },

    /// The class declares no association with this name.
    #[error("Unknown association '{name}' on {model}")]
    UnknownAssociation {
        /// Owning class name.
        model: String,
        /// The requested association name.
        name: String,
    },

    /// The class registers no custom verb with this name.
    #[error("Unknown custom request '{name}' on {model}")]
    UnknownVerb {
        /// Owning class name.
        model: String,
        /// The requested verb name.
        name: String,
    },

    /// Schema, dispatcher or configuration setup is invalid.
    ///
    /// Produced at setup time; a schema is never built from invalid input.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl ResourceError {
    /// Maps an HTTP status to the failure it denotes.
    ///
    /// Returns `None` for the success statuses (200, 201, 204).
    pub fn from_status(status: u16, body: impl Into<String>) -> Option<Self> {
        let body = body.into();
        let err = match status {
            200 | 201 | 204 => return None,
            400 => Self::BadRequest { status, body },
            401 => Self::UnauthorizedAccess { status, body },
            404 => Self::ResourceNotFound { status, body },
            422 => Self::ResourceInvalid { status, body },
            402..=499 => Self::ClientError { status, body },
            500..=599 => Self::ServerError { status, body },
            _ => Self::UnexpectedStatus { status, body },
        };
        Some(err)
    }

    /// Creates a [`ResourceError::Parser`].
    pub fn parser(message: impl Into<String>) -> Self {
        Self::Parser {
            message: message.into(),
        }
    }

    /// Creates a [`ResourceError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wraps a transport-level error.
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport {
            source: Box::new(source),
        }
    }

    /// Returns the HTTP status that caused this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { status, .. }
            | Self::UnauthorizedAccess { status, .. }
            | Self::ResourceNotFound { status, .. }
            | Self::ResourceInvalid { status, .. }
            | Self::ClientError { status, .. }
            | Self::ServerError { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the server-provided body for status failures.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::BadRequest { body, .. }
            | Self::UnauthorizedAccess { body, .. }
            | Self::ResourceNotFound { body, .. }
            | Self::ResourceInvalid { body, .. }
            | Self::ClientError { body, .. }
            | Self::ServerError { body, .. }
            | Self::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` for [`ResourceError::Path`].
    pub fn is_path_error(&self) -> bool {
        matches!(self, Self::Path { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = ResourceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_map_to_none() {
        for status in [200, 201, 204] {
            assert!(ResourceError::from_status(status, "").is_none(), "{status}");
        }
    }

    #[test]
    fn named_client_statuses_map_to_their_kind() {
        assert!(matches!(
            ResourceError::from_status(400, "x"),
            Some(ResourceError::BadRequest { status: 400, .. })
        ));
        assert!(matches!(
            ResourceError::from_status(401, "x"),
            Some(ResourceError::UnauthorizedAccess { status: 401, .. })
        ));
        assert!(matches!(
            ResourceError::from_status(404, "x"),
            Some(ResourceError::ResourceNotFound { status: 404, .. })
        ));
        assert!(matches!(
            ResourceError::from_status(422, "x"),
            Some(ResourceError::ResourceInvalid { status: 422, .. })
        ));
    }

    #[test]
    fn remaining_ranges_are_exhaustive() {
        for status in [402, 403, 405, 409, 429, 499] {
            assert!(matches!(
                ResourceError::from_status(status, ""),
                Some(ResourceError::ClientError { .. })
            ));
        }
        for status in [500, 502, 503, 599] {
            assert!(matches!(
                ResourceError::from_status(status, ""),
                Some(ResourceError::ServerError { .. })
            ));
        }
        for status in [100, 202, 301, 304, 600] {
            assert!(matches!(
                ResourceError::from_status(status, ""),
                Some(ResourceError::UnexpectedStatus { .. })
            ));
        }
    }

    #[test]
    fn status_errors_carry_status_and_body() {
        let err = ResourceError::from_status(422, r#"{"errors":["name"]}"#).unwrap();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.body(), Some(r#"{"errors":["name"]}"#));
        assert_eq!(ResourceError::parser("bad").status(), None);
    }
}
