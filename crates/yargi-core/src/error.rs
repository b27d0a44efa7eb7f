//! Error types and classification for gateway operations.
//!
//! Every failure path in the gateway maps to exactly one [`ErrorKind`] from a
//! closed set. Adapters never wrap one kind in another; the dispatcher attaches
//! the source and operation without changing the kind.
//!
//! ## Recovery
//!
//! Only [`Error::AuthExpired`] is recoverable, and only once: the caller
//! re-warms the backend session and retries the original request. A second
//! auth failure must be surfaced as [`Error::BackendFailure`].

use thiserror::Error;

use crate::types::{ContainerKind, SourceId};

/// Maximum number of characters of backend response body carried in a
/// [`Error::BackendFailure`] excerpt.
pub const EXCERPT_LIMIT: usize = 200;

/// The main error type for gateway operations.
///
/// All public functions in `yargi-core` return `Result<T, Error>`.
#[derive(Error, Debug)]
pub enum Error {
    /// Schema, range, closed-set, or cross-field validation failed.
    ///
    /// Raised before any network or browser operation is initiated. The
    /// `field` is a path into the argument object (e.g. `decision_type`).
    #[error("invalid argument `{field}`: {message}")]
    InvalidArgument {
        /// Path of the offending argument field.
        field: String,
        /// Human-readable description of the violation.
        message: String,
    },

    /// Tool name unknown, or a document handle refers to no document.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend returned an auth/CSRF failure for a warm session.
    ///
    /// Recovered locally at most once by re-warming the session.
    #[error("auth expired for {source_id} ({sub_endpoint})")]
    AuthExpired {
        /// Backend whose session expired.
        source_id: SourceId,
        /// Sub-endpoint whose CSRF token was rejected.
        sub_endpoint: String,
    },

    /// Deadline exceeded during a network or browser operation.
    #[error("timeout: {0}")]
    Timeout(String),

    /// 5xx, malformed response, or an otherwise unusable backend reply.
    #[error("backend failure{}: {excerpt}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    BackendFailure {
        /// HTTP status code when one was received.
        status: Option<u16>,
        /// Short excerpt of the backend's response body.
        excerpt: String,
    },

    /// Bot-challenge page, captcha, or rate-limit response.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Pool queue depth exceeded; surfaced immediately, never queued.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Markdown conversion or structured-response parsing failed.
    #[error("parse failure ({container}): {message}")]
    ParseFailure {
        /// Container kind that failed to convert or parse.
        container: ContainerKind,
        /// Converter or parser diagnostic.
        message: String,
    },
}

/// Closed, wire-serializable set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Argument validation failed before any I/O.
    InvalidArgument,
    /// Unknown tool or missing document.
    NotFound,
    /// Backend auth/CSRF failure.
    AuthExpired,
    /// Deadline exceeded.
    Timeout,
    /// Backend returned an unusable response.
    BackendFailure,
    /// Bot challenge or rate limit.
    AccessDenied,
    /// Pool queue overflow.
    ResourceExhausted,
    /// Conversion or parsing failed.
    ParseFailure,
}

impl Error {
    /// Classify this error into its wire kind.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AuthExpired { .. } => ErrorKind::AuthExpired,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::BackendFailure { .. } => ErrorKind::BackendFailure,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::ParseFailure { .. } => ErrorKind::ParseFailure,
        }
    }

    /// Whether a single local recovery attempt is permitted.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// Build an [`Error::InvalidArgument`] for `field`.
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an [`Error::BackendFailure`] from a status code and body,
    /// trimming the body to [`EXCERPT_LIMIT`] characters.
    pub fn backend(status: impl Into<Option<u16>>, body: &str) -> Self {
        Self::BackendFailure {
            status: status.into(),
            excerpt: body.chars().take(EXCERPT_LIMIT).collect(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(err.to_string());
        }
        Self::BackendFailure {
            status: err.status().map(|s| s.as_u16()),
            excerpt: err.to_string().chars().take(EXCERPT_LIMIT).collect(),
        }
    }
}

/// Result alias used throughout `yargi-core`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_per_variant() {
        let err = Error::invalid_argument("decision_type", "unknown value");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = Error::backend(Some(502), "upstream choked");
        assert_eq!(err.kind(), ErrorKind::BackendFailure);

        let err = Error::Timeout("deadline".into());
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn only_auth_expired_is_recoverable() {
        let auth = Error::AuthExpired {
            source_id: SourceId::Sayistay,
            sub_endpoint: "genel_kurul".into(),
        };
        assert!(auth.is_recoverable());

        assert!(!Error::NotFound("x".into()).is_recoverable());
        assert!(!Error::Timeout("x".into()).is_recoverable());
        assert!(!Error::backend(None, "x").is_recoverable());
    }

    #[test]
    fn backend_excerpt_is_bounded() {
        let long_body = "x".repeat(10_000);
        let err = Error::backend(Some(500), &long_body);
        match err {
            Error::BackendFailure { excerpt, .. } => assert_eq!(excerpt.len(), EXCERPT_LIMIT),
            other => unreachable!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidArgument).unwrap();
        assert_eq!(json, "\"invalid_argument\"");
        let json = serde_json::to_string(&ErrorKind::ResourceExhausted).unwrap();
        assert_eq!(json, "\"resource_exhausted\"");
    }

    #[test]
    fn display_includes_status() {
        let err = Error::backend(Some(503), "bakım modu");
        assert!(err.to_string().contains("503"));
    }
}
