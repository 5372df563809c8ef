//! Error types for the transport layer.
//!
//! Every variant carries the URL that failed so callers can log a useful
//! message without re-threading request context.

use thiserror::Error;

/// Errors produced by a [`Transport`](super::Transport) call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error calling {url}: {source}")]
    Network {
        /// The URL that was being called.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before a response arrived.
    #[error("timeout calling {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The service rejected the API token (HTTP 401 or 403).
    #[error("[AUTH] API token rejected by {url} (HTTP {status})")]
    Unauthorized {
        /// The URL that rejected the token.
        url: String,
        /// The HTTP status code (401 or 403).
        status: u16,
    },

    /// Non-success HTTP response the caller did not accept.
    #[error("HTTP {status} from {url}{}", format_body(.body))]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Response body (truncated), useful for server validation messages.
        body: String,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        /// The URL whose response failed to decode.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The request target could not be turned into a URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL or path.
        url: String,
    },

    /// The HTTP client could not be constructed (bad proxy, TLS backend, ...).
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild {
        /// Human-readable description.
        reason: String,
    },
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl TransportError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an authentication error.
    pub fn unauthorized(url: impl Into<String>, status: u16) -> Self {
        Self::Unauthorized {
            url: url.into(),
            status,
        }
    }

    /// Creates an HTTP status error without a Retry-After value.
    pub fn http_status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            body: body.into(),
            retry_after,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the HTTP status code when the error came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for 401/403 token rejections.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
