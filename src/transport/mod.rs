//! Authenticated HTTP transport for the distribution service.
//!
//! The [`Transport`] trait is the seam every higher-level component talks
//! through: one request in, one status + body out. [`HttpTransport`] is the
//! `reqwest` implementation used in production; tests substitute scripted
//! transports or point the base URL at a mock server.
//!
//! No retry logic lives here. Callers decide what is worth retrying because
//! an idempotent chunk PUT and a session creation need different policies.
//!
//! # Example
//!
//! ```no_run
//! use appcenter_core::transport::{ApiRequest, HttpTransport, Transport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TransportConfig::new("token").with_base_url("http://localhost:8080")?;
//! let transport = HttpTransport::new(config)?;
//! let response = transport
//!     .send(ApiRequest::get("v0.1/apps/owner/app/distribution_groups/beta"))
//!     .await?;
//! println!("status {}", response.status);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;

pub use client::{HttpTransport, ProxyConfig, TransportConfig};
pub use error::TransportError;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// Path relative to the configured service base URL.
    Path(String),
    /// Absolute URL handed out by the service (e.g. a chunk upload URL).
    Url(String),
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.write_str(path),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// JSON document.
    Json(serde_json::Value),
    /// Raw binary payload.
    Bytes(Bytes),
}

/// A single request against the service.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Destination.
    pub target: RequestTarget,
    /// Extra headers beyond the token/accept/user-agent defaults.
    pub headers: Vec<(&'static str, String)>,
    /// Payload.
    pub body: RequestBody,
    /// Non-2xx statuses the caller wants back as a normal response.
    pub accept: Vec<u16>,
}

impl ApiRequest {
    /// Creates a request with no body and no extra headers.
    #[must_use]
    pub fn new(method: Method, target: RequestTarget) -> Self {
        Self {
            method,
            target,
            headers: Vec::new(),
            body: RequestBody::Empty,
            accept: Vec::new(),
        }
    }

    /// `GET` against a service path.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, RequestTarget::Path(path.into()))
    }

    /// `POST` against a service path.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, RequestTarget::Path(path.into()))
    }

    /// `PATCH` against a service path.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, RequestTarget::Path(path.into()))
    }

    /// `PUT` against an absolute URL.
    #[must_use]
    pub fn put_url(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, RequestTarget::Url(url.into()))
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Sets a raw binary body.
    #[must_use]
    pub fn bytes(mut self, body: Bytes) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    /// Accepts `status` as a normal response instead of an error.
    #[must_use]
    pub fn accept(mut self, status: u16) -> Self {
        self.accept.push(status);
        self
    }

    /// Returns the value of a header previously added with [`header`](Self::header).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Final URL (for error context).
    pub url: String,
    /// Raw body.
    pub body: Bytes,
}

impl ApiResponse {
    /// Creates a response value.
    #[must_use]
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::decode(self.url.clone(), e))
    }
}

/// Sends requests to the distribution service.
///
/// Implementations must be shareable across tasks and hold no per-call state.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection failure, timeout, or a status
    /// outside 2xx/3xx that is not listed in [`ApiRequest::accept`].
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_request_builder_collects_headers_and_accept() {
        let request = ApiRequest::put_url("https://upload.example.com/c/1")
            .header("X-Chunk-Number", "1")
            .accept(404);

        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.header_value("x-chunk-number"), Some("1"));
        assert_eq!(request.accept, vec![404]);
        assert!(matches!(request.target, RequestTarget::Url(_)));
    }

    #[test]
    fn test_api_response_json_decode_error_names_url() {
        let response = ApiResponse::new(200, "https://x/status", "not json");
        let result: Result<serde_json::Value, _> = response.json();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("https://x/status"));
    }
}
