//! In-memory transport for unit tests.
//!
//! Lets tests script the service's answers per request and inspect what was
//! sent, without binding sockets. Works with `tokio::time::pause`, which a
//! real HTTP client does not.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Transport whose answers come from a closure.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    latency: Duration,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            latency: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Delays every answer by `latency` (virtual time under a paused clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of requests whose target contains `needle`.
    pub fn count_to(&self, needle: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.target.to_string().contains(needle))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.handler)(&request)
    }
}

/// JSON response helper.
pub fn json_response(status: u16, body: &serde_json::Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(status, "http://scripted.test", body.to_string()))
}

/// Empty-body response helper.
pub fn empty_response(status: u16) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(status, "http://scripted.test", ""))
}
