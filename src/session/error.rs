//! Error types for the release session lifecycle.

use std::time::Duration;

use thiserror::Error;

use super::SessionState;
use crate::transport::TransportError;

/// Errors raised while opening, committing or waiting on a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The service does not know this owner/app pair.
    #[error("app {owner}/{app} not found on the distribution service")]
    UnknownApp {
        /// Owner (user or organization) name.
        owner: String,
        /// App name.
        app: String,
    },

    /// The service answered with a body that does not describe a usable session.
    #[error("malformed session response: {reason}")]
    Malformed {
        /// What was wrong.
        reason: String,
    },

    /// The API token was rejected.
    #[error("{source}")]
    Unauthorized {
        /// The 401/403 transport error.
        #[source]
        source: TransportError,
    },

    /// A session call failed at the transport level and will not be retried.
    #[error("{operation} failed: {source}")]
    Transport {
        /// Which call failed.
        operation: &'static str,
        /// The underlying error.
        #[source]
        source: TransportError,
    },

    /// The server finished processing with a failure status.
    #[error("server reported processing failure for upload {upload_id} ({status}){}", .details.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    ProcessingFailed {
        /// Session identifier.
        upload_id: String,
        /// Terminal status reported by the server.
        status: &'static str,
        /// Server-supplied details.
        details: Option<String>,
    },

    /// Processing did not reach a terminal status within the polling ceiling.
    #[error("upload {upload_id} still processing after {polls} polls ({}s)", .waited.as_secs())]
    ProcessingTimeout {
        /// Session identifier.
        upload_id: String,
        /// Time spent waiting.
        waited: Duration,
        /// Number of status polls made.
        polls: u32,
    },

    /// Internal sequencing error.
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: SessionState,
        /// Requested state.
        to: SessionState,
    },

    /// The run was cancelled.
    #[error("session operation cancelled")]
    Cancelled,
}

impl SessionError {
    /// Creates a malformed-response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Wraps a transport error, promoting token rejections to [`SessionError::Unauthorized`].
    #[must_use]
    pub fn transport(operation: &'static str, source: TransportError) -> Self {
        if source.is_auth() {
            Self::Unauthorized { source }
        } else {
            Self::Transport { operation, source }
        }
    }
}
