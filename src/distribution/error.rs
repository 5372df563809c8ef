//! Error types for group resolution and release assignment.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while resolving groups or assigning a release.
#[derive(Debug, Error)]
pub enum DistributionError {
    /// The group text named no groups.
    #[error("no distribution groups given")]
    NoGroups,

    /// A named group does not exist for this app.
    #[error("distribution group '{name}' not found")]
    UnknownGroup {
        /// The group name as given.
        name: String,
    },

    /// The service refused the assignment (validation failure).
    #[error("release assignment rejected (HTTP {status}): {source}")]
    ServerRejected {
        /// HTTP status returned.
        status: u16,
        /// The rejection, including the server's message.
        #[source]
        source: TransportError,
    },

    /// The API token was rejected.
    #[error("{source}")]
    Unauthorized {
        /// The 401/403 transport error.
        #[source]
        source: TransportError,
    },

    /// A distribution call failed at the transport level.
    #[error("{operation} failed: {source}")]
    Transport {
        /// Which call failed.
        operation: &'static str,
        /// The underlying error.
        #[source]
        source: TransportError,
    },

    /// The run was cancelled.
    #[error("distribution cancelled")]
    Cancelled,
}

impl DistributionError {
    /// Wraps a transport error, promoting token rejections to [`DistributionError::Unauthorized`].
    #[must_use]
    pub fn transport(operation: &'static str, source: TransportError) -> Self {
        if source.is_auth() {
            Self::Unauthorized { source }
        } else {
            Self::Transport { operation, source }
        }
    }
}
