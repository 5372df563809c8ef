//! Error types for chunk transfer.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that end a chunked upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Reading the artifact failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact has no bytes to send.
    #[error("artifact {path} is empty")]
    EmptyArtifact {
        /// The artifact path.
        path: PathBuf,
    },

    /// The artifact changed size after the session was opened.
    #[error("artifact {path} is {actual} bytes but the session was opened for {expected}")]
    SizeMismatch {
        /// The artifact path.
        path: PathBuf,
        /// Size the session was created for.
        expected: u64,
        /// Size found on disk.
        actual: u64,
    },

    /// The service rejected a chunk with a non-retryable status.
    #[error("chunk {chunk} rejected: {source}")]
    Rejected {
        /// 1-based chunk number.
        chunk: u64,
        /// The rejection.
        #[source]
        source: TransportError,
    },

    /// A chunk failed for a non-retryable reason other than a response
    /// status, such as TLS setup or an unusable URL.
    #[error("chunk {chunk} failed: {source}")]
    Transport {
        /// 1-based chunk number.
        chunk: u64,
        /// The transport failure.
        #[source]
        source: TransportError,
    },

    /// The API token was rejected while sending a chunk.
    #[error("chunk {chunk}: {source}")]
    Unauthorized {
        /// 1-based chunk number.
        chunk: u64,
        /// The 401/403 transport error.
        #[source]
        source: TransportError,
    },

    /// A chunk kept failing transiently until the retry budget ran out.
    #[error("chunk {chunk} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// 1-based chunk number.
        chunk: u64,
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        #[source]
        source: TransportError,
    },

    /// The run was cancelled.
    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Creates an IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the failure was a token rejection.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
