//! Session lifecycle states and the live session value.

use std::fmt;

use url::Url;

use super::SessionError;
use crate::api::{self, CreateUploadResponse};
use crate::upload::ChunkPlan;

/// Lifecycle of one release upload session.
///
/// ```text
/// Created -> Uploading -> Committing -> Processing -> Ready -> Published
///                                            |           |
///                                            +-> Failed <+
/// any non-terminal state -> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Uploading,
    Committing,
    Processing,
    Ready,
    Published,
    Failed,
    Aborted,
}

impl SessionState {
    /// Returns `true` for states with no outgoing transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed | Self::Aborted)
    }

    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Aborted {
            return true;
        }
        matches!(
            (self, next),
            (Self::Created, Self::Uploading)
                | (Self::Uploading, Self::Committing)
                | (Self::Committing, Self::Processing)
                | (Self::Processing, Self::Ready | Self::Failed)
                | (Self::Ready, Self::Published | Self::Failed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Uploading => "uploading",
            Self::Committing => "committing",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Published => "published",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A server-side upload session as seen by this run.
///
/// Valid only for the file size it was opened with; owned by exactly one
/// orchestrator run and dropped when that run ends.
#[derive(Debug, Clone)]
pub struct ReleaseUploadSession {
    id: String,
    file_size: u64,
    chunk_size: u64,
    chunk_urls: Vec<String>,
    path: String,
    state: SessionState,
    release_id: Option<String>,
}

impl ReleaseUploadSession {
    /// Builds a session for `owner`/`app` from the service's response,
    /// checking it fits `file_size`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Malformed`] when the id is empty, the chunk
    /// size is zero, a chunk URL is not absolute, or the URL count does not
    /// match `ceil(file_size / chunk_size)`.
    pub fn from_response(
        response: CreateUploadResponse,
        file_size: u64,
        owner: &str,
        app: &str,
    ) -> Result<Self, SessionError> {
        if response.id.trim().is_empty() {
            return Err(SessionError::malformed("session id is empty"));
        }
        if response.chunk_size == 0 {
            return Err(SessionError::malformed("chunk size is zero"));
        }

        let expected = ChunkPlan::new(file_size, response.chunk_size).chunk_count();
        let actual = response.chunk_urls.len() as u64;
        if actual != expected {
            return Err(SessionError::malformed(format!(
                "expected {expected} chunk URLs for {file_size} bytes at chunk size {}, got {actual}",
                response.chunk_size
            )));
        }

        if let Some(bad) = response.chunk_urls.iter().find(|u| Url::parse(u).is_err()) {
            return Err(SessionError::malformed(format!("invalid chunk URL: {bad}")));
        }

        Ok(Self {
            path: api::release_upload_path(owner, app, &response.id),
            id: response.id,
            file_size,
            chunk_size: response.chunk_size,
            chunk_urls: response.chunk_urls,
            state: SessionState::Created,
            release_id: None,
        })
    }

    /// Upload id assigned by the service.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Artifact size the session was opened for.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Chunk size chosen by the service.
    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks, one per upload URL.
    #[must_use]
    pub fn chunk_count(&self) -> u64 {
        self.chunk_urls.len() as u64
    }

    /// Pre-assigned chunk URLs in upload order.
    #[must_use]
    pub fn chunk_urls(&self) -> &[String] {
        &self.chunk_urls
    }

    /// Service path used to commit and poll this session.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Release identifier, available once the session is `Ready`.
    #[must_use]
    pub fn release_id(&self) -> Option<&str> {
        self.release_id.as_deref()
    }

    /// Byte-range plan matching this session.
    #[must_use]
    pub fn chunk_plan(&self) -> ChunkPlan {
        ChunkPlan::new(self.file_size, self.chunk_size)
    }

    pub(crate) fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(session = %self.id, from = %self.state, to = %next, "session transition");
        self.state = next;
        Ok(())
    }

    pub(crate) fn set_release_id(&mut self, release_id: String) {
        self.release_id = Some(release_id);
    }
}
