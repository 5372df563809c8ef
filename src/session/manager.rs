//! Drives one release upload session through its server-side lifecycle.

use std::sync::Arc;

use serde_json::json;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{ReleaseUploadSession, SessionError, SessionState};
use crate::api::{self, CreateUploadResponse, UploadStatus, UploadStatusResponse};
use crate::request::UploadRequest;
use crate::retry::{RetryFailure, retry_transport, run_or_cancel, sleep_or_cancel};
use crate::settings::PollSettings;
use crate::transport::{ApiRequest, Transport};

/// Opens, commits and polls release upload sessions.
///
/// Session creation and commit are single calls: neither is idempotent on the
/// service side, so a failure there surfaces immediately. Status polls are
/// retried under [`PollSettings::retry`].
pub struct ReleaseSessionManager {
    transport: Arc<dyn Transport>,
    poll: PollSettings,
}

impl ReleaseSessionManager {
    /// Creates a manager sending through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, poll: PollSettings) -> Self {
        Self { transport, poll }
    }

    /// Allocates a session for `file_size` bytes of `request`'s artifact.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownApp`] on 404
    /// - [`SessionError::Malformed`] if the response cannot drive an upload of `file_size`
    /// - [`SessionError::Unauthorized`] / [`SessionError::Transport`] on request failure
    /// - [`SessionError::Cancelled`] if `cancel` fires
    #[instrument(skip(self, request, cancel), fields(owner = request.owner_name(), app = request.app_name()))]
    pub async fn open(
        &self,
        request: &UploadRequest,
        file_size: u64,
        cancel: &CancellationToken,
    ) -> Result<ReleaseUploadSession, SessionError> {
        let owner = request.owner_name();
        let app = request.app_name();
        let call = ApiRequest::post(api::release_uploads_path(owner, app))
            .json(json!({
                "file_name": request.file_name(),
                "file_size": file_size,
            }))
            .accept(404);

        let response = run_or_cancel(self.transport.send(call), cancel)
            .await
            .ok_or(SessionError::Cancelled)?
            .map_err(|e| SessionError::transport("open session", e))?;

        if response.status == 404 {
            return Err(SessionError::UnknownApp {
                owner: owner.to_string(),
                app: app.to_string(),
            });
        }

        let created: CreateUploadResponse = response
            .json()
            .map_err(|e| SessionError::malformed(e.to_string()))?;
        let session = ReleaseUploadSession::from_response(created, file_size, owner, app)?;

        info!(
            session = %session.id(),
            chunk_size = session.chunk_size(),
            chunks = session.chunk_count(),
            "release upload session opened"
        );
        Ok(session)
    }

    /// Marks the start of chunk transfer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is `Created`.
    pub fn begin_upload(&self, session: &mut ReleaseUploadSession) -> Result<(), SessionError> {
        session.transition(SessionState::Uploading)
    }

    /// Tells the service every chunk has arrived.
    ///
    /// Moves the session through `Committing` to `Processing`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] / [`SessionError::Unauthorized`] if
    /// the finish call fails and [`SessionError::Cancelled`] if `cancel` fires.
    /// The session is left in `Committing`.
    #[instrument(skip(self, session, cancel), fields(session = %session.id()))]
    pub async fn commit(
        &self,
        session: &mut ReleaseUploadSession,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        session.transition(SessionState::Committing)?;

        let call = ApiRequest::patch(session.path())
            .json(json!({ "upload_status": UploadStatus::UploadFinished.as_str() }));
        run_or_cancel(self.transport.send(call), cancel)
            .await
            .ok_or(SessionError::Cancelled)?
            .map_err(|e| SessionError::transport("commit upload", e))?;

        session.transition(SessionState::Processing)?;
        info!("upload committed, waiting for processing");
        Ok(())
    }

    /// Polls until the service finishes processing and returns the release id.
    ///
    /// Sleeps one interval before every poll. [`PollSettings::max_wait`] is a
    /// wall-clock ceiling: the last sleep is shortened to end on it, and a poll
    /// still in flight when it passes is abandoned.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ProcessingFailed`] on `error` / `malwareDetected`
    /// - [`SessionError::ProcessingTimeout`] when the ceiling is reached
    /// - [`SessionError::Malformed`] if a ready status carries no release id
    /// - [`SessionError::Transport`] / [`SessionError::Unauthorized`] when a poll gives up
    /// - [`SessionError::Cancelled`] if `cancel` fires
    #[instrument(skip(self, session, cancel), fields(session = %session.id()))]
    pub async fn wait_until_ready(
        &self,
        session: &mut ReleaseUploadSession,
        cancel: &CancellationToken,
    ) -> Result<String, SessionError> {
        let started = Instant::now();
        let deadline = started + self.poll.max_wait;
        let mut polls = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if !sleep_or_cancel(self.poll.interval.min(remaining), cancel).await {
                return Err(SessionError::Cancelled);
            }

            polls += 1;
            let Ok(polled) = timeout_at(deadline, self.poll_status(session, cancel)).await else {
                debug!(poll = polls, "status poll cut off at the processing ceiling");
                break;
            };
            let status = polled?;
            debug!(poll = polls, status = status.upload_status.as_str(), "upload status");

            if !status.upload_status.is_terminal() {
                continue;
            }
            if status.upload_status.is_failure() {
                session.transition(SessionState::Failed)?;
                return Err(SessionError::ProcessingFailed {
                    upload_id: session.id().to_string(),
                    status: status.upload_status.as_str(),
                    details: status.error_details,
                });
            }

            let Some(release_id) = status.release_id.filter(|id| !id.trim().is_empty()) else {
                return Err(SessionError::malformed("ready status without a release id"));
            };
            session.transition(SessionState::Ready)?;
            session.set_release_id(release_id.clone());
            info!(release_id = %release_id, polls, "release ready");
            return Ok(release_id);
        }

        session.transition(SessionState::Failed)?;
        let waited = started.elapsed();
        warn!(polls, waited_secs = waited.as_secs(), "processing did not finish in time");
        Err(SessionError::ProcessingTimeout {
            upload_id: session.id().to_string(),
            waited,
            polls,
        })
    }

    /// Records that the release was assigned to its destinations.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is `Ready`.
    pub fn mark_published(&self, session: &mut ReleaseUploadSession) -> Result<(), SessionError> {
        session.transition(SessionState::Published)
    }

    /// Abandons the session. No call is made; the server-side session expires.
    ///
    /// Terminal sessions are left untouched.
    pub fn abort(&self, session: &mut ReleaseUploadSession) {
        if session.state().is_terminal() {
            return;
        }
        if let Err(e) = session.transition(SessionState::Aborted) {
            warn!(error = %e, "could not abort session");
        }
    }

    async fn poll_status(
        &self,
        session: &ReleaseUploadSession,
        cancel: &CancellationToken,
    ) -> Result<UploadStatusResponse, SessionError> {
        let transport = &self.transport;
        let path = session.path();
        let result = retry_transport(&self.poll.retry, cancel, "poll upload status", |_| {
            let call = ApiRequest::get(path);
            async move { transport.send(call).await }
        })
        .await;

        match result {
            Ok(response) => response
                .json()
                .map_err(|e| SessionError::malformed(e.to_string())),
            Err(RetryFailure::Cancelled) => Err(SessionError::Cancelled),
            Err(RetryFailure::Failed { error, .. }) => {
                Err(SessionError::transport("poll upload status", error))
            }
        }
    }
}
