//! One-call release upload: resolve, open, transfer, commit, wait, distribute.
//!
//! [`UploadOrchestrator`] composes the distribution manager, the session
//! manager and the chunk uploader. It is the only place that aborts a run and
//! the only place errors become an [`UploadOutcome`]; the components below it
//! do their own retrying.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use appcenter_core::orchestrator::UploadOrchestrator;
//! use appcenter_core::settings::UploadSettings;
//! use appcenter_core::transport::{HttpTransport, TransportConfig};
//! use appcenter_core::UploadRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(TransportConfig::new("token"))?;
//! let orchestrator = UploadOrchestrator::new(Arc::new(transport), UploadSettings::default());
//! let request = UploadRequest::new("acme", "ios-app", "beta, qa", "build/app.ipa");
//! let outcome = orchestrator.run(&request, &CancellationToken::new()).await;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

mod outcome;

pub use outcome::{FailureKind, Stage, StageFailure, UploadOutcome};

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::distribution::{DestinationId, DistributionManager};
use crate::request::UploadRequest;
use crate::session::{ReleaseSessionManager, ReleaseUploadSession};
use crate::settings::UploadSettings;
use crate::transport::Transport;
use crate::upload::ChunkUploader;
use outcome::Interrupt;

/// Runs complete release uploads.
///
/// Holds no per-run state; one instance can serve many runs, each of which
/// owns its own session.
pub struct UploadOrchestrator {
    distribution: DistributionManager,
    sessions: ReleaseSessionManager,
    uploader: ChunkUploader,
}

impl UploadOrchestrator {
    /// Wires the components to one transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, settings: UploadSettings) -> Self {
        Self {
            distribution: DistributionManager::new(Arc::clone(&transport), settings.retry.clone()),
            sessions: ReleaseSessionManager::new(Arc::clone(&transport), settings.poll),
            uploader: ChunkUploader::new(transport, settings.retry, settings.chunk_concurrency),
        }
    }

    /// Uploads and publishes `request`'s artifact.
    ///
    /// Never panics and never returns an error: every failure is folded into
    /// the returned [`UploadOutcome`].
    #[instrument(skip(self, request, cancel), fields(owner = request.owner_name(), app = request.app_name()))]
    pub async fn run(&self, request: &UploadRequest, cancel: &CancellationToken) -> UploadOutcome {
        let outcome = match self.execute(request, cancel).await {
            Ok(release_id) => UploadOutcome::Success { release_id },
            Err(interrupt) => interrupt.into_outcome(),
        };

        match &outcome {
            UploadOutcome::Success { release_id } => info!(%release_id, "release published"),
            UploadOutcome::Failure(failure) => warn!(
                stage = %failure.stage,
                kind = %failure.kind,
                error = %failure.message,
                "release upload failed"
            ),
            UploadOutcome::Aborted { stage } => warn!(%stage, "release upload aborted"),
        }
        outcome
    }

    async fn execute(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<String, Interrupt> {
        let file_size = artifact_size(request.path_to_app()).await?;
        if cancel.is_cancelled() {
            return Err(Interrupt::Cancelled(Stage::Prepare));
        }

        let destinations = self
            .distribution
            .resolve_destinations(
                request.owner_name(),
                request.app_name(),
                request.distribution_groups(),
                cancel,
            )
            .await
            .map_err(|e| Interrupt::from_distribution(&e))?;

        let mut session = self
            .sessions
            .open(request, file_size, cancel)
            .await
            .map_err(|e| Interrupt::from_session(Stage::Open, &e))?;

        let result = self
            .publish(request, &mut session, &destinations, cancel)
            .await;
        if result.is_err() {
            self.sessions.abort(&mut session);
        }
        result
    }

    async fn publish(
        &self,
        request: &UploadRequest,
        session: &mut ReleaseUploadSession,
        destinations: &[DestinationId],
        cancel: &CancellationToken,
    ) -> Result<String, Interrupt> {
        self.sessions
            .begin_upload(session)
            .map_err(|e| Interrupt::from_session(Stage::Upload, &e))?;
        self.uploader
            .upload(request.path_to_app(), session, cancel)
            .await
            .map_err(|e| Interrupt::from_upload(&e))?;

        self.sessions
            .commit(session, cancel)
            .await
            .map_err(|e| Interrupt::from_session(Stage::Commit, &e))?;
        let release_id = self
            .sessions
            .wait_until_ready(session, cancel)
            .await
            .map_err(|e| Interrupt::from_session(Stage::Processing, &e))?;

        self.distribution
            .distribute(request, &release_id, destinations, cancel)
            .await
            .map_err(|e| Interrupt::from_distribution(&e))?;
        self.sessions
            .mark_published(session)
            .map_err(|e| Interrupt::from_session(Stage::Distribution, &e))?;

        Ok(release_id)
    }
}

async fn artifact_size(path: &Path) -> Result<u64, Interrupt> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        Interrupt::failed(
            Stage::Prepare,
            FailureKind::Io,
            format!("cannot read {}: {e}", path.display()),
        )
    })?;
    if !metadata.is_file() {
        return Err(Interrupt::failed(
            Stage::Prepare,
            FailureKind::Io,
            format!("{} is not a file", path.display()),
        ));
    }
    if metadata.len() == 0 {
        return Err(Interrupt::failed(
            Stage::Prepare,
            FailureKind::Io,
            format!("{} is empty", path.display()),
        ));
    }
    Ok(metadata.len())
}
