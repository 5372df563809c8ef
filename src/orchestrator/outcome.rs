//! The single result value of an orchestrator run.

use std::fmt;

use crate::distribution::DistributionError;
use crate::session::SessionError;
use crate::upload::UploadError;

/// Step of the upload pipeline a run was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Inspecting the local artifact.
    Prepare,
    /// Allocating the release upload session.
    Open,
    /// Transferring chunks.
    Upload,
    /// Finishing the upload.
    Commit,
    /// Waiting for server-side processing.
    Processing,
    /// Resolving groups or assigning the release.
    Distribution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prepare => "prepare",
            Self::Open => "open",
            Self::Upload => "upload",
            Self::Commit => "commit",
            Self::Processing => "processing",
            Self::Distribution => "distribution",
        })
    }
}

/// Category of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, timeout or server error that outlasted its retries.
    Transport,
    /// The API token was rejected.
    Auth,
    /// The session could not be allocated or behaved unexpectedly.
    Session,
    /// The service refused a chunk.
    Upload,
    /// The service rejected the binary during processing.
    ProcessingFailed,
    /// Processing did not finish in time.
    ProcessingTimeout,
    /// A distribution group could not be resolved.
    UnknownGroup,
    /// The service refused the release assignment.
    DistributionRejected,
    /// The local artifact could not be read.
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::Session => "session",
            Self::Upload => "upload",
            Self::ProcessingFailed => "processing failed",
            Self::ProcessingTimeout => "processing timeout",
            Self::UnknownGroup => "unknown group",
            Self::DistributionRejected => "distribution rejected",
            Self::Io => "io",
        })
    }
}

/// Where and why a run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    /// The stage that failed.
    pub stage: Stage,
    /// Failure category.
    pub kind: FailureKind,
    /// Message of the underlying error.
    pub message: String,
}

impl StageFailure {
    #[must_use]
    pub fn new(stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({}): {}", self.stage, self.kind, self.message)
    }
}

/// Result of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The release was processed and assigned to every destination.
    Success {
        /// Release identifier on the service.
        release_id: String,
    },
    /// The run stopped at a stage.
    Failure(StageFailure),
    /// The run was cancelled.
    Aborted {
        /// Stage in progress when cancellation was observed.
        stage: Stage,
    },
}

impl UploadOutcome {
    /// Returns `true` if the release was published.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Release identifier of a successful run.
    #[must_use]
    pub fn release_id(&self) -> Option<&str> {
        match self {
            Self::Success { release_id } => Some(release_id.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { release_id } => write!(f, "release {release_id} published"),
            Self::Failure(failure) => write!(f, "{failure}"),
            Self::Aborted { stage } => write!(f, "aborted during {stage}"),
        }
    }
}

/// How a pipeline step stopped, before it is folded into an outcome.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Cancelled(Stage),
    Failed(StageFailure),
}

impl Interrupt {
    pub(crate) fn failed(stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed(StageFailure::new(stage, kind, message))
    }

    pub(crate) fn from_session(stage: Stage, error: &SessionError) -> Self {
        let kind = match error {
            SessionError::Cancelled => return Self::Cancelled(stage),
            SessionError::Unauthorized { .. } => FailureKind::Auth,
            SessionError::Transport { .. } => FailureKind::Transport,
            SessionError::ProcessingFailed { .. } => FailureKind::ProcessingFailed,
            SessionError::ProcessingTimeout { .. } => FailureKind::ProcessingTimeout,
            SessionError::UnknownApp { .. }
            | SessionError::Malformed { .. }
            | SessionError::InvalidTransition { .. } => FailureKind::Session,
        };
        Self::failed(stage, kind, error.to_string())
    }

    pub(crate) fn from_upload(error: &UploadError) -> Self {
        let kind = match error {
            UploadError::Cancelled => return Self::Cancelled(Stage::Upload),
            UploadError::Io { .. }
            | UploadError::EmptyArtifact { .. }
            | UploadError::SizeMismatch { .. } => FailureKind::Io,
            UploadError::Rejected { .. } => FailureKind::Upload,
            UploadError::Unauthorized { .. } => FailureKind::Auth,
            UploadError::RetriesExhausted { .. } | UploadError::Transport { .. } => {
                FailureKind::Transport
            }
        };
        Self::failed(Stage::Upload, kind, error.to_string())
    }

    pub(crate) fn from_distribution(error: &DistributionError) -> Self {
        let kind = match error {
            DistributionError::Cancelled => return Self::Cancelled(Stage::Distribution),
            DistributionError::NoGroups | DistributionError::UnknownGroup { .. } => {
                FailureKind::UnknownGroup
            }
            DistributionError::ServerRejected { .. } => FailureKind::DistributionRejected,
            DistributionError::Unauthorized { .. } => FailureKind::Auth,
            DistributionError::Transport { .. } => FailureKind::Transport,
        };
        Self::failed(Stage::Distribution, kind, error.to_string())
    }

    pub(crate) fn into_outcome(self) -> UploadOutcome {
        match self {
            Self::Cancelled(stage) => UploadOutcome::Aborted { stage },
            Self::Failed(failure) => UploadOutcome::Failure(failure),
        }
    }
}
