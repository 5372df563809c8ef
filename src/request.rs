//! The immutable input of one upload run.

use std::path::{Path, PathBuf};

/// What to upload and where it should go.
///
/// Built once by the caller and never mutated; the orchestrator only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    owner_name: String,
    app_name: String,
    distribution_groups: String,
    path_to_app: PathBuf,
    release_notes: Option<String>,
    notify_testers: bool,
}

impl UploadRequest {
    /// Creates a request. `distribution_groups` is the raw comma/newline
    /// separated text; it is parsed by the distribution manager.
    #[must_use]
    pub fn new(
        owner_name: impl Into<String>,
        app_name: impl Into<String>,
        distribution_groups: impl Into<String>,
        path_to_app: impl Into<PathBuf>,
    ) -> Self {
        Self {
            owner_name: owner_name.into(),
            app_name: app_name.into(),
            distribution_groups: distribution_groups.into(),
            path_to_app: path_to_app.into(),
            release_notes: None,
            notify_testers: true,
        }
    }

    /// Attaches release notes; blank notes are dropped.
    #[must_use]
    pub fn with_release_notes(mut self, notes: Option<String>) -> Self {
        self.release_notes = notes.filter(|n| !n.trim().is_empty());
        self
    }

    /// Controls whether testers are notified about the new release.
    #[must_use]
    pub fn with_notify_testers(mut self, notify: bool) -> Self {
        self.notify_testers = notify;
        self
    }

    /// Owner of the app.
    #[must_use]
    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    /// App name as known to the service.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Raw group list, separated by commas or newlines.
    #[must_use]
    pub fn distribution_groups(&self) -> &str {
        &self.distribution_groups
    }

    /// Path to the artifact.
    #[must_use]
    pub fn path_to_app(&self) -> &Path {
        &self.path_to_app
    }

    /// Release notes, `None` when blank.
    #[must_use]
    pub fn release_notes(&self) -> Option<&str> {
        self.release_notes.as_deref()
    }

    /// Whether testers are notified.
    #[must_use]
    pub fn notify_testers(&self) -> bool {
        self.notify_testers
    }

    /// File name sent to the service when opening the session.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path_to_app
            .file_name()
            .map_or_else(|| "artifact".to_string(), |n| n.to_string_lossy().into_owned())
    }
}
