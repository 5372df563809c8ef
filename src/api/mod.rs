//! Wire contract of the distribution service: endpoint paths and JSON bodies.
//!
//! Paths are relative to the transport's base URL. Owner, app, release and
//! group segments are percent-encoded so user-supplied names cannot escape
//! their path segment.

mod models;

pub use models::{
    CreateUploadResponse, DestinationBody, DistributionGroupResponse, UploadStatus,
    UploadStatusResponse,
};

/// `POST`: allocate a release upload session.
#[must_use]
pub fn release_uploads_path(owner: &str, app: &str) -> String {
    format!("{}/uploads/releases", app_path(owner, app))
}

/// `PATCH` (commit) / `GET` (status): one release upload session.
#[must_use]
pub fn release_upload_path(owner: &str, app: &str, upload_id: &str) -> String {
    format!(
        "{}/uploads/releases/{}",
        app_path(owner, app),
        urlencoding::encode(upload_id)
    )
}

/// `GET`: resolve a distribution group by name.
#[must_use]
pub fn distribution_group_path(owner: &str, app: &str, group: &str) -> String {
    format!(
        "{}/distribution_groups/{}",
        app_path(owner, app),
        urlencoding::encode(group)
    )
}

/// `PATCH`: assign a processed release to destinations.
#[must_use]
pub fn release_path(owner: &str, app: &str, release_id: &str) -> String {
    format!(
        "{}/releases/{}",
        app_path(owner, app),
        urlencoding::encode(release_id)
    )
}

fn app_path(owner: &str, app: &str) -> String {
    format!(
        "v0.1/apps/{}/{}",
        urlencoding::encode(owner),
        urlencoding::encode(app)
    )
}
