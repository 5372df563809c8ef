//! JSON bodies exchanged with the distribution service.

use serde::{Deserialize, Deserializer, Serialize};

/// Response to allocating a release upload session.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreateUploadResponse {
    /// Session identifier.
    pub id: String,
    /// Bytes per chunk (the last chunk may be shorter).
    pub chunk_size: u64,
    /// One pre-assigned upload URL per chunk, in sequence order.
    pub chunk_urls: Vec<String>,
}

/// Server-side state of a release upload session.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UploadStatus {
    /// Session allocated, bytes may still be arriving.
    UploadStarted,
    /// Commit acknowledged, processing not yet started.
    UploadFinished,
    /// Server is scanning/extracting the binary.
    Processing,
    /// Processing done; a release id is available.
    ReadyToBePublished,
    /// Processing rejected the binary as malicious.
    MalwareDetected,
    /// Processing failed.
    Error,
    /// Any status this client does not know; treated as still in progress.
    #[serde(other)]
    Unknown,
}

impl UploadStatus {
    /// Returns `true` once the server will not change the status again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ReadyToBePublished | Self::MalwareDetected | Self::Error
        )
    }

    /// Returns `true` for terminal failure statuses.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::MalwareDetected | Self::Error)
    }

    /// Wire name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UploadStarted => "uploadStarted",
            Self::UploadFinished => "uploadFinished",
            Self::Processing => "processing",
            Self::ReadyToBePublished => "readyToBePublished",
            Self::MalwareDetected => "malwareDetected",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// Response to a session status query.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadStatusResponse {
    /// Session identifier.
    pub id: String,
    /// Current status.
    pub upload_status: UploadStatus,
    /// Release identifier, present once ready. Accepts string or number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub release_id: Option<String>,
    /// Server-supplied failure description.
    #[serde(default)]
    pub error_details: Option<String>,
}

/// A resolved distribution group.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DistributionGroupResponse {
    /// Group identifier.
    pub id: String,
    /// Group display name.
    pub name: String,
}

/// One destination in the release assignment body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DestinationBody {
    /// Group identifier.
    pub id: String,
    /// Group name.
    pub name: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_with_string_release_id() {
        let body = r#"{"id":"up-1","upload_status":"readyToBePublished","release_id":"rel-42"}"#;
        let parsed: UploadStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.upload_status, UploadStatus::ReadyToBePublished);
        assert_eq!(parsed.release_id.as_deref(), Some("rel-42"));
    }

    #[test]
    fn test_status_response_with_numeric_release_id() {
        let body = r#"{"id":"up-1","upload_status":"readyToBePublished","release_id":42}"#;
        let parsed: UploadStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.release_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_status_response_unknown_status_is_not_terminal() {
        let body = r#"{"id":"up-1","upload_status":"somethingNew"}"#;
        let parsed: UploadStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.upload_status, UploadStatus::Unknown);
        assert!(!parsed.upload_status.is_terminal());
        assert!(parsed.release_id.is_none());
    }

    #[test]
    fn test_failure_statuses() {
        assert!(UploadStatus::Error.is_failure());
        assert!(UploadStatus::MalwareDetected.is_failure());
        assert!(!UploadStatus::ReadyToBePublished.is_failure());
        assert!(UploadStatus::ReadyToBePublished.is_terminal());
    }

    #[test]
    fn test_create_upload_response_requires_chunk_urls() {
        let body = r#"{"id":"up-1","chunk_size":1024}"#;
        assert!(serde_json::from_str::<CreateUploadResponse>(body).is_err());
    }
}
