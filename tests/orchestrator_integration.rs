//! End-to-end tests for the upload pipeline against a mock distribution service.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use appcenter_core::transport::{HttpTransport, TransportConfig};
use appcenter_core::{
    FailureKind, PollSettings, RetryPolicy, Stage, UploadOrchestrator, UploadOutcome,
    UploadRequest, UploadSettings,
};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const UPLOAD_ID: &str = "up-1";

/// Answers `processing` until `ready_after` polls have been seen.
struct StatusSequence {
    polls: AtomicUsize,
    ready_after: usize,
}

impl Respond for StatusSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let seen = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if seen >= self.ready_after {
            ResponseTemplate::new(200).set_body_json(json!({
                "id": UPLOAD_ID,
                "upload_status": "readyToBePublished",
                "release_id": "rel-42",
            }))
        } else {
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": UPLOAD_ID, "upload_status": "processing" }))
        }
    }
}

fn fast_settings() -> UploadSettings {
    let retry =
        RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50), 2.0)
            .with_jitter(Duration::ZERO);
    UploadSettings::default()
        .with_retry(retry.clone())
        .with_poll(PollSettings {
            interval: Duration::from_millis(50),
            max_wait: Duration::from_secs(5),
            retry,
        })
}

fn orchestrator(server: &MockServer) -> UploadOrchestrator {
    let config = TransportConfig::new("test-token")
        .with_base_url(&server.uri())
        .unwrap();
    let transport = HttpTransport::new(config).unwrap();
    UploadOrchestrator::new(Arc::new(transport), fast_settings())
}

fn write_artifact(dir: &TempDir, content: &[u8]) -> std::path::PathBuf {
    let artifact = dir.path().join("app-release.apk");
    std::fs::write(&artifact, content).expect("failed to write artifact");
    artifact
}

async fn mount_group(server: &MockServer, name: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v0.1/apps/acme/android/distribution_groups/{name}")))
        .and(header("X-API-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "name": name })))
        .mount(server)
        .await;
}

async fn mount_session(server: &MockServer, file_size: u64, chunk_size: u64, chunks: usize) {
    let chunk_urls: Vec<String> = (1..=chunks)
        .map(|n| format!("{}/chunks/{UPLOAD_ID}/{n}", server.uri()))
        .collect();
    Mock::given(method("POST"))
        .and(path("/v0.1/apps/acme/android/uploads/releases"))
        .and(body_partial_json(json!({
            "file_name": "app-release.apk",
            "file_size": file_size,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": UPLOAD_ID,
            "chunk_size": chunk_size,
            "chunk_urls": chunk_urls,
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("/v0.1/apps/acme/android/uploads/releases/{UPLOAD_ID}")))
        .and(body_partial_json(json!({ "upload_status": "uploadFinished" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": UPLOAD_ID })))
        .expect(1)
        .mount(server)
        .await;
}

fn request(artifact: &Path) -> UploadRequest {
    UploadRequest::new("acme", "android", "beta, qa", artifact)
        .with_release_notes(Some("Nightly build".to_string()))
}

// ==================== Happy Path Tests ====================

#[tokio::test]
async fn test_full_upload_publishes_release() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().expect("failed to create temp dir");
    let artifact = write_artifact(&dir, b"0123456789");

    mount_group(&server, "beta", "g-beta").await;
    mount_group(&server, "qa", "g-qa").await;
    mount_session(&server, 10, 4, 3).await;

    for (n, last) in [(1, false), (2, false), (3, true)] {
        let mut mock = Mock::given(method("PUT"))
            .and(path(format!("/chunks/{UPLOAD_ID}/{n}")))
            .and(header("X-Chunk-Number", n.to_string().as_str()))
            .and(header("Content-Type", "application/octet-stream"));
        if last {
            mock = mock.and(header("X-Last-Chunk", "true"));
        }
        mock.respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(format!("/v0.1/apps/acme/android/uploads/releases/{UPLOAD_ID}")))
        .respond_with(StatusSequence {
            polls: AtomicUsize::new(0),
            ready_after: 2,
        })
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v0.1/apps/acme/android/releases/rel-42"))
        .and(body_partial_json(json!({
            "destinations": [
                { "id": "g-beta", "name": "beta" },
                { "id": "g-qa", "name": "qa" }
            ],
            "release_notes": "Nightly build",
            "notify_testers": true,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = orchestrator(&server)
        .run(&request(&artifact), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        UploadOutcome::Success {
            release_id: "rel-42".to_string()
        }
    );
}

#[tokio::test]
async fn test_chunk_bodies_cover_artifact_exactly() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().expect("failed to create temp dir");
    let content = b"abcdefghij";
    let artifact = write_artifact(&dir, content);

    mount_group(&server, "beta", "g-beta").await;
    mount_group(&server, "qa", "g-qa").await;
    mount_session(&server, 10, 4, 3).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v0.1/apps/acme/android/uploads/releases/{UPLOAD_ID}")))
        .respond_with(StatusSequence {
            polls: AtomicUsize::new(0),
            ready_after: 1,
        })
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v0.1/apps/acme/android/releases/rel-42"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let outcome = orchestrator(&server)
        .run(&request(&artifact), &CancellationToken::new())
        .await;
    assert!(outcome.is_success(), "unexpected outcome: {outcome}");

    let received = server.received_requests().await.unwrap();
    let mut chunks: Vec<(u32, Vec<u8>)> = received
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| {
            let number = r
                .headers
                .get("X-Chunk-Number")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap();
            (number, r.body.clone())
        })
        .collect();
    chunks.sort_by_key(|(n, _)| *n);

    let lengths: Vec<usize> = chunks.iter().map(|(_, body)| body.len()).collect();
    assert_eq!(lengths, vec![4, 4, 2]);
    let joined: Vec<u8> = chunks.into_iter().flat_map(|(_, body)| body).collect();
    assert_eq!(joined, content);
}

// ==================== Failure Tests ====================

#[tokio::test]
async fn test_unknown_group_stops_before_session() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().expect("failed to create temp dir");
    let artifact = write_artifact(&dir, b"0123456789");

    mount_group(&server, "beta", "g-beta").await;
    Mock::given(method("GET"))
        .and(path("/v0.1/apps/acme/android/distribution_groups/qa"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = orchestrator(&server)
        .run(&request(&artifact), &CancellationToken::new())
        .await;

    let UploadOutcome::Failure(failure) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failure.stage, Stage::Distribution);
    assert_eq!(failure.kind, FailureKind::UnknownGroup);
    assert!(failure.message.contains("qa"));
}

#[tokio::test]
async fn test_rejected_token_reports_auth_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().expect("failed to create temp dir");
    let artifact = write_artifact(&dir, b"0123456789");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = orchestrator(&server)
        .run(&request(&artifact), &CancellationToken::new())
        .await;

    let UploadOutcome::Failure(failure) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::Auth);
}

#[tokio::test]
async fn test_malware_detected_skips_distribution() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().expect("failed to create temp dir");
    let artifact = write_artifact(&dir, b"0123456789");

    mount_group(&server, "beta", "g-beta").await;
    mount_group(&server, "qa", "g-qa").await;
    mount_session(&server, 10, 4, 3).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v0.1/apps/acme/android/uploads/releases/{UPLOAD_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": UPLOAD_ID,
            "upload_status": "malwareDetected",
            "error_details": "binary flagged",
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v0.1/apps/acme/android/releases/rel-42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = orchestrator(&server)
        .run(&request(&artifact), &CancellationToken::new())
        .await;

    let UploadOutcome::Failure(failure) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failure.stage, Stage::Processing);
    assert_eq!(failure.kind, FailureKind::ProcessingFailed);
}

#[tokio::test]
async fn test_cancel_while_processing_aborts() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().expect("failed to create temp dir");
    let artifact = write_artifact(&dir, b"0123456789");

    mount_group(&server, "beta", "g-beta").await;
    mount_group(&server, "qa", "g-qa").await;
    mount_session(&server, 10, 4, 3).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v0.1/apps/acme/android/uploads/releases/{UPLOAD_ID}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": UPLOAD_ID, "upload_status": "processing" })),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let outcome = orchestrator(&server).run(&request(&artifact), &cancel).await;

    assert_eq!(
        outcome,
        UploadOutcome::Aborted {
            stage: Stage::Processing
        }
    );
    assert!(started.elapsed() < Duration::from_secs(4));
}
