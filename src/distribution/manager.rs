//! Group resolution and release assignment calls.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{DestinationId, DistributionError, parse_distribution_groups};
use crate::api::{self, DistributionGroupResponse};
use crate::request::UploadRequest;
use crate::retry::{FailureType, RetryFailure, RetryPolicy, retry_transport};
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Resolves distribution groups and assigns releases to them.
pub struct DistributionManager {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl DistributionManager {
    /// Creates a manager. `retry` applies to both lookups and the assignment.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Resolves every group named in `groups` to its service identifier.
    ///
    /// Lookups run one after another in the order the groups were given.
    ///
    /// # Errors
    ///
    /// - [`DistributionError::NoGroups`] if `groups` names nothing
    /// - [`DistributionError::UnknownGroup`] for the first group the service does not know
    /// - [`DistributionError::Unauthorized`] / [`DistributionError::Transport`] when a lookup fails
    /// - [`DistributionError::Cancelled`] if `cancel` fires
    #[instrument(skip(self, groups, cancel))]
    pub async fn resolve_destinations(
        &self,
        owner: &str,
        app: &str,
        groups: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DestinationId>, DistributionError> {
        let names = parse_distribution_groups(groups);
        if names.is_empty() {
            return Err(DistributionError::NoGroups);
        }

        let mut destinations = Vec::with_capacity(names.len());
        for name in names {
            let path = api::distribution_group_path(owner, app, &name);
            let response = self
                .send_with_retry("resolve distribution group", cancel, || {
                    ApiRequest::get(path.clone()).accept(404)
                })
                .await
                .map_err(lookup_error)?;

            if response.status == 404 {
                return Err(DistributionError::UnknownGroup { name });
            }
            let group: DistributionGroupResponse = response
                .json()
                .map_err(|e| DistributionError::transport("resolve distribution group", e))?;
            debug!(group = %name, id = %group.id, "distribution group resolved");
            destinations.push(DestinationId::new(name, group.id));
        }

        info!(count = destinations.len(), "distribution groups resolved");
        Ok(destinations)
    }

    /// Assigns `release_id` to `destinations` with the request's notes and
    /// notification flag, in one call.
    ///
    /// # Errors
    ///
    /// - [`DistributionError::ServerRejected`] when the service refuses the assignment
    /// - [`DistributionError::Unauthorized`] / [`DistributionError::Transport`] on request failure
    /// - [`DistributionError::Cancelled`] if `cancel` fires
    #[instrument(skip(self, request, destinations, cancel), fields(destinations = destinations.len()))]
    pub async fn distribute(
        &self,
        request: &UploadRequest,
        release_id: &str,
        destinations: &[DestinationId],
        cancel: &CancellationToken,
    ) -> Result<(), DistributionError> {
        let body = assignment_body(request, destinations);
        let path = api::release_path(request.owner_name(), request.app_name(), release_id);

        self.send_with_retry("assign release", cancel, || {
            ApiRequest::patch(path.clone()).json(body.clone())
        })
        .await
        .map_err(|failure| assignment_error("assign release", failure))?;

        info!(
            notify_testers = request.notify_testers(),
            "release assigned to distribution groups"
        );
        Ok(())
    }

    async fn send_with_retry<B>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        build: B,
    ) -> Result<ApiResponse, RetryFailure>
    where
        B: Fn() -> ApiRequest,
    {
        let transport = &self.transport;
        retry_transport(&self.retry, cancel, operation, |_| {
            let call = build();
            async move { transport.send(call).await }
        })
        .await
    }
}

fn assignment_body(request: &UploadRequest, destinations: &[DestinationId]) -> serde_json::Value {
    let mut body = json!({
        "destinations": destinations.iter().map(DestinationId::to_body).collect::<Vec<_>>(),
        "notify_testers": request.notify_testers(),
    });
    if let Some(notes) = request.release_notes() {
        body["release_notes"] = json!(notes);
    }
    body
}

/// Group lookups happen before any release exists, so a refused lookup is a
/// failed call, never an assignment rejection.
fn lookup_error(failure: RetryFailure) -> DistributionError {
    match failure {
        RetryFailure::Cancelled => DistributionError::Cancelled,
        RetryFailure::Failed { error, .. } => {
            DistributionError::transport("resolve distribution group", error)
        }
    }
}

fn assignment_error(operation: &'static str, failure: RetryFailure) -> DistributionError {
    match failure {
        RetryFailure::Cancelled => DistributionError::Cancelled,
        RetryFailure::Failed {
            error,
            failure_type: FailureType::Permanent,
            ..
        } => match rejected_status(&error) {
            Some(status) => DistributionError::ServerRejected {
                status,
                source: error,
            },
            None => DistributionError::transport(operation, error),
        },
        RetryFailure::Failed { error, .. } => DistributionError::transport(operation, error),
    }
}

fn rejected_status(error: &TransportError) -> Option<u16> {
    match error {
        TransportError::HttpStatus { status, .. } if (400..500).contains(status) => Some(*status),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;

    use super::*;
    use crate::test_support::{ScriptedTransport, empty_response, json_response};
    use crate::transport::RequestBody;

    fn retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50), 2.0)
            .with_jitter(Duration::ZERO)
    }

    fn group_lookup(request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let target = request.target.to_string();
        let name = target.rsplit('/').next().unwrap_or_default();
        match name {
            "beta" => json_response(200, &json!({ "id": "g-beta", "name": "beta" })),
            "QA%20Team" => json_response(200, &json!({ "id": "g-qa", "name": "QA Team" })),
            _ => empty_response(404),
        }
    }

    // ==================== Resolution Tests ====================

    #[tokio::test]
    async fn test_resolve_destinations_in_order() {
        let transport = Arc::new(ScriptedTransport::new(group_lookup));
        let manager = DistributionManager::new(transport.clone(), retry());

        let destinations = manager
            .resolve_destinations("acme", "app", "beta, QA Team\nbeta", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            destinations,
            vec![
                DestinationId::new("beta", "g-beta"),
                DestinationId::new("QA Team", "g-qa")
            ]
        );
        assert_eq!(transport.requests().len(), 2);
        assert!(transport.requests()[0].accept.contains(&404));
    }

    #[tokio::test]
    async fn test_unknown_group_fails_whole_resolution() {
        let transport = Arc::new(ScriptedTransport::new(group_lookup));
        let manager = DistributionManager::new(transport, retry());

        let err = manager
            .resolve_destinations("acme", "app", "beta, ghosts", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DistributionError::UnknownGroup { ref name } if name == "ghosts"));
    }

    #[tokio::test]
    async fn test_no_groups() {
        let transport = Arc::new(ScriptedTransport::new(group_lookup));
        let manager = DistributionManager::new(transport.clone(), retry());

        let err = manager
            .resolve_destinations("acme", "app", " , ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DistributionError::NoGroups));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refused_lookup_is_not_an_assignment_rejection() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Err(TransportError::http_status("u", 400, "bad group name"))
        }));
        let manager = DistributionManager::new(transport.clone(), retry());

        let err = manager
            .resolve_destinations("acme", "app", "beta", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                DistributionError::Transport {
                    operation: "resolve distribution group",
                    ..
                }
            ),
            "{err:?}"
        );
        assert!(!err.to_string().contains("assignment"));
        assert_eq!(transport.requests().len(), 1);
    }

    // ==================== Assignment Tests ====================

    #[tokio::test]
    async fn test_distribute_sends_one_patch_with_all_destinations() {
        let transport = Arc::new(ScriptedTransport::new(|_| empty_response(200)));
        let manager = DistributionManager::new(transport.clone(), retry());
        let request = UploadRequest::new("acme", "app", "beta,qa", "app.apk")
            .with_release_notes(Some("Bug fixes".to_string()))
            .with_notify_testers(false);
        let destinations = [DestinationId::new("beta", "g-1"), DestinationId::new("qa", "g-2")];

        manager
            .distribute(&request, "rel-42", &destinations, &CancellationToken::new())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::PATCH);
        assert_eq!(requests[0].target.to_string(), "v0.1/apps/acme/app/releases/rel-42");
        let RequestBody::Json(body) = &requests[0].body else {
            panic!("expected JSON body");
        };
        assert_eq!(body["destinations"][0]["id"], "g-1");
        assert_eq!(body["destinations"][1]["name"], "qa");
        assert_eq!(body["release_notes"], "Bug fixes");
        assert_eq!(body["notify_testers"], false);
    }

    #[test]
    fn test_distribute_omits_absent_notes() {
        let request = UploadRequest::new("acme", "app", "beta", "app.apk");
        let body = assignment_body(&request, &[DestinationId::new("beta", "g-1")]);
        assert!(body.get("release_notes").is_none());
        assert_eq!(body["notify_testers"], true);
    }

    #[tokio::test]
    async fn test_validation_rejection_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Err(TransportError::http_status("u", 422, "destinations invalid"))
        }));
        let manager = DistributionManager::new(transport.clone(), retry());
        let request = UploadRequest::new("acme", "app", "beta", "app.apk");

        let err = manager
            .distribute(&request, "rel-1", &[DestinationId::new("beta", "g")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DistributionError::ServerRejected { status: 422, .. }));
        assert!(err.to_string().contains("destinations invalid"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_assignment_failure_is_retried() {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let transport = Arc::new(ScriptedTransport::new(move |_| {
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                Err(TransportError::timeout("u"))
            } else {
                empty_response(200)
            }
        }));
        let manager = DistributionManager::new(transport.clone(), retry());
        let request = UploadRequest::new("acme", "app", "beta", "app.apk");

        manager
            .distribute(&request, "rel-1", &[DestinationId::new("beta", "g")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(transport.requests().len(), 3);
    }
}
