//! App Center Upload Core Library
//!
//! This library uploads a build artifact to the App Center distribution
//! service as a new release and assigns that release to tester groups.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`transport`] - HTTP transport with token authentication and error taxonomy
//! - [`retry`] - Exponential backoff shared by every remote call
//! - [`upload`] - Chunk planning and bounded parallel chunk transfer
//! - [`session`] - Release upload session lifecycle and processing polls
//! - [`distribution`] - Distribution group resolution and release assignment
//! - [`orchestrator`] - The end-to-end pipeline folding errors into one outcome
//! - [`validation`] - Predicates for user-supplied fields
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use appcenter_core::transport::{HttpTransport, TransportConfig};
//! use appcenter_core::{UploadOrchestrator, UploadRequest, UploadSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(TransportConfig::new("api-token"))?;
//! let orchestrator = UploadOrchestrator::new(Arc::new(transport), UploadSettings::default());
//! let request = UploadRequest::new("acme", "android", "beta, qa", "app-release.apk");
//!
//! let outcome = orchestrator.run(&request, &CancellationToken::new()).await;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod distribution;
pub mod orchestrator;
mod request;
pub mod retry;
pub mod session;
pub mod settings;
pub mod transport;
pub mod upload;
mod user_agent;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use distribution::{DestinationId, DistributionError, parse_distribution_groups};
pub use orchestrator::{FailureKind, Stage, StageFailure, UploadOrchestrator, UploadOutcome};
pub use request::UploadRequest;
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
pub use session::{ReleaseUploadSession, SessionError, SessionState};
pub use settings::{PollSettings, UploadSettings};
pub use transport::{HttpTransport, ProxyConfig, Transport, TransportConfig, TransportError};
pub use upload::{ChunkPlan, ChunkUploader, UploadError};
pub use validation::{Field, FieldError, validator_for};
