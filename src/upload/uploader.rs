//! Concurrent, retried transfer of every chunk in a session.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{Chunk, UploadError};
use crate::retry::{FailureType, RetryFailure, RetryPolicy, retry_transport};
use crate::session::ReleaseUploadSession;
use crate::settings::MAX_CHUNK_CONCURRENCY;
use crate::transport::constants::{CHUNK_NUMBER_HEADER, LAST_CHUNK_HEADER};
use crate::transport::{ApiRequest, Transport, TransportError};

const CONTENT_TYPE: &str = "Content-Type";
const OCTET_STREAM: &str = "application/octet-stream";

/// Transfers an artifact's bytes into an open session.
///
/// At most `concurrency` chunks are read and in flight at once. Each chunk is
/// retried independently; the first chunk that gives up fails the whole
/// upload and drops the transfers still running.
pub struct ChunkUploader {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl ChunkUploader {
    /// Creates an uploader. `concurrency` is clamped to `1..=MAX_CHUNK_CONCURRENCY`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy, concurrency: usize) -> Self {
        Self {
            transport,
            retry,
            concurrency: concurrency.clamp(1, MAX_CHUNK_CONCURRENCY),
        }
    }

    /// Sends every chunk of `path` to the URLs of `session`.
    ///
    /// # Errors
    ///
    /// - [`UploadError::Io`] if the file cannot be read
    /// - [`UploadError::EmptyArtifact`] / [`UploadError::SizeMismatch`] if the
    ///   file does not match the session
    /// - [`UploadError::Rejected`] / [`UploadError::Unauthorized`] on a
    ///   non-retryable response
    /// - [`UploadError::Transport`] on a non-retryable failure with no
    ///   response, such as TLS setup
    /// - [`UploadError::RetriesExhausted`] when a chunk keeps failing
    /// - [`UploadError::Cancelled`] if `cancel` fires
    #[instrument(skip(self, session, cancel), fields(session = %session.id(), chunks = session.chunk_count()))]
    pub async fn upload(
        &self,
        path: &Path,
        session: &ReleaseUploadSession,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let actual = tokio::fs::metadata(path)
            .await
            .map_err(|e| UploadError::io(path, e))?
            .len();
        if actual == 0 {
            return Err(UploadError::EmptyArtifact {
                path: path.to_path_buf(),
            });
        }
        if actual != session.file_size() {
            return Err(UploadError::SizeMismatch {
                path: path.to_path_buf(),
                expected: session.file_size(),
                actual,
            });
        }

        let plan = session.chunk_plan();
        let mut transfers = stream::iter(plan.chunks(session.chunk_urls()))
            .map(|chunk| self.upload_chunk(path, chunk, cancel))
            .buffer_unordered(self.concurrency);

        let mut done = 0u64;
        while let Some(result) = transfers.next().await {
            result?;
            done += 1;
            debug!(done, total = plan.chunk_count(), "chunk acknowledged");
        }

        info!(bytes = actual, chunks = done, "all chunks uploaded");
        Ok(())
    }

    async fn upload_chunk(
        &self,
        path: &Path,
        chunk: Chunk,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let sequence = chunk.sequence();
        let data = read_chunk(path, &chunk).await?;
        let mut request = ApiRequest::put_url(chunk.url)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .header(CHUNK_NUMBER_HEADER, sequence.to_string())
            .bytes(data);
        if chunk.range.is_last {
            request = request.header(LAST_CHUNK_HEADER, "true");
        }

        let transport = &self.transport;
        let result = retry_transport(&self.retry, cancel, "chunk upload", |attempt| {
            let request = request.clone();
            debug!(chunk = sequence, attempt, "sending chunk");
            async move { transport.send(request).await }
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(RetryFailure::Cancelled) => Err(UploadError::Cancelled),
            Err(RetryFailure::Failed {
                error,
                failure_type,
                attempts,
            }) => Err(match failure_type {
                FailureType::NeedsAuth => UploadError::Unauthorized {
                    chunk: sequence,
                    source: error,
                },
                FailureType::Permanent => match error {
                    TransportError::HttpStatus { .. } => UploadError::Rejected {
                        chunk: sequence,
                        source: error,
                    },
                    _ => UploadError::Transport {
                        chunk: sequence,
                        source: error,
                    },
                },
                FailureType::Transient | FailureType::RateLimited => {
                    UploadError::RetriesExhausted {
                        chunk: sequence,
                        attempts,
                        source: error,
                    }
                }
            }),
        }
    }
}

/// Reads exactly the bytes of `chunk` with a dedicated file handle.
async fn read_chunk(path: &Path, chunk: &Chunk) -> Result<Bytes, UploadError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| UploadError::io(path, e))?;
    file.seek(SeekFrom::Start(chunk.range.offset))
        .await
        .map_err(|e| UploadError::io(path, e))?;

    let length = usize::try_from(chunk.range.length).map_err(|_| {
        UploadError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "chunk larger than memory"),
        )
    })?;
    let mut buffer = vec![0u8; length];
    file.read_exact(&mut buffer)
        .await
        .map_err(|e| UploadError::io(path, e))?;
    Ok(Bytes::from(buffer))
}
