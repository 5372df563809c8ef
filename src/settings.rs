//! Tunable constants for one upload run.
//!
//! Chunk size is dictated by the server per session; everything else the
//! orchestrator waits on or repeats is collected here with documented
//! defaults so tests can shrink intervals to milliseconds.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default number of chunks transferred concurrently.
pub const DEFAULT_CHUNK_CONCURRENCY: usize = 4;

/// Upper bound for chunk concurrency.
pub const MAX_CHUNK_CONCURRENCY: usize = 16;

/// Default interval between status polls (5 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default ceiling on total processing wait (5 minutes).
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default attempts per status poll on transient failure.
pub const DEFAULT_POLL_RETRY_ATTEMPTS: u32 = 3;

/// Status polling configuration.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Wait between polls; the first poll happens one interval after commit.
    pub interval: Duration,
    /// Wall-clock ceiling on the whole wait, poll requests included.
    pub max_wait: Duration,
    /// Retry policy applied to each individual poll.
    pub retry: RetryPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_POLL_TIMEOUT,
            retry: RetryPolicy::with_max_attempts(DEFAULT_POLL_RETRY_ATTEMPTS),
        }
    }
}

/// Settings for a full orchestrator run.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Retry policy for chunk PUTs and the distribution call.
    pub retry: RetryPolicy,
    /// Status polling.
    pub poll: PollSettings,
    /// Maximum chunks in flight at once.
    pub chunk_concurrency: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            poll: PollSettings::default(),
            chunk_concurrency: DEFAULT_CHUNK_CONCURRENCY,
        }
    }
}

impl UploadSettings {
    /// Sets the chunk concurrency, clamped to `1..=MAX_CHUNK_CONCURRENCY`.
    #[must_use]
    pub fn with_chunk_concurrency(mut self, concurrency: usize) -> Self {
        self.chunk_concurrency = concurrency.clamp(1, MAX_CHUNK_CONCURRENCY);
        self
    }

    /// Replaces the request retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the polling settings.
    #[must_use]
    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }
}
