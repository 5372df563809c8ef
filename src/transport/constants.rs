//! Constants for the transport module (timeouts, headers, defaults).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP request timeout (5 minutes, large chunks on slow links).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.appcenter.ms/";

/// Header carrying the static API token.
pub const API_TOKEN_HEADER: &str = "X-API-Token";

/// Header carrying the 1-based chunk sequence number.
pub const CHUNK_NUMBER_HEADER: &str = "X-Chunk-Number";

/// Header marking the final chunk of an upload.
pub const LAST_CHUNK_HEADER: &str = "X-Last-Chunk";

/// Maximum number of response body bytes kept in error messages.
pub const MAX_ERROR_BODY_CHARS: usize = 512;
