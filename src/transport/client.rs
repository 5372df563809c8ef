//! `reqwest`-backed [`Transport`] implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, Proxy};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{
    API_TOKEN_HEADER, CONNECT_TIMEOUT_SECS, DEFAULT_BASE_URL, MAX_ERROR_BODY_CHARS,
    REQUEST_TIMEOUT_SECS,
};
use super::{ApiRequest, ApiResponse, RequestBody, RequestTarget, Transport, TransportError};
use crate::user_agent;

/// Forward proxy settings, passed in explicitly by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Optional proxy user.
    pub username: Option<String>,
    /// Optional proxy password (only used with a username).
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Creates an unauthenticated proxy configuration.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Adds basic-auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    fn proxy_url(&self) -> String {
        if self.host.contains("://") {
            format!("{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    fn to_reqwest(&self) -> Result<Proxy, TransportError> {
        let proxy = Proxy::all(self.proxy_url()).map_err(|e| TransportError::ClientBuild {
            reason: format!("invalid proxy {}:{}: {e}", self.host, self.port),
        })?;
        Ok(match &self.username {
            Some(user) => proxy.basic_auth(user, self.password.as_deref().unwrap_or_default()),
            None => proxy,
        })
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything the transport needs: token, endpoint, proxy and timeouts.
#[derive(Clone)]
pub struct TransportConfig {
    api_token: String,
    base_url: Url,
    proxy: Option<ProxyConfig>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl TransportConfig {
    /// Creates a configuration for the production endpoint with default timeouts.
    ///
    /// # Panics
    ///
    /// Never in practice: the default base URL is a valid static literal.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            proxy: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Overrides the service base URL (e.g. a mock server in tests).
    ///
    /// A trailing slash is added when missing so relative paths join under it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `base_url` does not parse or
    /// is not http(s).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, TransportError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let parsed =
            Url::parse(&normalized).map_err(|_| TransportError::invalid_url(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::invalid_url(base_url.to_string()));
        }
        self.base_url = parsed;
        Ok(self)
    }

    /// Routes all traffic through a forward proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Overrides connect and request timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the configured proxy, if any.
    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("proxy", &self.proxy)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// HTTP transport for the distribution service.
///
/// Cheap to clone; clones share the underlying connection pool. Holds no
/// per-call state, so one instance can serve concurrent uploads.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    api_token: String,
    base_url: Url,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Builds the transport from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the proxy is malformed or
    /// the HTTP client cannot be constructed.
    #[instrument(level = "debug", skip(config), fields(base_url = %config.base_url))]
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent());
        if let Some(proxy) = &config.proxy {
            debug!(host = %proxy.host, port = proxy.port, "using forward proxy");
            builder = builder.proxy(proxy.to_reqwest()?);
        }
        let client = builder.build().map_err(|e| TransportError::ClientBuild {
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_token: config.api_token,
            base_url: config.base_url,
        })
    }

    fn resolve(&self, target: &RequestTarget) -> Result<Url, TransportError> {
        match target {
            RequestTarget::Path(path) => self
                .base_url
                .join(path.trim_start_matches('/'))
                .map_err(|_| TransportError::invalid_url(path.clone())),
            RequestTarget::Url(url) => {
                Url::parse(url).map_err(|_| TransportError::invalid_url(url.clone()))
            }
        }
    }

    /// The token only goes to the service origin; pre-signed chunk URLs on
    /// other hosts never see it.
    fn carries_token(&self, target: &RequestTarget, url: &Url) -> bool {
        match target {
            RequestTarget::Path(_) => true,
            RequestTarget::Url(_) => url.origin() == self.base_url.origin(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, target = %request.target))]
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(&request.target)?;
        let url_text = url.to_string();

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(ACCEPT, "application/json");
        if self.carries_token(&request.target, &url) {
            builder = builder.header(API_TOKEN_HEADER, &self.api_token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::timeout(url_text.clone())
            } else {
                TransportError::network(url_text.clone(), e)
            }
        })?;

        let status = response.status();
        let status_code = status.as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::timeout(url_text.clone())
            } else {
                TransportError::network(url_text.clone(), e)
            }
        })?;

        debug!(status = status_code, bytes = body.len(), "response received");

        if status.is_success() || status.is_redirection() || request.accept.contains(&status_code)
        {
            return Ok(ApiResponse::new(status_code, url_text, body));
        }

        if matches!(status_code, 401 | 403) {
            return Err(TransportError::unauthorized(url_text, status_code));
        }

        let body_text: String = String::from_utf8_lossy(&body)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect();
        Err(TransportError::http_status_with_retry_after(
            url_text,
            status_code,
            body_text.trim(),
            retry_after,
        ))
    }
}
