//! Bounded HTTP client for the hosting API.
//!
//! Every call carries the same authentication and API-version headers and is
//! cancelled after a fixed upper bound. Non-2xx responses are returned to the
//! caller as-is; [`HostingResponse::error_for_status`] turns them into
//! [`HostingError::Rejected`] when the caller has no special handling.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::HostingError;

/// Per-call upper bound used when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// API version pinned on every request.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// One outbound request, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct HostingRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl HostingRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a query parameter. Values are percent-encoded when sent.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Fully-read response from the hosting API.
#[derive(Debug, Clone)]
pub struct HostingResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HostingResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Passes 2xx responses through and converts anything else to
    /// [`HostingError::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns `Rejected` carrying the status and body for non-2xx responses.
    pub fn error_for_status(self) -> Result<Self, HostingError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HostingError::Rejected {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HostingError::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HostingError> {
        serde_json::from_str(&self.body).map_err(|e| HostingError::Decode(e.to_string()))
    }
}

/// HTTP client with fixed auth headers and a hard per-call deadline.
///
/// Holds no state between calls beyond the underlying `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct BoundedClient {
    http: reqwest::Client,
    base_url: String,
    fixed_headers: HeaderMap,
    timeout: Duration,
}

impl BoundedClient {
    /// Creates a client for `base_url` authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`HostingError::Config`] if the token cannot be encoded as a
    /// header value or the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, HostingError> {
        let mut fixed_headers = HeaderMap::new();
        fixed_headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| HostingError::Config(format!("github token: {e}")))?;
        auth.set_sensitive(true);
        fixed_headers.insert(AUTHORIZATION, auth);
        fixed_headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        fixed_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("gitexport/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| HostingError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fixed_headers,
            timeout,
        })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one request and reads the whole response body.
    ///
    /// Caller headers are applied first and the fixed headers after them, so
    /// a caller can add headers but never replace the auth or version headers.
    ///
    /// # Errors
    ///
    /// Returns [`HostingError::Timeout`] if the call (including reading the
    /// body) exceeds the bound, or [`HostingError::Transport`] on network
    /// failure. Non-2xx statuses are not errors at this level.
    pub async fn call(&self, request: HostingRequest) -> Result<HostingResponse, HostingError> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = request.method.clone();

        let mut builder = self
            .http
            .request(request.method, &url)
            .headers(request.headers)
            .headers(self.fixed_headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(HostingResponse { status, body })
        };

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(response)) => {
                debug!(%method, path = %request.path, status = response.status.as_u16(), "hosting call");
                Ok(response)
            }
            Ok(Err(e)) if e.is_timeout() => Err(HostingError::Timeout { timeout_ms }),
            Ok(Err(e)) => Err(HostingError::Transport(e.to_string())),
            Err(_elapsed) => Err(HostingError::Timeout { timeout_ms }),
        }
    }
}
