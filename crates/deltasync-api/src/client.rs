//! Change-log API client
//!
//! Provides an authenticated HTTP client for the delta endpoints.
//! Handles the authentication header, base URL construction and mapping of
//! non-success statuses onto [`ApiError`].
//!
//! The server authenticates with HTTP basic auth: the access token is the
//! user name and the password is empty.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use deltasync_api::client::ApiClient;
//! use deltasync_api::delta;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new("access-token-here");
//! let cursor = delta::get_latest_cursor(&client).await?;
//! println!("Head of the change log: {cursor}");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use deltasync_core::config::DEFAULT_BASE_URL;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::ApiError;

/// Default retry-after duration when the header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// HTTP client for change-log API calls
///
/// Wraps `reqwest::Client` with authentication and base URL construction.
/// Cheap to share behind an `Arc`; every domain object produced by the
/// resolver holds one.
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
    /// Access token sent as the basic-auth user name
    access_token: String,
    /// Timeout for request/response calls; never applied to streams
    request_timeout: Option<Duration>,
}

impl ApiClient {
    /// Creates a new ApiClient against the default API host
    ///
    /// # Arguments
    /// * `access_token` - A valid access token for the account
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Creates a new ApiClient with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `access_token` - A valid access token
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            request_timeout: None,
        }
    }

    /// Sets the timeout applied to page and latest-cursor requests
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, ...)
    /// * `path` - API path relative to base URL (e.g., "/delta")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .basic_auth(&self.access_token, None::<&str>)
    }

    /// Sends a request and maps failures onto [`ApiError`]
    ///
    /// Transport failures become [`ApiError::Network`]; non-success
    /// statuses are classified by [`ApiError::from_status`]. No retry is
    /// attempted.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        check_status(response).await
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Passes a success response through, turns anything else into [`ApiError`]
pub async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER);
    let url = response.url().path().to_string();
    let message = response.text().await.unwrap_or_default();

    debug!(%status, path = %url, "Request returned error status");
    Err(ApiError::from_status(status, message, retry_after))
}

/// Parses a `Retry-After` header value
///
/// Accepts either delay-seconds or an HTTP-date. Dates in the past, or more
/// than an hour away, fall back to `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let diff = target - now;
            if let Some(secs) = diff
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
