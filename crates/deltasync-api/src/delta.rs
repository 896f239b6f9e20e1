//! Delta endpoints
//!
//! Request functions and wire types for the three change-log endpoints:
//!
//! | Call | Verb | Path |
//! |------|------|------|
//! | [`get_latest_cursor`] | `POST` | `/delta/latest_cursor` |
//! | [`get_delta_page`] | `GET` | `/delta?cursor=..&exclude_folders=..` |
//! | [`open_delta_stream`] | `GET` | `/delta/streaming?cursor=..&exclude_folders=..` |
//!
//! The latest-cursor call is a POST while the others are GETs; servers
//! route on the verb, so it is kept exactly as observed.
//!
//! Records are returned undecoded (`serde_json::Value`); validating them is
//! the engine's job.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use deltasync_api::client::ApiClient;
//! use deltasync_api::delta;
//! use deltasync_core::domain::{Cursor, DeltaFilter};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new("access-token");
//! let page = delta::get_delta_page(&client, &Cursor::beginning(), &DeltaFilter::new()).await?;
//! println!("Got {} records", page.records.len());
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use deltasync_core::domain::{Cursor, DeltaFilter};
use deltasync_core::ports::{ByteStream, DeltaPage};

use crate::client::ApiClient;
use crate::ApiError;

/// Path of the latest-cursor endpoint
pub const LATEST_CURSOR_PATH: &str = "/delta/latest_cursor";

/// Path of the paginated delta endpoint
pub const DELTA_PATH: &str = "/delta";

/// Path of the streaming delta endpoint
pub const STREAMING_PATH: &str = "/delta/streaming";

// ============================================================================
// Wire types
// ============================================================================

/// Body of `POST /delta/latest_cursor`
#[derive(Debug, Deserialize)]
pub struct LatestCursorResponse {
    pub cursor: String,
}

/// Body of `GET /delta`
#[derive(Debug, Deserialize)]
pub struct DeltaPageResponse {
    /// Cursor the page starts after
    #[serde(default)]
    pub cursor_start: Option<String>,
    /// Cursor the server is caught up to once this page is applied
    #[serde(default)]
    pub cursor_end: Option<String>,
    /// Raw change records, in log order
    #[serde(default)]
    pub deltas: Vec<Value>,
}

impl DeltaPageResponse {
    /// Converts the wire page into the port-level [`DeltaPage`]
    ///
    /// An empty or missing `cursor_end` becomes `None`.
    pub fn into_page(self) -> DeltaPage {
        DeltaPage {
            terminal_cursor: self.cursor_end.and_then(|c| Cursor::new(c).ok()),
            records: self.deltas,
        }
    }
}

/// Query string shared by the paginated and streaming endpoints
///
/// `cursor` always comes first, followed by the filter's parameters.
pub fn delta_query(cursor: &Cursor, filter: &DeltaFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![("cursor", cursor.as_str().to_string())];
    query.extend(filter.query_pairs());
    query
}

// ============================================================================
// Requests
// ============================================================================

/// Fetches the cursor at the head of the change log
///
/// # Errors
///
/// Returns an error wrapping [`ApiError`] if the request fails, the server
/// answers with a non-success status, or the body carries no cursor.
pub async fn get_latest_cursor(client: &ApiClient) -> Result<Cursor> {
    let mut request = client.request(Method::POST, LATEST_CURSOR_PATH);
    if let Some(timeout) = client.request_timeout() {
        request = request.timeout(timeout);
    }

    let response: LatestCursorResponse = client
        .send(request)
        .await
        .context("Latest cursor request failed")?
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
        .context("Failed to parse latest cursor response")?;

    let cursor = Cursor::new(response.cursor)
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
        .context("Latest cursor response carried an empty cursor")?;

    debug!(%cursor, "Received latest cursor");
    Ok(cursor)
}

/// Fetches the page of records following `cursor`
///
/// # Errors
///
/// Returns an error wrapping [`ApiError`] if the request fails, the server
/// answers with a non-success status, or the body is not a delta page.
pub async fn get_delta_page(client: &ApiClient, cursor: &Cursor, filter: &DeltaFilter) -> Result<DeltaPage> {
    let mut request = client
        .request(Method::GET, DELTA_PATH)
        .query(&delta_query(cursor, filter));
    if let Some(timeout) = client.request_timeout() {
        request = request.timeout(timeout);
    }

    let response: DeltaPageResponse = client
        .send(request)
        .await
        .with_context(|| format!("Delta page request failed for cursor {cursor}"))?
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
        .context("Failed to parse delta page response")?;

    debug!(
        %cursor,
        cursor_start = ?response.cursor_start,
        cursor_end = ?response.cursor_end,
        records = response.deltas.len(),
        "Received delta page"
    );
    Ok(response.into_page())
}

/// Opens the streaming endpoint and returns its body as a byte stream
///
/// Returns once the response headers arrive. No request timeout applies:
/// the connection is expected to stay open indefinitely.
///
/// # Errors
///
/// Returns an error wrapping [`ApiError`] if the connection cannot be
/// established or the server answers with a non-success status. Failures
/// while reading the body surface as [`ApiError::Network`] items of the
/// returned stream.
pub async fn open_delta_stream(client: &ApiClient, cursor: &Cursor, filter: &DeltaFilter) -> Result<ByteStream> {
    let request = client
        .request(Method::GET, STREAMING_PATH)
        .query(&delta_query(cursor, filter));

    let response = client
        .send(request)
        .await
        .with_context(|| format!("Failed to open delta stream at cursor {cursor}"))?;

    debug!(%cursor, status = %response.status(), "Delta stream connected");

    Ok(response
        .bytes_stream()
        .map_err(|e| anyhow::Error::new(ApiError::Network(e)))
        .boxed())
}
