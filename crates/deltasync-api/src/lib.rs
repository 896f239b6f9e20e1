//! deltasync API - HTTP adapter for the delta sync engine
//!
//! Provides the async pieces that connect `deltasync-core` to a live server:
//! - An authenticated HTTP client for the `/delta` endpoints
//! - Wire types and request functions for the three delta endpoints
//! - The domain object model produced from change records
//! - Port implementations (`IChangeLog`, `IObjectResolver`)
//! - The [`Inbox`](inbox::Inbox) facade tying them together
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client
//! - [`delta`] - Latest cursor, paginated and streaming delta requests
//! - [`models`] - `DomainObject` and its shared `Resource` payload
//! - [`resolver`] - Type tag to `DomainObject` mapping
//! - [`provider`] - `IChangeLog` implementation over the client
//! - [`inbox`] - High-level entry points

pub mod client;
pub mod delta;
pub mod inbox;
pub mod models;
pub mod provider;
pub mod resolver;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the change-log API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The access token is missing, invalid or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token is valid but lacks access to the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested endpoint does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; the server asked to wait before retrying
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// The HTTP status returned
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Any other non-success status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// The HTTP status returned
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Classifies a non-success HTTP status
    ///
    /// `retry_after` is only used for 429 responses.
    pub fn from_status(status: StatusCode, message: String, retry_after: Duration) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ApiError::TooManyRequests { retry_after },
            s if s.is_server_error() => ApiError::ServerError {
                status: s.as_u16(),
                message,
            },
            s => ApiError::UnexpectedStatus {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Returns true for failures caused by the credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::Forbidden(_))
    }
}
