//! Domain error types
//!
//! This module defines error types specific to domain operations
//! (value validation, session state transitions) and the terminal
//! conditions the sync engine reports to its callers.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid cursor value
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Event kind not recognized by the engine
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    /// The same type tag is both excluded and included
    #[error("Type tag is both excluded and included: {0}")]
    ConflictingTypeFilter(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },
}

/// Terminal conditions raised by the sync engine itself
///
/// Transport failures (HTTP status, connection resets) are reported by the
/// adapter that owns the transport; these variants cover what the engine
/// decides on its own.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No bytes arrived on the streaming connection within the timeout
    #[error("Delta stream inactive for {timeout:?}")]
    StreamInactive {
        /// The configured inactivity timeout
        timeout: Duration,
    },

    /// The session already ran to completion and cannot be reused
    #[error("Sync session {0} has already finished")]
    SessionFinished(String),
}
