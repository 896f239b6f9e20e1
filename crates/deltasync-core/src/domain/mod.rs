//! Domain entities and business logic
//!
//! This module contains the core domain types for the delta sync engine:
//! - Newtypes for cursors and session identifiers
//! - Change records and the record validator
//! - Type filters shared by both transports
//! - Incremental framing of the streaming body into JSON values
//! - Session state, the cursor store and the stop handle
//! - Domain-specific error types

pub mod errors;
pub mod filter;
pub mod framing;
pub mod newtypes;
pub mod record;
pub mod session;

// Re-export commonly used types
pub use errors::{DomainError, SyncError};
pub use filter::DeltaFilter;
pub use framing::{Frame, RecordFramer};
pub use newtypes::*;
pub use record::{validate, BogusReason, ChangeRecord, EventKind, Validation};
pub use session::{CursorStore, SessionState, StopHandle, SyncSession, SyncSummary};
