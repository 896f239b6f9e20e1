//! SyncSession domain entity
//!
//! A [`SyncSession`] is the mutable state owned by one `deltas` or
//! `delta_stream` invocation: the [`CursorStore`], the [`DeltaFilter`],
//! the termination flag and a handful of counters. Sessions are never
//! shared between invocations, so nothing here is synchronized except the
//! stop flag, which consumers may trigger from another task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use super::errors::{DomainError, SyncError};
use super::filter::DeltaFilter;
use super::newtypes::{Cursor, SessionId};

// ============================================================================
// CursorStore
// ============================================================================

/// Holds the cursor of the last record fully delivered to the consumer
///
/// The store only moves when told to, and only to cursors taken from
/// records that were actually dispatched; that is what makes it safe to
/// resume from after any failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorStore {
    current: Cursor,
}

impl CursorStore {
    pub fn new(initial: Cursor) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &Cursor {
        &self.current
    }

    /// Moves the store to `to`
    ///
    /// Returns false (and leaves the store untouched) when `to` equals the
    /// current cursor.
    pub fn advance(&mut self, to: &Cursor) -> bool {
        if *to == self.current {
            return false;
        }
        self.current = to.clone();
        true
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle of a session
///
/// Batch: `Idle -> Fetching -> Dispatching -> {Fetching | Done}`.
/// Streaming: `Idle -> Connecting -> Reading -> Dispatching -> Reading ... -> Closed`.
/// Any live state may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Fetching,
    Dispatching,
    Connecting,
    Reading,
    Done,
    Closed,
    Failed,
}

impl SessionState {
    /// Returns true once the session can no longer make progress
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Closed | SessionState::Failed
        )
    }

    fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;

        if to == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, to),
            (Idle, Fetching)
                | (Idle, Connecting)
                | (Fetching, Dispatching)
                | (Fetching, Done)
                | (Dispatching, Fetching)
                | (Dispatching, Done)
                | (Dispatching, Reading)
                | (Dispatching, Closed)
                | (Connecting, Reading)
                | (Connecting, Closed)
                | (Reading, Dispatching)
                | (Reading, Closed)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Fetching => "fetching",
            SessionState::Dispatching => "dispatching",
            SessionState::Connecting => "connecting",
            SessionState::Reading => "reading",
            SessionState::Done => "done",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// StopHandle
// ============================================================================

/// Cloneable termination flag for a session
///
/// Setting it from inside a handler stops dispatch after the current
/// record; setting it from another task also interrupts a stream reader
/// that is waiting for bytes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Completes once [`stop`](Self::stop) has been called
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.0.cancelled()
    }
}

// ============================================================================
// SyncSummary
// ============================================================================

/// Outcome of a callback-mode invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub session_id: SessionId,
    pub start_cursor: Cursor,
    /// Cursor of the last dispatched record (or the start cursor)
    pub final_cursor: Cursor,
    /// Page requests issued (batch only)
    pub pages: u64,
    /// Byte chunks received (streaming only)
    pub chunks: u64,
    pub dispatched: u64,
    pub skipped: u64,
    pub stopped_by_consumer: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// ============================================================================
// SyncSession
// ============================================================================

/// Mutable state of one sync invocation
#[derive(Debug)]
pub struct SyncSession {
    id: SessionId,
    start: Cursor,
    cursor: CursorStore,
    filter: DeltaFilter,
    state: SessionState,
    stop: StopHandle,
    started_at: DateTime<Utc>,
    pages: u64,
    chunks: u64,
    dispatched: u64,
    skipped: u64,
}

impl SyncSession {
    /// Creates an idle session starting at `start`
    pub fn new(start: Cursor, filter: DeltaFilter) -> Self {
        Self {
            id: SessionId::new(),
            cursor: CursorStore::new(start.clone()),
            start,
            filter,
            state: SessionState::Idle,
            stop: StopHandle::new(),
            started_at: Utc::now(),
            pages: 0,
            chunks: 0,
            dispatched: 0,
            skipped: 0,
        }
    }

    /// Creates a session whose termination flag is an existing handle
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn start_cursor(&self) -> &Cursor {
        &self.start
    }

    /// Cursor of the last record delivered to the consumer
    pub fn cursor(&self) -> &Cursor {
        self.cursor.current()
    }

    pub fn filter(&self) -> &DeltaFilter {
        &self.filter
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Leaves `Idle` for the first working state
    ///
    /// # Errors
    /// [`SyncError::SessionFinished`] if the session already ran.
    pub fn begin(&mut self, first: SessionState) -> Result<(), SyncError> {
        if self.state != SessionState::Idle {
            return Err(SyncError::SessionFinished(self.id.to_string()));
        }
        self.started_at = Utc::now();
        self.transition(first)
            .map_err(|_| SyncError::SessionFinished(self.id.to_string()))
    }

    /// Moves to `to` if the lifecycle allows it
    pub fn transition(&mut self, to: SessionState) -> Result<(), DomainError> {
        if self.state == to {
            return Ok(());
        }
        if !self.state.can_transition_to(to) {
            return Err(DomainError::InvalidState {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// Marks the session failed; no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Failed;
        }
    }

    /// Records that a record with `cursor` reached the consumer
    pub fn commit(&mut self, cursor: &Cursor) {
        self.cursor.advance(cursor);
        self.dispatched += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_page(&mut self) {
        self.pages += 1;
    }

    pub fn record_chunk(&mut self) {
        self.chunks += 1;
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            session_id: self.id,
            start_cursor: self.start.clone(),
            final_cursor: self.cursor.current().clone(),
            pages: self.pages,
            chunks: self.chunks,
            dispatched: self.dispatched,
            skipped: self.skipped,
            stopped_by_consumer: self.stop.is_stopped(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
