//! Streaming delta use case
//!
//! Opens one persistent connection to the change log and dispatches records
//! as their bytes arrive. The body is an unbounded concatenation of JSON
//! values; [`RecordFramer`] peels complete ones off as chunks come in.
//!
//! The read loop ends when:
//! - the server closes the connection (normal end),
//! - the stop handle is set, either from the handler or from another task,
//! - no bytes arrive within the inactivity timeout, if one is configured,
//! - the transport reports an error.
//!
//! Only the last two are errors. There is no reconnection; callers resume
//! by opening a new session at the summary's final cursor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::domain::{
    BogusReason, EventKind, Frame, RecordFramer, SessionState, SyncError, SyncSession, SyncSummary,
};
use crate::ports::{ByteStream, IChangeLog, IObjectResolver};
use crate::usecases::dispatch::Dispatcher;

/// Use case for consuming the streaming change log
pub struct StreamDeltasUseCase<L: ?Sized, R> {
    change_log: Arc<L>,
    resolver: Arc<R>,
}

impl<L, R> StreamDeltasUseCase<L, R>
where
    L: IChangeLog + ?Sized,
    R: IObjectResolver,
{
    pub fn new(change_log: Arc<L>, resolver: Arc<R>) -> Self {
        Self {
            change_log,
            resolver,
        }
    }

    /// Streams every change after the session's start cursor into `handler`
    ///
    /// # Arguments
    ///
    /// * `session` - Fresh session; its stop handle ends the stream
    /// * `inactivity_timeout` - Maximum silence between chunks, `None` to
    ///   wait forever
    /// * `handler` - Called once per valid, resolved record, in arrival order
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StreamInactive`] on timeout, or the transport's
    /// error if the connection fails. Either way the session cursor still
    /// reflects every record the handler received.
    pub async fn execute<F>(
        &self,
        session: &mut SyncSession,
        inactivity_timeout: Option<Duration>,
        mut handler: F,
    ) -> Result<SyncSummary>
    where
        F: FnMut(EventKind, R::Object),
    {
        session.begin(SessionState::Connecting)?;
        info!(
            session = %session.id(),
            cursor = %session.start_cursor(),
            "Opening delta stream"
        );

        if let Err(e) = self.run(session, inactivity_timeout, &mut handler).await {
            warn!(session = %session.id(), cursor = %session.cursor(), error = %e, "Delta stream failed");
            session.fail();
            return Err(e);
        }

        let summary = session.summary();
        info!(
            session = %summary.session_id,
            chunks = summary.chunks,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            cursor = %summary.final_cursor,
            stopped = summary.stopped_by_consumer,
            "Delta stream closed"
        );
        Ok(summary)
    }

    async fn run<F>(
        &self,
        session: &mut SyncSession,
        inactivity_timeout: Option<Duration>,
        handler: &mut F,
    ) -> Result<()>
    where
        F: FnMut(EventKind, R::Object),
    {
        let stop = session.stop_handle();
        if stop.is_stopped() {
            session.transition(SessionState::Closed)?;
            return Ok(());
        }

        let mut body = self
            .change_log
            .open_stream(session.start_cursor(), session.filter())
            .await
            .context("Failed to open delta stream")?;
        session.transition(SessionState::Reading)?;

        let dispatcher = Dispatcher::new(self.resolver.as_ref());
        let mut framer = RecordFramer::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = stop.stopped() => {
                    debug!(session = %session.id(), "Delta stream stopped while waiting for data");
                    break;
                }
                chunk = next_chunk(&mut body, inactivity_timeout) => chunk?,
            };

            let Some(bytes) = chunk else {
                if framer.buffered() > 0 {
                    debug!(
                        session = %session.id(),
                        bytes = framer.buffered(),
                        "Discarding partial record at end of stream"
                    );
                    session.record_skip();
                }
                break;
            };

            session.record_chunk();
            framer.push(&bytes);

            while let Some(frame) = framer.next_frame() {
                match frame {
                    Frame::Value(raw) => {
                        session.transition(SessionState::Dispatching)?;
                        dispatcher.dispatch(raw, session, handler);
                        session.transition(SessionState::Reading)?;
                    }
                    Frame::Malformed { discarded } => {
                        debug!(
                            session = %session.id(),
                            discarded,
                            reason = %BogusReason::Undecodable,
                            "Skipping bogus delta record"
                        );
                        session.record_skip();
                    }
                }
                if stop.is_stopped() {
                    break;
                }
            }
            if stop.is_stopped() {
                info!(session = %session.id(), "Delta stream stopped by consumer");
                break;
            }
        }

        session.transition(SessionState::Closed)?;
        Ok(())
    }
}

/// Waits for the next chunk of the body
///
/// `Ok(None)` means the server closed the connection.
async fn next_chunk(body: &mut ByteStream, inactivity_timeout: Option<Duration>) -> Result<Option<Bytes>> {
    let item = match inactivity_timeout {
        Some(timeout) => tokio::time::timeout(timeout, body.next())
            .await
            .map_err(|_| SyncError::StreamInactive { timeout })?,
        None => body.next().await,
    };
    item.transpose().context("Delta stream connection failed")
}
