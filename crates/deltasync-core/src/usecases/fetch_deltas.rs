//! Paginated delta fetch use case
//!
//! Polls the change log page by page until the server reports no further
//! changes, feeding every record through the [`Dispatcher`].
//!
//! ## Pagination
//!
//! 1. Request the page after the session's start cursor
//! 2. Dispatch its records in order
//! 3. Stop if the page is empty or its terminal cursor equals the cursor
//!    the request was made with; otherwise request the page after the last
//!    record's cursor and repeat
//!
//! Page sizes are server-controlled, so the loop never counts pages to
//! decide when it is done.
//!
//! Two consumption modes share this loop: [`FetchDeltasUseCase::execute`]
//! pushes every object into a handler, [`FetchDeltasUseCase::deltas`]
//! returns a [`Deltas`] producer that pulls pages on demand.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::Stream;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{Cursor, DeltaFilter, EventKind, SessionState, SyncSession, SyncSummary};
use crate::ports::{DeltaPage, IChangeLog, IObjectResolver};
use crate::usecases::dispatch::Dispatcher;

/// Use case for pulling changes through the paginated endpoint
pub struct FetchDeltasUseCase<L: ?Sized, R> {
    change_log: Arc<L>,
    resolver: Arc<R>,
}

impl<L, R> FetchDeltasUseCase<L, R>
where
    L: IChangeLog + ?Sized,
    R: IObjectResolver,
{
    /// Creates a new FetchDeltasUseCase with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `change_log` - Transport for the paginated change log
    /// * `resolver` - Maps validated records to domain objects
    pub fn new(change_log: Arc<L>, resolver: Arc<R>) -> Self {
        Self {
            change_log,
            resolver,
        }
    }

    /// Returns the cursor at the head of the change log
    ///
    /// One request, no pagination, no record processing.
    pub async fn latest_cursor(&self) -> Result<Cursor> {
        let cursor = self
            .change_log
            .latest_cursor()
            .await
            .context("Failed to fetch latest cursor")?;
        debug!(%cursor, "Fetched latest cursor");
        Ok(cursor)
    }

    /// Pulls every change after the session's start cursor into `handler`
    ///
    /// The handler runs once per valid, resolved record, in page order and
    /// then within-page order. The session cursor advances after each call.
    /// Setting the session's stop handle ends the pull after the current
    /// record.
    ///
    /// # Errors
    ///
    /// Returns an error if a page request fails. The session's cursor still
    /// reflects every record the handler received, so the caller can resume
    /// from it.
    pub async fn execute<F>(&self, session: &mut SyncSession, mut handler: F) -> Result<SyncSummary>
    where
        F: FnMut(EventKind, R::Object),
    {
        session.begin(SessionState::Fetching)?;
        info!(
            session = %session.id(),
            cursor = %session.start_cursor(),
            "Starting delta pull"
        );

        if let Err(e) = self.run(session, &mut handler).await {
            session.fail();
            return Err(e);
        }

        let summary = session.summary();
        info!(
            session = %summary.session_id,
            pages = summary.pages,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            cursor = %summary.final_cursor,
            "Delta pull complete"
        );
        Ok(summary)
    }

    async fn run<F>(&self, session: &mut SyncSession, handler: &mut F) -> Result<()>
    where
        F: FnMut(EventKind, R::Object),
    {
        let dispatcher = Dispatcher::new(self.resolver.as_ref());
        let mut request_cursor = session.start_cursor().clone();

        if session.is_stopped() {
            session.transition(SessionState::Done)?;
            return Ok(());
        }

        loop {
            session.transition(SessionState::Fetching)?;
            let page = fetch_page(self.change_log.as_ref(), &request_cursor, session).await?;
            let next = next_request_cursor(&request_cursor, &page);

            if !page.records.is_empty() {
                session.transition(SessionState::Dispatching)?;
            }
            for raw in page.records {
                dispatcher.dispatch(raw, session, handler);
                if session.is_stopped() {
                    info!(session = %session.id(), "Delta pull stopped by consumer");
                    session.transition(SessionState::Done)?;
                    return Ok(());
                }
            }

            match next {
                Some(cursor) => request_cursor = cursor,
                None => {
                    session.transition(SessionState::Done)?;
                    return Ok(());
                }
            }
        }
    }

    /// Returns a lazy producer of every change after `start`
    ///
    /// Nothing is fetched until the producer is iterated. Each call to
    /// [`Deltas::iter`] re-runs the whole pagination from `start`.
    pub fn deltas(&self, start: Cursor, filter: DeltaFilter) -> Deltas<L, R> {
        Deltas {
            change_log: Arc::clone(&self.change_log),
            resolver: Arc::clone(&self.resolver),
            start,
            filter,
        }
    }
}

/// Restartable, finite producer of `(event, object)` pairs
pub struct Deltas<L: ?Sized, R> {
    change_log: Arc<L>,
    resolver: Arc<R>,
    start: Cursor,
    filter: DeltaFilter,
}

impl<L, R> Deltas<L, R>
where
    L: IChangeLog + ?Sized,
    R: IObjectResolver,
{
    pub fn start_cursor(&self) -> &Cursor {
        &self.start
    }

    /// Starts a fresh pass over the change log
    pub fn iter(&self) -> DeltaIter<L, R> {
        DeltaIter {
            change_log: Arc::clone(&self.change_log),
            resolver: Arc::clone(&self.resolver),
            session: SyncSession::new(self.start.clone(), self.filter.clone()),
            pending: VecDeque::new(),
            next_request: Some(self.start.clone()),
        }
    }

    /// Runs one full pass and collects the results
    pub async fn collect(&self) -> Result<Vec<(EventKind, R::Object)>> {
        let mut iter = self.iter();
        let mut items = Vec::new();
        while let Some(item) = iter.next().await? {
            items.push(item);
        }
        Ok(items)
    }
}

/// One pass of a [`Deltas`] producer
pub struct DeltaIter<L: ?Sized, R> {
    change_log: Arc<L>,
    resolver: Arc<R>,
    session: SyncSession,
    pending: VecDeque<Value>,
    next_request: Option<Cursor>,
}

impl<L, R> DeltaIter<L, R>
where
    L: IChangeLog + ?Sized,
    R: IObjectResolver,
{
    /// Yields the next change, fetching another page when needed
    ///
    /// Returns `Ok(None)` once the server reports no further changes.
    pub async fn next(&mut self) -> Result<Option<(EventKind, R::Object)>> {
        if self.session.state() == SessionState::Idle {
            self.session.begin(SessionState::Fetching)?;
        }

        loop {
            if let Some(raw) = self.pending.pop_front() {
                let dispatcher = Dispatcher::new(self.resolver.as_ref());
                if let Some(delivery) = dispatcher.prepare(raw, &mut self.session) {
                    self.session.commit(&delivery.cursor);
                    return Ok(Some((delivery.event_kind, delivery.object)));
                }
                continue;
            }

            if self.session.state().is_terminal() {
                return Ok(None);
            }
            let Some(request_cursor) = self.next_request.take() else {
                self.session.transition(SessionState::Done)?;
                return Ok(None);
            };

            self.session.transition(SessionState::Fetching)?;
            let page = match fetch_page(self.change_log.as_ref(), &request_cursor, &mut self.session).await {
                Ok(page) => page,
                Err(e) => {
                    self.session.fail();
                    return Err(e);
                }
            };
            self.next_request = next_request_cursor(&request_cursor, &page);
            if !page.records.is_empty() {
                self.session.transition(SessionState::Dispatching)?;
            }
            self.pending.extend(page.records);
        }
    }

    /// Cursor of the last change this pass yielded
    pub fn cursor(&self) -> &Cursor {
        self.session.cursor()
    }

    /// Adapts the pass into a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = Result<(EventKind, R::Object)>>
    where
        L: 'static,
        R: 'static,
    {
        futures_util::stream::try_unfold(self, |mut iter| async move {
            Ok(iter.next().await?.map(|item| (item, iter)))
        })
    }
}

async fn fetch_page<L>(change_log: &L, cursor: &Cursor, session: &mut SyncSession) -> Result<DeltaPage>
where
    L: IChangeLog + ?Sized,
{
    let page = change_log
        .fetch_page(cursor, session.filter())
        .await
        .with_context(|| format!("Failed to fetch delta page after cursor {cursor}"))?;
    session.record_page();

    debug!(
        session = %session.id(),
        %cursor,
        records = page.records.len(),
        terminal = ?page.terminal_cursor.as_ref().map(Cursor::as_str),
        "Received delta page"
    );
    Ok(page)
}

/// Cursor for the request after `page`, or `None` when caught up
fn next_request_cursor(requested: &Cursor, page: &DeltaPage) -> Option<Cursor> {
    if page.records.is_empty() {
        return None;
    }
    if page.terminal_cursor.as_ref() == Some(requested) {
        return None;
    }
    page.next_cursor().filter(|next| next != requested)
}
