//! Inbox facade
//!
//! Entry points a consumer needs to follow an account's change log, wired
//! to the HTTP adapter:
//!
//! - [`Inbox::latest_cursor`] - head of the log
//! - [`Inbox::deltas`] - paginated pull into a handler
//! - [`Inbox::deltas_iter`] - paginated pull as a lazy, restartable producer
//! - [`Inbox::delta_stream`] - persistent streaming connection into a handler
//!
//! ## Usage
//!
//! ```rust,no_run
//! use deltasync_api::inbox::Inbox;
//! use deltasync_core::domain::{Cursor, DeltaFilter, SyncSession};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let inbox = Inbox::new("access-token");
//! let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
//! let summary = inbox
//!     .deltas(&mut session, |event, object| println!("{event} {}", object.id()))
//!     .await?;
//! println!("Resume from {}", summary.final_cursor);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use deltasync_core::domain::{Cursor, DeltaFilter, EventKind, SyncSession, SyncSummary};
use deltasync_core::usecases::{Deltas, FetchDeltasUseCase, StreamDeltasUseCase};

use crate::client::ApiClient;
use crate::models::DomainObject;
use crate::provider::ApiChangeLog;
use crate::resolver::ModelResolver;

/// One account's view of the change log
#[derive(Debug, Clone)]
pub struct Inbox {
    change_log: Arc<ApiChangeLog>,
    opaque_fallback: bool,
}

impl Inbox {
    /// Creates an Inbox against the default API host
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::from_client(ApiClient::new(access_token))
    }

    /// Creates an Inbox over an already configured client
    pub fn from_client(client: ApiClient) -> Self {
        Self {
            change_log: Arc::new(ApiChangeLog::new(Arc::new(client))),
            opaque_fallback: false,
        }
    }

    /// Delivers unknown object types as [`DomainObject::Opaque`] instead of skipping them
    pub fn with_opaque_fallback(mut self, enabled: bool) -> Self {
        self.opaque_fallback = enabled;
        self
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        self.change_log.client()
    }

    fn resolver(&self, filter: &DeltaFilter) -> Arc<ModelResolver> {
        Arc::new(
            ModelResolver::new(Arc::clone(self.client()))
                .with_expanded_view(filter.expanded_view())
                .with_opaque_fallback(self.opaque_fallback),
        )
    }

    fn fetch_use_case(&self, filter: &DeltaFilter) -> FetchDeltasUseCase<ApiChangeLog, ModelResolver> {
        FetchDeltasUseCase::new(Arc::clone(&self.change_log), self.resolver(filter))
    }

    /// Returns the cursor at the head of the change log
    pub async fn latest_cursor(&self) -> Result<Cursor> {
        self.fetch_use_case(&DeltaFilter::new()).latest_cursor().await
    }

    /// Pulls every change after the session's start cursor into `handler`
    ///
    /// See [`FetchDeltasUseCase::execute`].
    pub async fn deltas<F>(&self, session: &mut SyncSession, handler: F) -> Result<SyncSummary>
    where
        F: FnMut(EventKind, DomainObject),
    {
        self.fetch_use_case(session.filter())
            .execute(session, handler)
            .await
    }

    /// Returns a lazy producer of every change after `start`
    ///
    /// Nothing is requested until it is iterated; every iteration re-runs
    /// the pull from `start`.
    pub fn deltas_iter(&self, start: Cursor, filter: DeltaFilter) -> Deltas<ApiChangeLog, ModelResolver> {
        self.fetch_use_case(&filter).deltas(start, filter)
    }

    /// Streams every change after the session's start cursor into `handler`
    ///
    /// See [`StreamDeltasUseCase::execute`].
    pub async fn delta_stream<F>(
        &self,
        session: &mut SyncSession,
        inactivity_timeout: Option<Duration>,
        handler: F,
    ) -> Result<SyncSummary>
    where
        F: FnMut(EventKind, DomainObject),
    {
        StreamDeltasUseCase::new(Arc::clone(&self.change_log), self.resolver(session.filter()))
            .execute(session, inactivity_timeout, handler)
            .await
    }
}
