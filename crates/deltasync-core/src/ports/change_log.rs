//! Change-log port (driven/secondary port)
//!
//! This module defines the interface to the server's append-only change
//! log. The engine drives it in two ways: paginated polling
//! ([`IChangeLog::fetch_page`]) and a persistent push stream
//! ([`IChangeLog::open_stream`]).
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific;
//!   adapters keep their typed error reachable through `downcast_ref`.
//! - Records cross the port as undecoded-to-domain `serde_json::Value`s so that
//!   every record, whichever transport carried it, goes through the same validator.
//! - Streams yield raw bytes; framing them into records is the engine's job.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use serde_json::Value;

use crate::domain::{Cursor, DeltaFilter};

/// Body of a streaming connection, chunked however the network delivers it
pub type ByteStream = Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send>>;

/// One page of the paginated change log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaPage {
    /// Raw records in server order
    pub records: Vec<Value>,
    /// Cursor the server reports as "caught up to here" for this page
    pub terminal_cursor: Option<Cursor>,
}

impl DeltaPage {
    /// Cursor embedded in the last record of the page that carries one
    ///
    /// Records are not validated here; a bogus record still marks how far
    /// the server has walked the log.
    pub fn last_record_cursor(&self) -> Option<Cursor> {
        self.records.iter().rev().find_map(|record| {
            record
                .get("cursor")
                .and_then(Value::as_str)
                .and_then(|c| Cursor::new(c).ok())
        })
    }

    /// Cursor the next page request should start from
    ///
    /// The last record's cursor wins; the reported terminal cursor is the
    /// fallback for pages whose records carry none.
    pub fn next_cursor(&self) -> Option<Cursor> {
        self.last_record_cursor()
            .or_else(|| self.terminal_cursor.clone())
    }
}

/// Port trait for the server's change log
#[async_trait::async_trait]
pub trait IChangeLog: Send + Sync {
    /// Returns the cursor at the current head of the log
    ///
    /// A single request; no records are processed.
    async fn latest_cursor(&self) -> anyhow::Result<Cursor>;

    /// Fetches the page of records that follows `cursor`
    async fn fetch_page(&self, cursor: &Cursor, filter: &DeltaFilter) -> anyhow::Result<DeltaPage>;

    /// Opens a persistent connection delivering records after `cursor`
    ///
    /// Returns once the connection is established; the body is consumed
    /// through the returned stream.
    async fn open_stream(&self, cursor: &Cursor, filter: &DeltaFilter)
        -> anyhow::Result<ByteStream>;
}
