//! ApiChangeLog - IChangeLog implementation over the HTTP API
//!
//! Wraps a shared [`ApiClient`] and delegates to the [`delta`] module to
//! fulfil the [`IChangeLog`] port contract.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use deltasync_core::domain::{Cursor, DeltaFilter};
use deltasync_core::ports::{ByteStream, DeltaPage, IChangeLog};

use crate::client::ApiClient;
use crate::delta;

/// Change log served by the `/delta` endpoints
#[derive(Debug, Clone)]
pub struct ApiChangeLog {
    client: Arc<ApiClient>,
}

impl ApiChangeLog {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }
}

#[async_trait]
impl IChangeLog for ApiChangeLog {
    async fn latest_cursor(&self) -> Result<Cursor> {
        delta::get_latest_cursor(&self.client).await
    }

    async fn fetch_page(&self, cursor: &Cursor, filter: &DeltaFilter) -> Result<DeltaPage> {
        delta::get_delta_page(&self.client, cursor, filter).await
    }

    async fn open_stream(&self, cursor: &Cursor, filter: &DeltaFilter) -> Result<ByteStream> {
        delta::open_delta_stream(&self.client, cursor, filter).await
    }
}
