//! In-memory doubles for the engine's ports, shared by use-case tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};

use crate::domain::{ChangeRecord, Cursor, DeltaFilter};
use crate::ports::{ByteStream, DeltaPage, IChangeLog, IObjectResolver, Resolution};

pub fn record(cursor: &str, event: &str, object: &str, id: &str) -> Value {
    json!({
        "cursor": cursor,
        "event": event,
        "object": object,
        "id": id,
        "attributes": { "id": id }
    })
}

pub fn page(records: Vec<Value>, terminal: &str) -> DeltaPage {
    DeltaPage {
        records,
        terminal_cursor: Some(Cursor::new(terminal).unwrap()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestObject {
    pub type_tag: String,
    pub id: String,
    pub cursor: Cursor,
}

#[derive(Default)]
pub struct TagResolver;

impl IObjectResolver for TagResolver {
    type Object = TestObject;

    fn resolve(&self, record: ChangeRecord) -> Resolution<TestObject> {
        match record.type_tag() {
            "message" | "event" | "calendar" | "contact" | "thread" => {
                Resolution::Resolved(TestObject {
                    type_tag: record.type_tag().to_string(),
                    id: record.object_id().to_string(),
                    cursor: record.cursor().clone(),
                })
            }
            _ => Resolution::Unrecognized,
        }
    }
}

pub enum Chunk {
    Data(&'static str),
    Fail(&'static str),
}

/// Change log answering from fixed pages and a fixed stream body
#[derive(Default)]
pub struct ScriptedChangeLog {
    pages: HashMap<String, DeltaPage>,
    body: Mutex<Vec<Chunk>>,
    hang_after_body: bool,
    page_requests: Mutex<Vec<(String, DeltaFilter)>>,
    connections: AtomicUsize,
}

impl ScriptedChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, cursor: &str, page: DeltaPage) -> Self {
        self.pages.insert(cursor.to_string(), page);
        self
    }

    pub fn with_body(self, chunks: Vec<Chunk>) -> Self {
        *self.body.lock().unwrap() = chunks;
        self
    }

    /// Keeps the connection open (no bytes, no close) once the body is sent
    pub fn hanging(mut self) -> Self {
        self.hang_after_body = true;
        self
    }

    pub fn requested_cursors(&self) -> Vec<String> {
        self.page_requests
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }

    pub fn requested_filters(&self) -> Vec<DeltaFilter> {
        self.page_requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, f)| f.clone())
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IChangeLog for ScriptedChangeLog {
    async fn latest_cursor(&self) -> anyhow::Result<Cursor> {
        Ok(Cursor::new("latest")?)
    }

    async fn fetch_page(&self, cursor: &Cursor, filter: &DeltaFilter) -> anyhow::Result<DeltaPage> {
        self.page_requests
            .lock()
            .unwrap()
            .push((cursor.as_str().to_string(), filter.clone()));
        self.pages
            .get(cursor.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no page scripted for cursor {cursor}"))
    }

    async fn open_stream(&self, _cursor: &Cursor, _filter: &DeltaFilter) -> anyhow::Result<ByteStream> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        let items: Vec<anyhow::Result<Bytes>> = std::mem::take(&mut *self.body.lock().unwrap())
            .into_iter()
            .map(|chunk| match chunk {
                Chunk::Data(data) => Ok(Bytes::from_static(data.as_bytes())),
                Chunk::Fail(message) => Err(anyhow::anyhow!(message)),
            })
            .collect();

        let body = stream::iter(items);
        if self.hang_after_body {
            Ok(body.chain(stream::pending()).boxed())
        } else {
            Ok(body.boxed())
        }
    }
}
