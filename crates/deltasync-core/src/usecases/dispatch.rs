//! Record dispatch
//!
//! The [`Dispatcher`] is the single choke point between a transport and the
//! consumer: raw value in, validated and resolved object out. Both the
//! paginated and the streaming use cases go through it, so they share one
//! notion of what a bogus record is.

use serde_json::Value;
use tracing::debug;

use crate::domain::{validate, BogusReason, Cursor, EventKind, SyncSession, Validation};
use crate::ports::{IObjectResolver, Resolution};

/// A record that is ready to be handed to the consumer
#[derive(Debug)]
pub struct Delivery<O> {
    pub event_kind: EventKind,
    pub object: O,
    /// Cursor the session advances to once the consumer has the object
    pub cursor: Cursor,
}

/// Validates, resolves and delivers raw records
pub struct Dispatcher<'a, R: ?Sized> {
    resolver: &'a R,
}

impl<'a, R: IObjectResolver + ?Sized> Dispatcher<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Turns a raw record into a [`Delivery`], or counts it as skipped
    ///
    /// Does not advance the session's cursor; that happens only once the
    /// object has actually reached the consumer.
    pub fn prepare(&self, raw: Value, session: &mut SyncSession) -> Option<Delivery<R::Object>> {
        let record = match validate(raw, session.filter()) {
            Validation::Valid(record) => record,
            Validation::Bogus(reason) => {
                skip(session, &reason);
                return None;
            }
        };

        let event_kind = record.event_kind();
        let cursor = record.cursor().clone();
        let type_tag = record.type_tag().to_string();

        match self.resolver.resolve(record) {
            Resolution::Resolved(object) => Some(Delivery {
                event_kind,
                object,
                cursor,
            }),
            Resolution::Unrecognized => {
                skip(session, &BogusReason::UnrecognizedType(type_tag));
                None
            }
        }
    }

    /// Delivers one raw record to `handler`
    ///
    /// Returns true if the handler was invoked. The session cursor advances
    /// after the handler returns.
    pub fn dispatch<F>(&self, raw: Value, session: &mut SyncSession, handler: &mut F) -> bool
    where
        F: FnMut(EventKind, R::Object),
    {
        let Some(delivery) = self.prepare(raw, session) else {
            return false;
        };
        handler(delivery.event_kind, delivery.object);
        session.commit(&delivery.cursor);
        true
    }
}

fn skip(session: &mut SyncSession, reason: &BogusReason) {
    debug!(session = %session.id(), %reason, "Skipping bogus delta record");
    session.record_skip();
}
