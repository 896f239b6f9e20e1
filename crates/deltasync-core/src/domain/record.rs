//! Change records and the record validator
//!
//! Every value decoded from either transport goes through [`validate`]
//! before it can reach a consumer. Validation never fails loudly: a record
//! is either [`Validation::Valid`] or [`Validation::Bogus`], and bogus
//! records are dropped by the dispatcher.
//!
//! ## Minimum record shape
//!
//! ```json
//! {
//!   "cursor": "aqb0llc2ioo0bclh7uxkim9z6",
//!   "event": "create",
//!   "object": "message",
//!   "id": "c7mllq7iag2ivlp6fxf7dhg9i",
//!   "attributes": { "subject": "..." }
//! }
//! ```
//!
//! Additional top-level fields are ignored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::DomainError;
use super::filter::DeltaFilter;
use super::newtypes::Cursor;

/// Kind of change a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Modify,
    Delete,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Modify => "modify",
            EventKind::Delete => "delete",
        }
    }

    /// Returns true for events that carry an attribute payload
    pub fn carries_attributes(&self) -> bool {
        !matches!(self, EventKind::Delete)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(EventKind::Create),
            "modify" => Ok(EventKind::Modify),
            "delete" => Ok(EventKind::Delete),
            other => Err(DomainError::UnknownEventKind(other.to_string())),
        }
    }
}

/// One validated entry of the change log
///
/// Immutable once built. The dispatcher consumes it exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    cursor: Cursor,
    event_kind: EventKind,
    type_tag: String,
    object_id: String,
    attributes: Map<String, Value>,
}

impl ChangeRecord {
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Attribute payload; always empty for `delete` records
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Consumes the record, handing the attribute payload to the caller
    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}

/// Why a record was classified as bogus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BogusReason {
    /// The value is not a JSON object
    NotAnObject,
    /// A required field is absent, null, empty or not a string
    MissingField(&'static str),
    /// `event` is not one of create/modify/delete
    UnknownEvent(String),
    /// `attributes` is present but not an object
    MalformedAttributes,
    /// The type tag is filtered out by the session
    Filtered(String),
    /// The bytes could not be decoded as JSON at all
    Undecodable,
    /// The object resolver does not know the type tag
    UnrecognizedType(String),
}

impl fmt::Display for BogusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BogusReason::NotAnObject => write!(f, "record is not an object"),
            BogusReason::MissingField(field) => write!(f, "missing field '{field}'"),
            BogusReason::UnknownEvent(event) => write!(f, "unknown event '{event}'"),
            BogusReason::MalformedAttributes => write!(f, "attributes is not an object"),
            BogusReason::Filtered(tag) => write!(f, "type '{tag}' is filtered"),
            BogusReason::Undecodable => write!(f, "undecodable bytes"),
            BogusReason::UnrecognizedType(tag) => write!(f, "unrecognized type '{tag}'"),
        }
    }
}

/// Outcome of validating one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(ChangeRecord),
    Bogus(BogusReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

/// Classifies a decoded value as a valid change record or bogus
pub fn validate(raw: Value, filter: &DeltaFilter) -> Validation {
    let Value::Object(mut fields) = raw else {
        return Validation::Bogus(BogusReason::NotAnObject);
    };

    let event = match required_str(&fields, "event") {
        Ok(event) => event,
        Err(reason) => return Validation::Bogus(reason),
    };
    let event_kind = match event.parse::<EventKind>() {
        Ok(kind) => kind,
        Err(_) => return Validation::Bogus(BogusReason::UnknownEvent(event.to_string())),
    };

    let type_tag = match required_str(&fields, "object") {
        Ok(tag) => tag.to_string(),
        Err(reason) => return Validation::Bogus(reason),
    };
    let object_id = match required_str(&fields, "id") {
        Ok(id) => id.to_string(),
        Err(reason) => return Validation::Bogus(reason),
    };
    let cursor = match required_str(&fields, "cursor").map(Cursor::new) {
        Ok(Ok(cursor)) => cursor,
        Ok(Err(_)) => return Validation::Bogus(BogusReason::MissingField("cursor")),
        Err(reason) => return Validation::Bogus(reason),
    };

    if !filter.admits(&type_tag) {
        return Validation::Bogus(BogusReason::Filtered(type_tag));
    }

    // Deletes carry only the id, whatever the attributes field holds
    let attributes = if event_kind.carries_attributes() {
        match fields.remove("attributes") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(attributes)) => attributes,
            Some(_) => return Validation::Bogus(BogusReason::MalformedAttributes),
        }
    } else {
        Map::new()
    };

    Validation::Valid(ChangeRecord {
        cursor,
        event_kind,
        type_tag,
        object_id,
        attributes,
    })
}

fn required_str<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, BogusReason> {
    match fields.get(name).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(BogusReason::MissingField(name)),
    }
}
