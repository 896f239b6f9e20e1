//! Domain object model
//!
//! Every change record resolves to one [`DomainObject`] variant. The engine
//! treats these as opaque; consumers match on the variant and read the
//! payload through [`Resource`].
//!
//! Objects keep a reference to the [`ApiClient`] they were fetched with, so
//! a consumer can follow up on an object without threading the client
//! through its handler.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use deltasync_core::domain::{ChangeRecord, Cursor};

use crate::client::ApiClient;

/// Payload shared by every domain object
#[derive(Debug, Clone)]
pub struct Resource {
    id: String,
    cursor: Cursor,
    attributes: Map<String, Value>,
    api: Arc<ApiClient>,
}

impl Resource {
    /// Builds the payload from a validated record
    ///
    /// Delete records arrive with their attributes already cleared.
    pub fn from_record(record: ChangeRecord, api: Arc<ApiClient>) -> Self {
        let id = record.object_id().to_string();
        let cursor = record.cursor().clone();
        Self {
            id,
            cursor,
            attributes: record.into_attributes(),
            api,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cursor of the change record this object came from
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Raw attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String attribute by name; `None` if absent or not a string
    pub fn str_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Decodes one attribute into `T`; `None` if absent or of another shape
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.attribute(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Client this object was fetched with
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }
}

/// Typed object produced for each valid change record
#[derive(Debug, Clone)]
pub enum DomainObject {
    Account(Resource),
    Calendar(Resource),
    Contact(Resource),
    Draft(Resource),
    Event(Resource),
    File(Resource),
    Folder(Resource),
    Label(Resource),
    Message(Resource),
    /// Message in the expanded view (full headers)
    ExpandedMessage(Resource),
    Thread(Resource),
    /// Type the resolver does not model; attributes carried as-is
    Opaque { type_tag: String, resource: Resource },
}

impl DomainObject {
    /// Wire type tag of this object
    pub fn type_tag(&self) -> &str {
        match self {
            DomainObject::Account(_) => "account",
            DomainObject::Calendar(_) => "calendar",
            DomainObject::Contact(_) => "contact",
            DomainObject::Draft(_) => "draft",
            DomainObject::Event(_) => "event",
            DomainObject::File(_) => "file",
            DomainObject::Folder(_) => "folder",
            DomainObject::Label(_) => "label",
            DomainObject::Message(_) | DomainObject::ExpandedMessage(_) => "message",
            DomainObject::Thread(_) => "thread",
            DomainObject::Opaque { type_tag, .. } => type_tag,
        }
    }

    pub fn resource(&self) -> &Resource {
        match self {
            DomainObject::Account(r)
            | DomainObject::Calendar(r)
            | DomainObject::Contact(r)
            | DomainObject::Draft(r)
            | DomainObject::Event(r)
            | DomainObject::File(r)
            | DomainObject::Folder(r)
            | DomainObject::Label(r)
            | DomainObject::Message(r)
            | DomainObject::ExpandedMessage(r)
            | DomainObject::Thread(r) => r,
            DomainObject::Opaque { resource, .. } => resource,
        }
    }

    pub fn id(&self) -> &str {
        self.resource().id()
    }

    pub fn cursor(&self) -> &Cursor {
        self.resource().cursor()
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        self.resource().api()
    }

    /// Short human label: subject, name or display name if one is present
    pub fn label(&self) -> Option<&str> {
        let resource = self.resource();
        ["subject", "name", "display_name", "title", "email_address"]
            .iter()
            .find_map(|key| resource.str_attribute(key))
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, DomainObject::Opaque { .. })
    }
}
