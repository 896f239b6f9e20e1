//! ModelResolver - IObjectResolver implementation for the object model
//!
//! Maps a record's type tag onto a [`DomainObject`] variant through a static
//! table. Tags outside the table are `Unrecognized` (and so skipped by the
//! engine) unless the opaque fallback is switched on.

use std::sync::Arc;

use deltasync_core::domain::ChangeRecord;
use deltasync_core::ports::{IObjectResolver, Resolution};

use crate::client::ApiClient;
use crate::models::{DomainObject, Resource};

type Constructor = fn(Resource) -> DomainObject;

/// Type tags the resolver models, and the variant each becomes
const KNOWN_TYPES: &[(&str, Constructor)] = &[
    ("account", DomainObject::Account),
    ("calendar", DomainObject::Calendar),
    ("contact", DomainObject::Contact),
    ("draft", DomainObject::Draft),
    ("event", DomainObject::Event),
    ("file", DomainObject::File),
    ("folder", DomainObject::Folder),
    ("label", DomainObject::Label),
    ("message", DomainObject::Message),
    ("thread", DomainObject::Thread),
];

/// Resolver producing [`DomainObject`]s bound to one [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ModelResolver {
    api: Arc<ApiClient>,
    expanded_view: bool,
    opaque_fallback: bool,
}

impl ModelResolver {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            expanded_view: false,
            opaque_fallback: false,
        }
    }

    /// Resolves `message` records to [`DomainObject::ExpandedMessage`]
    pub fn with_expanded_view(mut self, expanded: bool) -> Self {
        self.expanded_view = expanded;
        self
    }

    /// Resolves unknown tags to [`DomainObject::Opaque`] instead of skipping them
    pub fn with_opaque_fallback(mut self, enabled: bool) -> Self {
        self.opaque_fallback = enabled;
        self
    }

    /// Returns true if `type_tag` maps to a modelled variant
    pub fn is_known(type_tag: &str) -> bool {
        KNOWN_TYPES.iter().any(|(tag, _)| *tag == type_tag)
    }

    fn constructor(&self, type_tag: &str) -> Option<Constructor> {
        if type_tag == "message" && self.expanded_view {
            return Some(DomainObject::ExpandedMessage);
        }
        KNOWN_TYPES
            .iter()
            .find(|(tag, _)| *tag == type_tag)
            .map(|(_, constructor)| *constructor)
    }
}

impl IObjectResolver for ModelResolver {
    type Object = DomainObject;

    fn resolve(&self, record: ChangeRecord) -> Resolution<DomainObject> {
        match self.constructor(record.type_tag()) {
            Some(constructor) => {
                Resolution::Resolved(constructor(Resource::from_record(record, Arc::clone(&self.api))))
            }
            None if self.opaque_fallback => {
                let type_tag = record.type_tag().to_string();
                Resolution::Resolved(DomainObject::Opaque {
                    type_tag,
                    resource: Resource::from_record(record, Arc::clone(&self.api)),
                })
            }
            None => Resolution::Unrecognized,
        }
    }
}
