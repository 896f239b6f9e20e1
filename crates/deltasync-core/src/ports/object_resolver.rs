//! Object resolver port
//!
//! The engine does not know which type tags exist or what objects they
//! become. It hands every validated record to an [`IObjectResolver`] and
//! treats [`Resolution::Unrecognized`] exactly like a bogus record.

use crate::domain::ChangeRecord;

/// Result of resolving one record
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<O> {
    /// The record became a typed domain object
    Resolved(O),
    /// The resolver has no mapping for the record's type tag
    Unrecognized,
}

/// Port trait mapping validated change records to domain objects
///
/// Implementations are expected to be static lookups: no I/O, no state
/// that changes between calls.
pub trait IObjectResolver: Send + Sync {
    /// The domain object type handed to consumers
    type Object: Send;

    /// Builds the domain object for `record`
    ///
    /// The object must carry the record's cursor.
    fn resolve(&self, record: ChangeRecord) -> Resolution<Self::Object>;
}
