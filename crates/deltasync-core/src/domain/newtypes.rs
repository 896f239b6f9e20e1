//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers the engine passes around.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Cursor
// ============================================================================

/// Literal the change-log endpoints accept as "beginning of time"
pub const BEGINNING_CURSOR: &str = "0";

/// Opaque position marker in the server's change log
///
/// Ordering is defined only by the server. The client never parses a
/// cursor or computes on it; the only supported comparison is equality,
/// which is how stalled pagination is detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(String);

impl Cursor {
    /// Create a new Cursor
    ///
    /// # Errors
    /// Returns error if the cursor is empty
    pub fn new(cursor: impl Into<String>) -> Result<Self, DomainError> {
        let cursor = cursor.into();
        if cursor.is_empty() {
            return Err(DomainError::InvalidCursor(
                "Cursor cannot be empty".to_string(),
            ));
        }
        Ok(Self(cursor))
    }

    /// The "beginning of time" sentinel
    #[must_use]
    pub fn beginning() -> Self {
        Self(BEGINNING_CURSOR.to_string())
    }

    /// Returns true if this is the beginning-of-time sentinel
    #[must_use]
    pub fn is_beginning(&self) -> bool {
        self.0 == BEGINNING_CURSOR
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::beginning()
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cursor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Cursor {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Identifier for a single `deltas` / `delta_stream` invocation
///
/// Only used to correlate log lines and summaries; sessions are never
/// looked up by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
