//! Type filtering for change-log requests
//!
//! A [`DeltaFilter`] travels with every request (as query parameters) and
//! is applied again client-side by the record validator, so a server that
//! ignores a parameter cannot leak filtered records to the consumer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Type tags covered by `exclude_folders`
const FOLDER_TYPES: [&str; 2] = ["folder", "label"];

/// Filter options shared by the paginated and streaming transports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaFilter {
    exclude_folders: bool,
    exclude_types: BTreeSet<String>,
    include_types: BTreeSet<String>,
    expanded_view: bool,
}

impl DeltaFilter {
    /// Creates a filter that lets every type through
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from type lists
    ///
    /// # Errors
    /// Returns [`DomainError::ConflictingTypeFilter`] if a type tag appears
    /// in both lists.
    pub fn from_types<E, I>(exclude: E, include: I) -> Result<Self, DomainError>
    where
        E: IntoIterator,
        E::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let exclude_types: BTreeSet<String> = exclude.into_iter().map(Into::into).collect();
        let include_types: BTreeSet<String> = include.into_iter().map(Into::into).collect();

        if let Some(tag) = exclude_types.intersection(&include_types).next() {
            return Err(DomainError::ConflictingTypeFilter(tag.clone()));
        }

        Ok(Self {
            exclude_types,
            include_types,
            ..Self::default()
        })
    }

    /// Sets whether folder and label records are excluded
    pub fn with_exclude_folders(mut self, exclude_folders: bool) -> Self {
        self.exclude_folders = exclude_folders;
        self
    }

    /// Requests the expanded object representation
    pub fn with_expanded_view(mut self, expanded_view: bool) -> Self {
        self.expanded_view = expanded_view;
        self
    }

    pub fn exclude_folders(&self) -> bool {
        self.exclude_folders
    }

    pub fn exclude_types(&self) -> &BTreeSet<String> {
        &self.exclude_types
    }

    pub fn include_types(&self) -> &BTreeSet<String> {
        &self.include_types
    }

    pub fn expanded_view(&self) -> bool {
        self.expanded_view
    }

    /// Returns true if records of this type tag may reach the consumer
    pub fn admits(&self, type_tag: &str) -> bool {
        if self.exclude_folders && FOLDER_TYPES.contains(&type_tag) {
            return false;
        }
        if self.exclude_types.contains(type_tag) {
            return false;
        }
        self.include_types.is_empty() || self.include_types.contains(type_tag)
    }

    /// Query parameters in the order the change-log endpoints document them
    ///
    /// The cursor itself is not included; callers put it first.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("exclude_folders", self.exclude_folders.to_string())];
        if !self.exclude_types.is_empty() {
            pairs.push(("exclude_types", join(&self.exclude_types)));
        }
        if !self.include_types.is_empty() {
            pairs.push(("include_types", join(&self.include_types)));
        }
        if self.expanded_view {
            pairs.push(("view", "expanded".to_string()));
        }
        pairs
    }
}

fn join(types: &BTreeSet<String>) -> String {
    types.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}
