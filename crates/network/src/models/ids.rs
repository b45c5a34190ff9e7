//! Canonical OpenAlex identifiers

use crate::errors::ResolveError;
use crate::resolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OpenAlex entity kinds, keyed by the identifier's leading letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Work,
    Author,
    Institution,
    Source,
}

impl EntityKind {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'W' => Some(EntityKind::Work),
            'A' => Some(EntityKind::Author),
            'I' => Some(EntityKind::Institution),
            'S' => Some(EntityKind::Source),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            EntityKind::Work => 'W',
            EntityKind::Author => 'A',
            EntityKind::Institution => 'I',
            EntityKind::Source => 'S',
        }
    }

    /// API collection path segment
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Work => "works",
            EntityKind::Author => "authors",
            EntityKind::Institution => "institutions",
            EntityKind::Source => "sources",
        }
    }
}

/// Canonical work identifier (`W` followed by digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkId(String);

impl WorkId {
    /// Wrap an id already validated by the resolver
    pub(crate) fn from_canonical(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorkId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for WorkId {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolver::normalize_work(s)
    }
}

impl TryFrom<String> for WorkId {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        resolver::normalize_work(&value)
    }
}

impl From<WorkId> for String {
    fn from(id: WorkId) -> Self {
        id.0
    }
}
