//! Data model for the citation crawler

mod ids;
mod work;

pub use ids::{EntityKind, WorkId};
pub use work::{OaLocation, OpenAccess, WorkRecord};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a neighbor lookup relative to a work `X`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Works that cite `X`
    Citations,
    /// Works that `X` cites
    References,
}

impl Relation {
    /// OpenAlex filter name selecting this relation
    pub fn filter(&self) -> &'static str {
        match self {
            Relation::Citations => "cites",
            Relation::References => "cited_by",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Citations => f.write_str("citations"),
            Relation::References => f.write_str("references"),
        }
    }
}
