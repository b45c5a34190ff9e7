//! Citation network construction
//!
//! Provides:
//! - Level-synchronous breadth-first traversal over citations and references
//! - Network result type with per-node failures and build statistics
//! - Stable JSON export of the node/edge lists

mod builder;
mod export;

pub use builder::{BuildParams, NetworkBuilder};
pub use export::NetworkDocument;

use crate::models::{Relation, WorkId, WorkRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use uuid::Uuid;

/// Directed citation: `citing` cites `cited`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(WorkId, WorkId)", into = "(WorkId, WorkId)")]
pub struct Edge {
    pub citing: WorkId,
    pub cited: WorkId,
}

impl Edge {
    pub fn new(citing: WorkId, cited: WorkId) -> Self {
        Self { citing, cited }
    }
}

impl From<(WorkId, WorkId)> for Edge {
    fn from((citing, cited): (WorkId, WorkId)) -> Self {
        Self::new(citing, cited)
    }
}

impl From<Edge> for (WorkId, WorkId) {
    fn from(edge: Edge) -> Self {
        (edge.citing, edge.cited)
    }
}

/// A relation lookup that failed during a build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeFailure {
    pub work_id: WorkId,
    pub relation: Relation,
    pub depth: usize,
    pub error: String,
}

/// Counters describing one build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub run_id: Uuid,
    /// Levels whose nodes were expanded
    pub levels: usize,
    /// Nodes whose neighbors were requested
    pub expanded: usize,
    /// Neighbors discarded by the node cap
    pub dropped: usize,
    pub elapsed: Duration,
}

/// Result of a build
#[derive(Debug, Clone, Serialize)]
pub struct CitationNetwork {
    pub root: WorkId,
    pub nodes: HashSet<WorkId>,
    pub edges: HashSet<Edge>,
    /// Metadata of every neighbor seen along the way
    pub records: HashMap<WorkId, WorkRecord>,
    pub failures: Vec<NodeFailure>,
    pub stats: BuildStats,
}

impl CitationNetwork {
    pub fn contains_edge(&self, citing: &str, cited: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.citing.as_str() == citing && e.cited.as_str() == cited)
    }

    /// Works citing `id`
    pub fn citers_of<'a>(&'a self, id: &'a WorkId) -> impl Iterator<Item = &'a WorkId> + 'a {
        self.edges.iter().filter(move |e| &e.cited == id).map(|e| &e.citing)
    }

    /// Works cited by `id`
    pub fn references_of<'a>(&'a self, id: &'a WorkId) -> impl Iterator<Item = &'a WorkId> + 'a {
        self.edges.iter().filter(move |e| &e.citing == id).map(|e| &e.cited)
    }

    /// No relation lookup failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
