//! Breadth-first citation network builder

use super::{BuildStats, CitationNetwork, Edge, NodeFailure};
use crate::errors::{BuildError, FetchError};
use crate::models::{Relation, WorkId, WorkRecord};
use crate::openalex::{Neighbors, WorkFetcher};
use crate::resolver;
use citeforge_common::config::CrawlConfig;
use citeforge_common::metrics;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Traversal limits for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildParams {
    /// Hops expanded from the root; 0 returns the root alone
    pub max_depth: usize,
    /// Neighbors requested per node and relation
    pub per_node_limit: usize,
    /// Node groups in flight at once
    pub max_concurrency: usize,
    /// Stop adding nodes once this many are known
    pub max_nodes: Option<usize>,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            max_depth: 1,
            per_node_limit: 100,
            max_concurrency: 10,
            max_nodes: None,
        }
    }
}

impl From<&CrawlConfig> for BuildParams {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            per_node_limit: config.per_node_limit,
            max_concurrency: config.max_concurrency,
            max_nodes: config.max_nodes,
        }
    }
}

/// Node waiting for expansion
#[derive(Debug, Clone)]
struct FrontierItem {
    id: WorkId,
    depth: usize,
}

/// Both relation lookups of one node
struct NodeOutcome {
    citations: Result<Neighbors, FetchError>,
    references: Result<Neighbors, FetchError>,
}

/// Mutable state owned by a single build
struct TraversalState {
    visited: HashSet<WorkId>,
    nodes: HashSet<WorkId>,
    edges: HashSet<Edge>,
    records: HashMap<WorkId, WorkRecord>,
    frontier: Vec<FrontierItem>,
    failures: Vec<NodeFailure>,
    dropped: usize,
}

impl TraversalState {
    fn new(root: WorkId) -> Self {
        Self {
            visited: HashSet::new(),
            nodes: HashSet::from([root.clone()]),
            edges: HashSet::new(),
            records: HashMap::new(),
            frontier: vec![FrontierItem { id: root, depth: 0 }],
            failures: Vec::new(),
            dropped: 0,
        }
    }

    /// Drain the frontier, marking each unvisited id visited
    fn take_level(&mut self) -> Vec<FrontierItem> {
        let frontier = std::mem::take(&mut self.frontier);
        frontier
            .into_iter()
            .filter(|item| self.visited.insert(item.id.clone()))
            .collect()
    }

    fn merge(&mut self, id: &WorkId, depth: usize, outcome: NodeOutcome, params: &BuildParams) {
        for (relation, result) in [
            (Relation::Citations, outcome.citations),
            (Relation::References, outcome.references),
        ] {
            match result {
                Ok(neighbors) => self.add_neighbors(id, depth, relation, neighbors, params),
                Err(e) => {
                    warn!(work_id = %id, %relation, depth, error = %e, kind = e.kind(), "Relation fetch failed");
                    self.failures.push(NodeFailure {
                        work_id: id.clone(),
                        relation,
                        depth,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    fn add_neighbors(
        &mut self,
        id: &WorkId,
        depth: usize,
        relation: Relation,
        mut neighbors: Neighbors,
        params: &BuildParams,
    ) {
        for neighbor in std::mem::take(&mut neighbors.ids) {
            if &neighbor == id {
                continue;
            }

            if !self.nodes.contains(&neighbor) {
                if params.max_nodes.is_some_and(|cap| self.nodes.len() >= cap) {
                    self.dropped += 1;
                    continue;
                }
                self.nodes.insert(neighbor.clone());
                if depth + 1 < params.max_depth && !self.visited.contains(&neighbor) {
                    self.frontier.push(FrontierItem {
                        id: neighbor.clone(),
                        depth: depth + 1,
                    });
                }
            }

            let edge = match relation {
                Relation::Citations => Edge::new(neighbor.clone(), id.clone()),
                Relation::References => Edge::new(id.clone(), neighbor.clone()),
            };
            self.edges.insert(edge);

            if let Some(record) = neighbors.records.remove(&neighbor) {
                self.records.entry(neighbor).or_insert(record);
            }
        }
    }
}

/// Builds citation networks through a [`WorkFetcher`]
pub struct NetworkBuilder {
    fetcher: Arc<dyn WorkFetcher>,
}

impl NetworkBuilder {
    pub fn new(fetcher: Arc<dyn WorkFetcher>) -> Self {
        Self { fetcher }
    }

    /// Build the network around `root`
    ///
    /// Only an invalid root or invalid parameters fail the build; relation
    /// lookups that fail are reported in [`CitationNetwork::failures`].
    pub async fn build(&self, root: &str, params: &BuildParams) -> Result<CitationNetwork, BuildError> {
        let root = resolver::normalize_work(root)?;
        if params.max_concurrency == 0 {
            return Err(BuildError::InvalidParams(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("build", %run_id, root = %root, max_depth = params.max_depth);
        Ok(self.traverse(root, params, run_id).instrument(span).await)
    }

    async fn traverse(&self, root: WorkId, params: &BuildParams, run_id: Uuid) -> CitationNetwork {
        let started = Instant::now();
        let semaphore = Semaphore::new(params.max_concurrency);
        let mut state = TraversalState::new(root.clone());
        let mut stats = BuildStats {
            run_id,
            ..BuildStats::default()
        };

        let mut depth = 0;
        while !state.frontier.is_empty() && depth < params.max_depth {
            let level = state.take_level();
            if level.is_empty() {
                break;
            }
            info!(depth, nodes = level.len(), "Expanding level");

            let outcomes = join_all(
                level
                    .iter()
                    .map(|item| self.expand(&item.id, params.per_node_limit, &semaphore)),
            )
            .await;

            for (item, outcome) in level.iter().zip(outcomes) {
                state.merge(&item.id, item.depth, outcome, params);
            }

            stats.levels += 1;
            stats.expanded += level.len();
            depth += 1;
        }

        stats.dropped = state.dropped;
        stats.elapsed = started.elapsed();

        info!(
            nodes = state.nodes.len(),
            edges = state.edges.len(),
            failures = state.failures.len(),
            dropped = stats.dropped,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Build complete"
        );
        metrics::record_build(
            stats.elapsed.as_secs_f64(),
            state.nodes.len(),
            state.edges.len(),
            state.failures.len(),
        );

        CitationNetwork {
            root,
            nodes: state.nodes,
            edges: state.edges,
            records: state.records,
            failures: state.failures,
            stats,
        }
    }

    /// Fetch citations and references of one node under a semaphore permit
    async fn expand(&self, id: &WorkId, limit: usize, semaphore: &Semaphore) -> NodeOutcome {
        // The semaphore is never closed
        let _permit = semaphore.acquire().await.ok();

        let (citations, references) = tokio::join!(
            self.fetcher.fetch(id, Relation::Citations, limit),
            self.fetcher.fetch(id, Relation::References, limit),
        );
        NodeOutcome { citations, references }
    }
}
