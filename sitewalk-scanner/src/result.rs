use crate::crawler::Strategy;
use crate::worker::WorkerStats;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub strategy: Strategy,
    pub workers: usize,
    /// Nodes handed to the expander
    pub expanded: u64,
    /// Neighbours claimed and queued
    pub discovered: u64,
    /// Neighbours rejected by the scope
    pub out_of_scope: u64,
    /// Neighbours already claimed by someone else
    pub duplicates: u64,
    /// Number of waves (wavefront strategy only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waves: Option<usize>,
    pub elapsed: Duration,
}

impl CrawlStats {
    pub fn new(strategy: Strategy, workers: usize) -> Self {
        Self {
            strategy,
            workers,
            ..Self::default()
        }
    }

    pub(crate) fn absorb(&mut self, worker: &WorkerStats) {
        self.expanded += worker.expanded;
        self.discovered += worker.discovered;
        self.out_of_scope += worker.out_of_scope;
        self.duplicates += worker.duplicates;
    }
}

/// Outcome of one traversal: the visited set plus counters.
#[derive(Debug, Clone)]
pub struct CrawlResult<N> {
    pub visited: HashSet<N>,
    pub stats: CrawlStats,
}

impl<N> CrawlResult<N>
where
    N: Eq + Hash,
{
    pub fn new(visited: HashSet<N>, stats: CrawlStats) -> Self {
        Self { visited, stats }
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    pub fn contains(&self, node: &N) -> bool {
        self.visited.contains(node)
    }

    /// Visited nodes in sorted order, for stable output.
    pub fn sorted(&self) -> Vec<&N>
    where
        N: Ord,
    {
        let mut nodes: Vec<&N> = self.visited.iter().collect();
        nodes.sort();
        nodes
    }

    pub fn into_visited(self) -> HashSet<N> {
        self.visited
    }
}
