//! Worker thread logic for the counted traversal
//!
//! Each worker:
//! - Pulls nodes from the shared frontier (blocking, never spinning)
//! - Expands the node through the expander
//! - Claims in-scope neighbours in the visited set and pushes the winners
//! - Completes its unit only after every child has been pushed
//!
//! Workers talk to each other only through the visited set and the frontier.
//! The coordinator hears from them through [`WorkerEvent`]s.

use crate::error::{ExpandError, Result, ScanError};
use crate::expander::Expander;
use crate::frontier::{Frontier, Task};
use crate::scope::{Scope, ScopeKey};
use crate::visited::VisitedSet;
use crossbeam_channel::Sender;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ScopedJoinHandle};
use tracing::{debug, trace, warn};

/// Called with `(worker_id, node)` just before a node is expanded.
pub type ProgressCallback<N> = Arc<dyn Fn(usize, &N) + Send + Sync>;

/// Counters collected by one worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub expanded: u64,
    pub discovered: u64,
    pub out_of_scope: u64,
    pub duplicates: u64,
}

/// Messages from workers to the coordinator
#[derive(Debug)]
pub(crate) enum WorkerEvent {
    /// Pending work reached zero: the frontier is exhausted.
    Quiescent,
    Failed { node: String, error: ExpandError },
    Panicked { id: usize },
}

/// Per-traversal state shared by reference with every worker.
pub(crate) struct WorkerContext<'a, N, S: ?Sized, E: ?Sized> {
    pub scope: &'a S,
    pub scope_key: ScopeKey,
    pub expander: &'a E,
    pub visited: VisitedSet<N>,
    pub frontier: Frontier<N>,
    pub aborting: AtomicBool,
    pub events: Sender<WorkerEvent>,
    pub progress: Option<ProgressCallback<N>>,
}

impl<N, S: ?Sized, E: ?Sized> WorkerContext<'_, N, S, E> {
    pub fn abort(&self) {
        self.aborting.store(true, Ordering::SeqCst);
    }

    pub fn is_aborting(&self) -> bool {
        self.aborting.load(Ordering::SeqCst)
    }
}

/// A worker thread bound to one traversal scope
pub(crate) struct Worker<'scope> {
    id: usize,
    handle: ScopedJoinHandle<'scope, WorkerStats>,
}

impl<'scope> Worker<'scope> {
    pub fn spawn<'env, N, S, E>(
        id: usize,
        scope: &'scope thread::Scope<'scope, 'env>,
        ctx: &'scope WorkerContext<'_, N, S, E>,
    ) -> Result<Self>
    where
        N: Clone + Eq + Hash + Send + Sync + fmt::Debug,
        S: Scope<N> + ?Sized,
        E: Expander<N> + ?Sized,
    {
        let handle = thread::Builder::new()
            .name(format!("sitewalk-worker-{}", id))
            .spawn_scoped(scope, move || worker_loop(id, ctx))?;

        Ok(Self { id, handle })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to exit.
    pub fn join(self) -> Result<WorkerStats> {
        self.handle
            .join()
            .map_err(|_| ScanError::WorkerPanicked { id: self.id })
    }
}

/// Reports a panicking worker so the coordinator never waits on it.
struct PanicGuard<'a> {
    id: usize,
    events: &'a Sender<WorkerEvent>,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let _ = self.events.send(WorkerEvent::Panicked { id: self.id });
        }
    }
}

fn worker_loop<N, S, E>(id: usize, ctx: &WorkerContext<'_, N, S, E>) -> WorkerStats
where
    N: Clone + Eq + Hash + Send + Sync + fmt::Debug,
    S: Scope<N> + ?Sized,
    E: Expander<N> + ?Sized,
{
    let _guard = PanicGuard {
        id,
        events: &ctx.events,
    };
    let mut stats = WorkerStats::default();
    debug!(worker = id, "Worker started");

    loop {
        let node = match ctx.frontier.pop() {
            Task::Stop => break,
            Task::Expand(node) => node,
        };

        if !ctx.is_aborting() {
            process_node(id, ctx, &node, &mut stats);
        }

        if ctx.frontier.complete_one() {
            debug!(worker = id, "Frontier exhausted");
            let _ = ctx.events.send(WorkerEvent::Quiescent);
        }
    }

    debug!(worker = id, expanded = stats.expanded, "Worker finished");
    stats
}

fn process_node<N, S, E>(
    id: usize,
    ctx: &WorkerContext<'_, N, S, E>,
    node: &N,
    stats: &mut WorkerStats,
) where
    N: Clone + Eq + Hash + Send + Sync + fmt::Debug,
    S: Scope<N> + ?Sized,
    E: Expander<N> + ?Sized,
{
    if let Some(ref callback) = ctx.progress {
        callback(id, node);
    }

    stats.expanded += 1;
    let neighbours = match ctx.expander.expand(node) {
        Ok(neighbours) => neighbours,
        Err(error) => {
            warn!(worker = id, node = ?node, error = %error, "Expansion failed, aborting");
            ctx.abort();
            let _ = ctx.events.send(WorkerEvent::Failed {
                node: format!("{:?}", node),
                error,
            });
            return;
        }
    };

    trace!(worker = id, node = ?node, count = neighbours.len(), "Expanded");
    claim_neighbours(ctx.scope, &ctx.scope_key, &ctx.visited, neighbours, stats, |n| {
        ctx.frontier.push(n)
    });
}

/// Filter `neighbours` through the scope and the visited set, handing every
/// node this caller won to `sink`.
pub(crate) fn claim_neighbours<N, S, F>(
    scope: &S,
    scope_key: &ScopeKey,
    visited: &VisitedSet<N>,
    neighbours: Vec<N>,
    stats: &mut WorkerStats,
    mut sink: F,
) where
    N: Clone + Eq + Hash,
    S: Scope<N> + ?Sized,
    F: FnMut(N),
{
    for neighbour in neighbours {
        if !scope.in_scope(&neighbour, scope_key) {
            stats.out_of_scope += 1;
            continue;
        }
        if !visited.try_claim(&neighbour) {
            stats.duplicates += 1;
            continue;
        }
        stats.discovered += 1;
        sink(neighbour);
    }
}
