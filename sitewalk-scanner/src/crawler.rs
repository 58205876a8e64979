//! Traversal coordinator
//!
//! The coordinator is responsible for:
//! - Validating the start node and seeding the frontier
//! - Starting the worker pool
//! - Waiting for quiescence, failure, cancellation or timeout
//! - Stopping and joining every worker before the result is read
//!
//! A run moves through [`Phase::Seeded`], [`Phase::Running`],
//! [`Phase::Draining`] and [`Phase::Done`] in that order.

use crate::error::{Result, ScanError};
use crate::expander::Expander;
use crate::frontier::Frontier;
use crate::result::{CrawlResult, CrawlStats};
use crate::scope::{HostScope, Scope, ScopeKey};
use crate::visited::VisitedSet;
use crate::wavefront;
use crate::worker::{ProgressCallback, Worker, WorkerContext, WorkerEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 10;

/// How often the coordinator re-checks a cancel token or timeout.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Termination strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Shared queue, pending-work counter and one stop marker per worker.
    #[default]
    Counted,
    /// Level by level with a barrier after every wave.
    Wavefront,
}

impl Strategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "counted" | "pool" => Some(Strategy::Counted),
            "wavefront" | "wave" | "level" => Some(Strategy::Wavefront),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Counted => f.write_str("counted"),
            Strategy::Wavefront => f.write_str("wavefront"),
        }
    }
}

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeded,
    Running,
    Draining,
    Done,
}

impl Phase {
    /// The next phase. `Done` is terminal.
    pub fn next(self) -> Phase {
        match self {
            Phase::Seeded => Phase::Running,
            Phase::Running => Phase::Draining,
            Phase::Draining | Phase::Done => Phase::Done,
        }
    }

    fn advance(&mut self) {
        let next = self.next();
        debug!(from = ?*self, to = ?next, "Coordinator phase");
        *self = next;
    }
}

/// Cooperative cancellation for a running traversal. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation and timeout for one run.
pub(crate) struct Deadline<'a> {
    started: Instant,
    timeout: Option<Duration>,
    cancel: Option<&'a CancelToken>,
}

impl Deadline<'_> {
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(ScanError::Cancelled);
        }
        match self.timeout {
            Some(timeout) if self.started.elapsed() >= timeout => Err(ScanError::TimedOut(timeout)),
            _ => Ok(()),
        }
    }

    /// How long to block before calling [`Deadline::check`] again, if at all.
    fn tick(&self) -> Option<Duration> {
        let remaining = self
            .timeout
            .map(|timeout| timeout.saturating_sub(self.started.elapsed()));
        match (remaining, self.cancel.is_some()) {
            (Some(remaining), true) => Some(remaining.min(CANCEL_POLL_INTERVAL)),
            (Some(remaining), false) => Some(remaining),
            (None, true) => Some(CANCEL_POLL_INTERVAL),
            (None, false) => None,
        }
    }
}

pub struct Crawler<N, S = HostScope> {
    scope: S,
    workers: usize,
    strategy: Strategy,
    timeout: Option<Duration>,
    cancel_token: Option<CancelToken>,
    progress_callback: Option<ProgressCallback<N>>,
}

impl Crawler<String, HostScope> {
    /// Same-host URL crawler with the default pool size.
    pub fn new() -> Self {
        Self::with_scope(HostScope)
    }
}

impl Default for Crawler<String, HostScope> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, S> Crawler<N, S>
where
    N: Clone + Eq + Hash + Send + Sync + fmt::Debug,
    S: Scope<N>,
{
    pub fn with_scope(scope: S) -> Self {
        Self {
            scope,
            workers: DEFAULT_WORKERS,
            strategy: Strategy::default(),
            timeout: None,
            cancel_token: None,
            progress_callback: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback<N>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Visit every node reachable from `start` without leaving its scope.
    ///
    /// Every worker has exited by the time this returns, on success and on
    /// every error path.
    pub fn crawl<E>(&self, start: N, expander: &E) -> Result<CrawlResult<N>>
    where
        E: Expander<N> + ?Sized,
    {
        if self.workers == 0 {
            return Err(ScanError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        let scope_key = self.scope.scope_key(&start);
        if !scope_key.is_valid() {
            return Err(ScanError::MalformedNode(format!("{:?}", start)));
        }

        let deadline = Deadline {
            started: Instant::now(),
            timeout: self.timeout,
            cancel: self.cancel_token.as_ref(),
        };
        deadline.check()?;

        info!(
            start = ?start,
            scope = %scope_key,
            workers = self.workers,
            strategy = %self.strategy,
            "Starting traversal"
        );

        let mut result = match self.strategy {
            Strategy::Counted => self.crawl_counted(start, scope_key, expander, &deadline)?,
            Strategy::Wavefront => wavefront::crawl(
                start,
                &self.scope,
                &scope_key,
                expander,
                self.workers,
                &deadline,
                self.progress_callback.as_ref(),
            )?,
        };
        result.stats.elapsed = deadline.started.elapsed();

        info!(
            visited = result.len(),
            expanded = result.stats.expanded,
            elapsed_ms = result.stats.elapsed.as_millis() as u64,
            "Traversal complete"
        );
        Ok(result)
    }

    fn crawl_counted<E>(
        &self,
        start: N,
        scope_key: ScopeKey,
        expander: &E,
        deadline: &Deadline<'_>,
    ) -> Result<CrawlResult<N>>
    where
        E: Expander<N> + ?Sized,
    {
        let (events_tx, events_rx) = unbounded();
        let ctx = WorkerContext {
            scope: &self.scope,
            scope_key,
            expander,
            visited: VisitedSet::new(),
            frontier: Frontier::new(),
            aborting: AtomicBool::new(false),
            events: events_tx,
            progress: self.progress_callback.clone(),
        };

        let mut phase = Phase::Seeded;
        ctx.visited.try_claim(&start);
        ctx.frontier.push(start);

        let mut stats = CrawlStats::new(Strategy::Counted, self.workers);
        thread::scope(|s| -> Result<()> {
            let mut workers = Vec::with_capacity(self.workers);
            let mut spawn_error = None;
            for id in 0..self.workers {
                match Worker::spawn(id, s, &ctx) {
                    Ok(worker) => workers.push(worker),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }
            phase.advance();

            let outcome = match spawn_error {
                Some(e) => Err(e),
                None => wait_for_quiescence(&events_rx, deadline),
            };
            phase.advance();

            if let Err(ref e) = outcome {
                warn!(error = %e, "Traversal stopping early");
                ctx.abort();
            }
            debug_assert!(outcome.is_err() || ctx.frontier.is_quiescent());
            ctx.frontier.stop(workers.len());
            let joined = join_workers(workers, &mut stats);
            phase.advance();

            outcome.and(joined)
        })?;

        debug_assert_eq!(phase, Phase::Done);
        let WorkerContext { visited, .. } = ctx;
        Ok(CrawlResult::new(visited.into_inner(), stats))
    }
}

/// Block until the workers report quiescence, a failure, or the deadline passes.
fn wait_for_quiescence(events: &Receiver<WorkerEvent>, deadline: &Deadline<'_>) -> Result<()> {
    loop {
        let event = match deadline.tick() {
            None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(tick) => events.recv_timeout(tick),
        };

        match event {
            Ok(WorkerEvent::Quiescent) => return Ok(()),
            Ok(WorkerEvent::Failed { node, error }) => {
                return Err(ScanError::Expansion {
                    node,
                    source: error,
                });
            }
            Ok(WorkerEvent::Panicked { id }) => return Err(ScanError::WorkerPanicked { id }),
            Err(RecvTimeoutError::Timeout) => deadline.check()?,
            // The worker context owns a sender for the whole run
            Err(RecvTimeoutError::Disconnected) => return Err(ScanError::Cancelled),
        }
    }
}

/// Join every worker, folding their counters into `stats`.
fn join_workers(workers: Vec<Worker<'_>>, stats: &mut CrawlStats) -> Result<()> {
    let mut first_error = None;
    for worker in workers {
        let id = worker.id();
        match worker.join() {
            Ok(worker_stats) => stats.absorb(&worker_stats),
            Err(e) => {
                warn!(worker = id, error = %e, "Worker failed to join cleanly");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Crawl every URL on `start`'s host reachable through `expander`.
pub fn traverse<E>(start: &str, expander: &E, workers: usize) -> Result<HashSet<String>>
where
    E: Expander<String> + ?Sized,
{
    Crawler::new()
        .with_workers(workers)
        .crawl(start.to_string(), expander)
        .map(CrawlResult::into_visited)
}
