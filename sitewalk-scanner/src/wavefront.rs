//! Level-by-level traversal.
//!
//! Each wave is the set of nodes discovered by the previous one. A wave is
//! shared out to at most `workers` scoped threads and fully joined before the
//! next one starts. Children are claimed through the same atomic
//! [`VisitedSet::try_claim`] as the counted pool, so a node lands in at most
//! one wave.

use crate::crawler::{Deadline, Strategy};
use crate::error::{Result, ScanError};
use crate::expander::Expander;
use crate::result::{CrawlResult, CrawlStats};
use crate::scope::{Scope, ScopeKey};
use crate::visited::VisitedSet;
use crate::worker::{ProgressCallback, WorkerStats, claim_neighbours};
use crossbeam_channel::{Receiver, unbounded};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, warn};

pub(crate) fn crawl<N, S, E>(
    start: N,
    scope: &S,
    scope_key: &ScopeKey,
    expander: &E,
    workers: usize,
    deadline: &Deadline<'_>,
    progress: Option<&ProgressCallback<N>>,
) -> Result<CrawlResult<N>>
where
    N: Clone + Eq + Hash + Send + Sync + fmt::Debug,
    S: Scope<N> + ?Sized,
    E: Expander<N> + ?Sized,
{
    let wave_ctx = WaveContext {
        scope,
        scope_key,
        expander,
        visited: VisitedSet::new(),
        aborting: AtomicBool::new(false),
        progress,
        deadline,
    };
    let mut stats = CrawlStats::new(Strategy::Wavefront, workers);

    wave_ctx.visited.try_claim(&start);
    let mut wave = vec![start];
    let mut waves = 0;

    while !wave.is_empty() {
        deadline.check()?;
        waves += 1;
        debug!(wave = waves, size = wave.len(), "Dispatching wave");
        wave = run_wave(&wave_ctx, wave, workers, &mut stats)?;
    }
    // The last wave may have run past the deadline
    deadline.check()?;

    debug!(waves, "Wavefront exhausted");
    stats.waves = Some(waves);
    let WaveContext { visited, .. } = wave_ctx;
    Ok(CrawlResult::new(visited.into_inner(), stats))
}

struct WaveContext<'a, N, S: ?Sized, E: ?Sized> {
    scope: &'a S,
    scope_key: &'a ScopeKey,
    expander: &'a E,
    visited: VisitedSet<N>,
    aborting: AtomicBool,
    progress: Option<&'a ProgressCallback<N>>,
    deadline: &'a Deadline<'a>,
}

/// Expand one wave and return the next. Blocks until every thread of the wave
/// has been joined.
fn run_wave<N, S, E>(
    ctx: &WaveContext<'_, N, S, E>,
    wave: Vec<N>,
    workers: usize,
    stats: &mut CrawlStats,
) -> Result<Vec<N>>
where
    N: Clone + Eq + Hash + Send + Sync + fmt::Debug,
    S: Scope<N> + ?Sized,
    E: Expander<N> + ?Sized,
{
    let threads = workers.min(wave.len());
    let (tx, rx) = unbounded();
    for node in wave {
        let _ = tx.send(node);
    }
    // Closed channel: threads exit once the wave is drained
    drop(tx);

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        let mut spawn_error = None;
        for id in 0..threads {
            let rx = rx.clone();
            match thread::Builder::new()
                .name(format!("sitewalk-wave-{}", id))
                .spawn_scoped(s, move || expand_share(id, ctx, rx))
            {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    ctx.aborting.store(true, Ordering::SeqCst);
                    spawn_error = Some(ScanError::WorkerSpawn(e));
                    break;
                }
            }
        }

        let mut next = Vec::new();
        let mut first_error = spawn_error;
        for (id, handle) in handles {
            match handle.join() {
                Ok(Ok((worker_stats, found))) => {
                    stats.absorb(&worker_stats);
                    next.extend(found);
                }
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    warn!(worker = id, "Wave thread panicked");
                    first_error.get_or_insert(ScanError::WorkerPanicked { id });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(next),
        }
    })
}

/// Pull nodes of the current wave until it is drained.
fn expand_share<N, S, E>(
    id: usize,
    ctx: &WaveContext<'_, N, S, E>,
    rx: Receiver<N>,
) -> Result<(WorkerStats, Vec<N>)>
where
    N: Clone + Eq + Hash + Send + Sync + fmt::Debug,
    S: Scope<N> + ?Sized,
    E: Expander<N> + ?Sized,
{
    let mut stats = WorkerStats::default();
    let mut found = Vec::new();

    for node in rx.iter() {
        if ctx.aborting.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = ctx.deadline.check() {
            debug!(worker = id, "Deadline reached mid-wave");
            ctx.aborting.store(true, Ordering::SeqCst);
            return Err(e);
        }
        if let Some(callback) = ctx.progress {
            callback(id, &node);
        }

        stats.expanded += 1;
        let neighbours = match ctx.expander.expand(&node) {
            Ok(neighbours) => neighbours,
            Err(error) => {
                warn!(worker = id, node = ?node, error = %error, "Expansion failed, aborting");
                ctx.aborting.store(true, Ordering::SeqCst);
                return Err(ScanError::Expansion {
                    node: format!("{:?}", node),
                    source: error,
                });
            }
        };

        claim_neighbours(ctx.scope, ctx.scope_key, &ctx.visited, neighbours, &mut stats, |n| {
            found.push(n)
        });
    }

    Ok((stats, found))
}

#[cfg(test)]
mod tests {
    use crate::crawler::{Crawler, Strategy};
    use crate::expander::LinkGraph;

    #[test]
    fn test_wave_count_matches_depth() {
        let graph = LinkGraph::new()
            .with_links("http://example.com", ["http://example.com/a", "http://example.com/b"])
            .with_links("http://example.com/a", ["http://example.com/a/1"])
            .with_links("http://example.com/b", ["http://example.com/a/1"]);

        let result = Crawler::new()
            .with_workers(4)
            .with_strategy(Strategy::Wavefront)
            .crawl("http://example.com".to_string(), &graph)
            .unwrap();

        assert_eq!(result.len(), 4);
        // {root}, {a, b}, {a/1}
        assert_eq!(result.stats.waves, Some(3));
        assert_eq!(result.stats.discovered, 3);
        assert_eq!(result.stats.duplicates, 1);
        assert_eq!(result.stats.strategy, Strategy::Wavefront);
    }

    #[test]
    fn test_single_node_is_one_wave() {
        let result = Crawler::new()
            .with_strategy(Strategy::Wavefront)
            .crawl("http://lonely.com".to_string(), &LinkGraph::new())
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.stats.waves, Some(1));
    }
}
