use anyhow::{Context, ensure};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sitewalk_scanner::{
    CancelToken, CrawlStats, Crawler, HostScope, LinkGraph, ProgressCallback, ScanError, Strategy,
    reference_crawl,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub urls: Vec<String>,
    pub threads: usize,
    pub strategy: Strategy,
    pub timeout: Option<Duration>,
    /// Stops the host being crawled and skips the remaining ones
    pub cancel: Option<CancelToken>,
    pub show_progress_bars: bool,
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything one start URL produced.
#[derive(Debug, Clone, Serialize)]
pub struct HostCrawl {
    pub start: String,
    /// Visited URLs in lexical order
    pub visited: Vec<String>,
    pub stats: CrawlStats,
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

fn spinner() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message("Starting crawl...");
    Ok(pb)
}

/// Execute a crawl with the given options
///
/// Each start URL gets its own traversal on tokio's blocking pool. A start URL
/// that fails is reported through `progress_callback` and skipped.
pub async fn execute_crawl(
    options: CrawlOptions,
    graph: Arc<LinkGraph>,
    progress_callback: Option<CrawlProgressCallback>,
) -> anyhow::Result<Vec<HostCrawl>> {
    let CrawlOptions {
        urls,
        threads,
        strategy,
        timeout,
        cancel,
        show_progress_bars,
    } = options;

    ensure!(threads > 0, "Thread count must be at least 1");

    let progress_bar = if show_progress_bars {
        Some(spinner()?)
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let node_callback: ProgressCallback<String> = {
        let pb = progress_bar.clone();
        let count = processed_count.clone();
        Arc::new(move |_worker_id: usize, _url: &String| {
            let processed = count.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb {
                pb.set_message(format!("Crawling... {} URLs processed", processed));
                pb.tick();
            }
        })
    };

    let mut all_results = Vec::with_capacity(urls.len());
    for (idx, url_str) in urls.iter().enumerate() {
        if let Some(ref callback) = progress_callback
            && urls.len() > 1
        {
            callback(format!(
                "Crawling host {}/{}: {}",
                idx + 1,
                urls.len(),
                url_str
            ));
        }

        let mut crawler = Crawler::new()
            .with_workers(threads)
            .with_strategy(strategy)
            .with_progress_callback(node_callback.clone());
        if let Some(timeout) = timeout {
            crawler = crawler.with_timeout(timeout);
        }
        if let Some(ref token) = cancel {
            crawler = crawler.with_cancel_token(token.clone());
        }

        let graph = graph.clone();
        let start = url_str.clone();
        let outcome = tokio::task::spawn_blocking(move || crawler.crawl(start, graph.as_ref()))
            .await
            .with_context(|| format!("Crawl task for {} did not complete", url_str))?;

        match outcome {
            Ok(result) => {
                info!(
                    start = %url_str,
                    visited = result.len(),
                    elapsed_ms = result.stats.elapsed.as_millis() as u64,
                    "Host crawled"
                );
                let visited = result.sorted().into_iter().cloned().collect();
                all_results.push(HostCrawl {
                    start: url_str.clone(),
                    visited,
                    stats: result.stats,
                });
            }
            Err(ScanError::Cancelled) => {
                warn!(start = %url_str, "Crawl cancelled, skipping remaining hosts");
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Crawl cancelled at {}", url_str));
                }
                break;
            }
            Err(e) => {
                warn!(start = %url_str, error = %e, "Crawl failed");
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Failed to crawl {}: {}", url_str, e));
                }
            }
        }
    }

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Crawl complete! {} URLs processed", total));
    }

    Ok(all_results)
}

/// One traversal run measured against the reference result.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub label: String,
    pub visited: usize,
    pub elapsed: Duration,
    /// Reference URLs this run did not reach
    pub missing: Vec<String>,
    /// URLs this run reached that the reference did not
    pub extra: Vec<String>,
}

impl StrategyRun {
    pub fn agrees(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub start: String,
    pub threads: usize,
    pub reference: StrategyRun,
    pub runs: Vec<StrategyRun>,
}

impl Comparison {
    pub fn agrees(&self) -> bool {
        self.runs.iter().all(StrategyRun::agrees)
    }
}

fn measure(
    label: &str,
    visited: &HashSet<String>,
    expected: &HashSet<String>,
    elapsed: Duration,
) -> StrategyRun {
    let mut missing: Vec<String> = expected.difference(visited).cloned().collect();
    let mut extra: Vec<String> = visited.difference(expected).cloned().collect();
    missing.sort();
    extra.sort();
    StrategyRun {
        label: label.to_string(),
        visited: visited.len(),
        elapsed,
        missing,
        extra,
    }
}

/// Run the single-threaded reference and both concurrent strategies from
/// `start` and report where they disagree.
pub async fn compare_strategies(
    start: &str,
    graph: Arc<LinkGraph>,
    threads: usize,
) -> anyhow::Result<Comparison> {
    ensure!(threads > 0, "Thread count must be at least 1");
    let start = start.to_string();

    tokio::task::spawn_blocking(move || -> anyhow::Result<Comparison> {
        let began = Instant::now();
        let expected = reference_crawl(start.clone(), &HostScope, graph.as_ref())
            .with_context(|| format!("Reference crawl from {} failed", start))?;
        let reference = measure("reference", &expected, &expected, began.elapsed());
        debug!(visited = expected.len(), "Reference crawl finished");

        let mut runs = Vec::new();
        for strategy in [Strategy::Counted, Strategy::Wavefront] {
            let result = Crawler::new()
                .with_workers(threads)
                .with_strategy(strategy)
                .crawl(start.clone(), graph.as_ref())
                .with_context(|| format!("{} crawl from {} failed", strategy, start))?;
            runs.push(measure(
                &strategy.to_string(),
                &result.visited,
                &expected,
                result.stats.elapsed,
            ));
        }

        Ok(Comparison {
            start,
            threads,
            reference,
            runs,
        })
    })
    .await
    .context("Comparison task did not complete")?
}
