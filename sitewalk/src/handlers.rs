use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use sitewalk_core::crawl::{CrawlOptions, CrawlProgressCallback, compare_strategies, execute_crawl};
use sitewalk_core::graph::load_graph_from_file;
use sitewalk_core::report::{ReportFormat, render, render_comparison, save_report};
use sitewalk_scanner::{CancelToken, LinkGraph, Strategy};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, info, warn};
use url::Url;

// Helper functions for crawl handler

/// Clap value parser for start URLs. Keeps the text as typed, since graph
/// keys are matched verbatim.
pub fn parse_start_url(value: &str) -> Result<String, String> {
    match Url::parse(value) {
        Ok(url) if url.has_host() => Ok(value.to_string()),
        Ok(_) => Err(format!("'{}' has no host", value)),
        Err(e) => Err(format!("'{}' is not a valid URL: {}", value, e)),
    }
}

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&String>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.clone()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let content = fs::read_to_string(&expanded)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    // "localhost:8080" parses with "localhost" as its scheme
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.has_host()
    {
        return Some(with_scheme);
    }

    warn!(line, "Skipping invalid URL");
    None
}

/// Load a link graph, expanding `~` in the path
pub fn load_graph(path: &str) -> anyhow::Result<LinkGraph> {
    let expanded = shellexpand::tilde(path);
    let graph = load_graph_from_file(Path::new(expanded.as_ref())).map_err(anyhow::Error::msg)?;
    info!(
        path = %expanded,
        pages = graph.len(),
        links = graph.edge_count(),
        "Link graph loaded"
    );
    Ok(graph)
}

/// Log level for the given `-v` count; `--quiet` only lets errors through.
pub fn log_level(verbosity: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init_logging(verbosity: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level(verbosity, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "sitewalk".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
}

/// Cancel token tripped by Ctrl-C.
fn ctrl_c_token() -> CancelToken {
    let token = CancelToken::new();
    let trip = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping crawl");
            trip.cancel();
        }
    });
    token
}

/// Closing status line for a crawl run. Fails when no host produced a result.
pub fn crawl_summary(requested: usize, crawled: usize, cancelled: bool) -> anyhow::Result<String> {
    match (crawled, cancelled) {
        (0, true) => bail!("Crawl cancelled before any host finished"),
        (0, false) => bail!("All {} host(s) failed to crawl", requested),
        (_, true) => Ok(format!(
            "{} Crawl cancelled, report covers {}/{} host(s)",
            "!".yellow().bold(),
            crawled,
            requested
        )),
        _ if crawled < requested => Ok(format!(
            "{} Crawl finished, {} of {} host(s) failed",
            "!".yellow().bold(),
            requested - crawled,
            requested
        )),
        _ => Ok(format!("{} Crawl complete!", "✓".green().bold())),
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let quiet = sub_matches.get_flag("quiet");
    let url = sub_matches.get_one::<String>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&10);
    let strategy = sub_matches
        .get_one::<String>("strategy")
        .and_then(|s| Strategy::from_str(s))
        .unwrap_or_default();
    let timeout = sub_matches
        .get_one::<u64>("timeout")
        .map(|secs| Duration::from_secs(*secs));
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches.get_one::<PathBuf>("output");
    let Some(graph_path) = sub_matches.get_one::<String>("graph") else {
        bail!("--graph is required");
    };

    let urls = load_urls_from_source(url, hosts_file).map_err(anyhow::Error::msg)?;
    let graph = Arc::new(load_graph(graph_path)?);

    if !quiet {
        eprintln!("\n{} Crawling {} host(s)", "→".blue(), urls.len());
        eprintln!("Workers:  {}", threads);
        eprintln!("Strategy: {}", strategy);
        if let Some(timeout) = timeout {
            eprintln!("Timeout:  {}s", timeout.as_secs());
        }
        eprintln!();
    }

    let requested = urls.len();
    let cancel = ctrl_c_token();
    let options = CrawlOptions {
        urls,
        threads,
        strategy,
        timeout,
        cancel: Some(cancel.clone()),
        show_progress_bars: !quiet,
    };

    let progress_callback: CrawlProgressCallback = if quiet {
        Arc::new(|_msg: String| {})
    } else {
        Arc::new(|msg: String| eprintln!("{}", msg))
    };

    let results = execute_crawl(options, graph, Some(progress_callback))
        .await
        .context("Crawl failed")?;

    let summary = crawl_summary(requested, results.len(), cancel.is_cancelled())?;
    if !quiet {
        eprintln!("\n{}\n", summary);
    }

    let report = render(&results, format)?;
    match output {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            save_report(&report, Path::new(&expanded))
                .with_context(|| format!("Failed to write report to {}", expanded))?;
            debug!(path = %expanded, "Report written");
            if !quiet {
                eprintln!("{} Report saved to {}", "✓".green().bold(), expanded);
            }
        }
        None => print!("{}", report),
    }

    Ok(())
}

pub async fn handle_compare(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&10);
    let Some(url) = sub_matches.get_one::<String>("url") else {
        bail!("--url is required");
    };
    let Some(graph_path) = sub_matches.get_one::<String>("graph") else {
        bail!("--graph is required");
    };

    let graph = Arc::new(load_graph(graph_path)?);
    let comparison = compare_strategies(url, graph, threads).await?;

    print!("{}", render_comparison(&comparison));
    if !comparison.agrees() {
        bail!("Strategies returned different results");
    }
    Ok(())
}
