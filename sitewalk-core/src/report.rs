// Report generation from crawl results

use crate::crawl::{Comparison, HostCrawl, extract_url_path};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    /// File extension used when writing this format
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Markdown => "md",
        }
    }
}

pub fn render(crawls: &[HostCrawl], format: ReportFormat) -> anyhow::Result<String> {
    Ok(match format {
        ReportFormat::Text => generate_text_report(crawls),
        ReportFormat::Json => generate_json_report(crawls)?,
        ReportFormat::Csv => generate_csv_report(crawls),
        ReportFormat::Markdown => generate_markdown_report(crawls),
    })
}

/// Group URLs by host (with port when present), each group sorted.
fn group_by_host(urls: &[String]) -> BTreeMap<String, Vec<&str>> {
    let mut by_host: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for url in urls {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| {
                u.host_str().map(|h| match u.port() {
                    Some(port) => format!("{}:{}", h, port),
                    None => h.to_string(),
                })
            })
            .unwrap_or_else(|| "unknown".to_string());
        by_host.entry(host).or_default().push(url);
    }
    for urls in by_host.values_mut() {
        urls.sort_unstable();
    }
    by_host
}

pub fn generate_text_report(crawls: &[HostCrawl]) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str("                          SITEWALK CRAWL REPORT\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    let total: usize = crawls.iter().map(|c| c.visited.len()).sum();
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Start URLs:    {}\n", crawls.len()));
    report.push_str(&format!("  Pages visited: {}\n\n", total));

    for crawl in crawls {
        report.push_str(RULE);
        report.push_str("\n\n");
        report.push_str(&format!("Start:     {}\n", crawl.start));
        report.push_str(&format!(
            "Strategy:  {} ({} workers)\n",
            crawl.stats.strategy, crawl.stats.workers
        ));
        report.push_str(&format!(
            "Elapsed:   {:.3}s\n",
            crawl.stats.elapsed.as_secs_f64()
        ));
        if let Some(waves) = crawl.stats.waves {
            report.push_str(&format!("Waves:     {}\n", waves));
        }
        report.push_str(&format!(
            "Links:     {} followed, {} out of scope, {} duplicate\n\n",
            crawl.stats.discovered, crawl.stats.out_of_scope, crawl.stats.duplicates
        ));

        for (host, urls) in group_by_host(&crawl.visited) {
            report.push_str(&format!("## {}\n", host.bold().cyan()));
            report.push_str(&format!("  {} pages found\n\n", urls.len()));
            for url in urls {
                report.push_str(&format!("  {}\n", extract_url_path(url)));
            }
            report.push('\n');
        }
    }

    report
}

pub fn generate_json_report(crawls: &[HostCrawl]) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Sitewalk",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "summary": {
                "start_urls": crawls.len(),
                "total_visited": crawls.iter().map(|c| c.visited.len()).sum::<usize>()
            },
            "crawls": crawls
        }
    });

    serde_json::to_string_pretty(&json_report)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn generate_csv_report(crawls: &[HostCrawl]) -> String {
    let mut report = String::from("start,url,path\n");
    for crawl in crawls {
        for url in &crawl.visited {
            report.push_str(&format!(
                "{},{},{}\n",
                csv_field(&crawl.start),
                csv_field(url),
                csv_field(&extract_url_path(url))
            ));
        }
    }
    report
}

pub fn generate_markdown_report(crawls: &[HostCrawl]) -> String {
    let mut report = String::from("# Sitewalk Crawl Report\n\n");
    report.push_str(&format!(
        "_Generated {}_\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    for crawl in crawls {
        report.push_str(&format!("## {}\n\n", crawl.start));
        report.push_str("| Strategy | Workers | Visited | Out of scope | Elapsed |\n");
        report.push_str("|---|---|---|---|---|\n");
        report.push_str(&format!(
            "| {} | {} | {} | {} | {:.3}s |\n\n",
            crawl.stats.strategy,
            crawl.stats.workers,
            crawl.visited.len(),
            crawl.stats.out_of_scope,
            crawl.stats.elapsed.as_secs_f64()
        ));
        for url in &crawl.visited {
            report.push_str(&format!("- `{}`\n", url));
        }
        report.push('\n');
    }

    report
}

/// Plain-text summary of a strategy comparison.
pub fn render_comparison(comparison: &Comparison) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Start: {} ({} workers)\n\n",
        comparison.start, comparison.threads
    ));

    for run in std::iter::once(&comparison.reference).chain(&comparison.runs) {
        let verdict = if run.agrees() {
            "ok".green()
        } else {
            "MISMATCH".red().bold()
        };
        out.push_str(&format!(
            "  {:<10} {:>6} visited  {:>10.3}ms  {}\n",
            run.label,
            run.visited,
            run.elapsed.as_secs_f64() * 1000.0,
            verdict
        ));
        for url in &run.missing {
            out.push_str(&format!("      missing {}\n", url));
        }
        for url in &run.extra {
            out.push_str(&format!("      extra   {}\n", url));
        }
    }

    out.push('\n');
    if comparison.agrees() {
        out.push_str("All strategies agree.\n");
    } else {
        out.push_str("Strategies disagree.\n");
    }
    out
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
