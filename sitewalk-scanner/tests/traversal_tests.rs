// Tests for the concurrent traversal engine

use proptest::prelude::{ProptestConfig, prop, prop_assert, prop_assert_eq, proptest};
use proptest::strategy::{BoxedStrategy, Strategy as _};
use sitewalk_scanner::{
    CrawlResult, Crawler, ExpandError, Expander, HostScope, LinkGraph, Strategy, reference_crawl,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

const STRATEGIES: [Strategy; 2] = [Strategy::Counted, Strategy::Wavefront];

/// Link graph that records how often each node was expanded.
struct CountingExpander {
    graph: LinkGraph,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl CountingExpander {
    fn new(graph: LinkGraph) -> Self {
        Self {
            graph,
            calls: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> HashMap<String, usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl Expander<String> for CountingExpander {
    fn expand(&self, node: &String) -> Result<Vec<String>, ExpandError> {
        *self.calls.lock().unwrap().entry(node.clone()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.graph.expand(node)
    }
}

fn urls(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn crawl(
    start: &str,
    expander: &(impl Expander<String> + ?Sized),
    workers: usize,
    strategy: Strategy,
) -> CrawlResult<String> {
    Crawler::new()
        .with_workers(workers)
        .with_strategy(strategy)
        .crawl(start.to_string(), expander)
        .unwrap()
}

// ============================================================================
// Fixtures
// ============================================================================

fn yahoo_graph() -> LinkGraph {
    LinkGraph::new()
        .with_links("http://news.yahoo.com", ["http://news.yahoo.com/us"])
        .with_links("http://news.yahoo.com/news", Vec::<String>::new())
        .with_links(
            "http://news.yahoo.com/news/topics/",
            ["http://news.yahoo.com", "http://news.yahoo.com/news"],
        )
        .with_links(
            "http://news.google.com",
            ["http://news.yahoo.com/news/topics/", "http://news.yahoo.com/news"],
        )
        .with_links("http://news.yahoo.com/us", Vec::<String>::new())
}

fn google_graph() -> LinkGraph {
    LinkGraph::new()
        .with_links("http://news.yahoo.com", ["http://news.yahoo.com/news/topics/"])
        .with_links("http://news.yahoo.com/news/topics/", ["http://news.yahoo.com/news"])
        .with_links(
            "http://news.google.com",
            [
                "http://news.yahoo.com/news/topics/",
                "http://news.yahoo.com/news",
                "http://news.yahoo.com",
            ],
        )
}

fn cycle_graph() -> LinkGraph {
    LinkGraph::new()
        .with_links("http://test.com/a", ["http://test.com/b", "http://test.com/c"])
        .with_links("http://test.com/b", ["http://test.com/a", "http://test.com/d"])
        .with_links("http://test.com/c", ["http://test.com/a"])
        .with_links("http://test.com/d", ["http://test.com/b"])
}

fn mixed_domain_graph() -> LinkGraph {
    LinkGraph::new()
        .with_links(
            "http://site1.com",
            [
                "http://site1.com/page1",
                "http://site2.com/page1",
                "http://site1.com/page2",
            ],
        )
        .with_links("http://site1.com/page1", ["http://site1.com/page3"])
        .with_links("http://site1.com/page2", ["http://site2.com/page2"])
        .with_links("http://site1.com/page3", Vec::<String>::new())
        .with_links("http://site2.com/page1", ["http://site2.com/page2"])
        .with_links("http://site2.com/page2", Vec::<String>::new())
}

#[test]
fn test_yahoo_news_crawl() {
    for strategy in STRATEGIES {
        let result = crawl("http://news.yahoo.com/news/topics/", &yahoo_graph(), 4, strategy);
        assert_eq!(
            result.visited,
            urls(&[
                "http://news.yahoo.com",
                "http://news.yahoo.com/news",
                "http://news.yahoo.com/news/topics/",
                "http://news.yahoo.com/us",
            ])
        );
    }
}

#[test]
fn test_google_domain_only() {
    for strategy in STRATEGIES {
        let result = crawl("http://news.google.com", &google_graph(), 4, strategy);
        assert_eq!(result.visited, urls(&["http://news.google.com"]));
        assert_eq!(result.stats.out_of_scope, 3);
    }
}

#[test]
fn test_linear_chain() {
    let graph = LinkGraph::new()
        .with_links("http://example.com", ["http://example.com/page1"])
        .with_links("http://example.com/page1", ["http://example.com/page2"])
        .with_links("http://example.com/page2", ["http://example.com/page3"])
        .with_links("http://example.com/page3", Vec::<String>::new());

    for strategy in STRATEGIES {
        let result = crawl("http://example.com", &graph, 3, strategy);
        assert_eq!(result.len(), 4);
    }
}

#[test]
fn test_circular_references_terminate() {
    for strategy in STRATEGIES {
        for workers in [1, 2, 8] {
            let result = crawl("http://test.com/a", &cycle_graph(), workers, strategy);
            assert_eq!(
                result.visited,
                urls(&[
                    "http://test.com/a",
                    "http://test.com/b",
                    "http://test.com/c",
                    "http://test.com/d",
                ])
            );
        }
    }
}

#[test]
fn test_two_node_cycle() {
    let graph = LinkGraph::new()
        .with_links("http://test.com/a", ["http://test.com/b"])
        .with_links("http://test.com/b", ["http://test.com/a"]);

    for strategy in STRATEGIES {
        let result = crawl("http://test.com/a", &graph, 2, strategy);
        assert_eq!(result.visited, urls(&["http://test.com/a", "http://test.com/b"]));
    }
}

#[test]
fn test_mixed_domains_are_filtered() {
    for strategy in STRATEGIES {
        let result = crawl("http://site1.com", &mixed_domain_graph(), 4, strategy);
        assert_eq!(
            result.visited,
            urls(&[
                "http://site1.com",
                "http://site1.com/page1",
                "http://site1.com/page2",
                "http://site1.com/page3",
            ])
        );
        assert!(result.visited.iter().all(|u| !u.contains("site2.com")));
    }
}

#[test]
fn test_out_of_scope_detour_does_not_leak_back_in() {
    // site1 -> site2 -> site1/hidden: hidden is only reachable through site2
    let graph = LinkGraph::new()
        .with_links("http://site1.com", ["http://site2.com/bridge"])
        .with_links("http://site2.com/bridge", ["http://site1.com/hidden"]);

    for strategy in STRATEGIES {
        let result = crawl("http://site1.com", &graph, 4, strategy);
        assert_eq!(result.visited, urls(&["http://site1.com"]));
    }
}

#[test]
fn test_malformed_neighbours_are_skipped() {
    let graph = LinkGraph::new().with_links(
        "http://example.com",
        ["not a url", "mailto:me@example.com", "http://example.com/ok"],
    );

    for strategy in STRATEGIES {
        let result = crawl("http://example.com", &graph, 2, strategy);
        assert_eq!(result.visited, urls(&["http://example.com", "http://example.com/ok"]));
        assert_eq!(result.stats.out_of_scope, 2);
    }
}

#[test]
fn test_isolated_start() {
    for strategy in STRATEGIES {
        let result = crawl("http://lonely.com", &LinkGraph::new(), 8, strategy);
        assert_eq!(result.visited, urls(&["http://lonely.com"]));
        assert_eq!(result.stats.expanded, 1);
    }
}

#[test]
fn test_pool_size_does_not_change_result() {
    let graph = LinkGraph::layered("http://performance.test", 100, 3);
    for strategy in STRATEGIES {
        let one = crawl("http://performance.test/page0", &graph, 1, strategy);
        let eight = crawl("http://performance.test/page0", &graph, 8, strategy);
        assert_eq!(one.visited, eight.visited);
        assert_eq!(one.len(), 100);
    }
}

#[test]
fn test_each_node_expanded_exactly_once() {
    // Dense graph so many workers race for the same neighbours
    let mut graph = LinkGraph::new();
    let pages: Vec<String> = (0..40).map(|i| format!("http://dense.test/{}", i)).collect();
    for page in &pages {
        graph.add_links(page, pages.iter().cloned());
    }

    for strategy in STRATEGIES {
        for workers in [1, 4, 16] {
            let expander =
                CountingExpander::new(graph.clone()).with_delay(Duration::from_micros(200));
            let result = crawl("http://dense.test/0", &expander, workers, strategy);

            let calls = expander.calls();
            assert_eq!(result.len(), 40);
            assert_eq!(calls.len(), 40);
            assert!(
                calls.values().all(|&n| n == 1),
                "re-expansion with {} workers ({}): {:?}",
                workers,
                strategy,
                calls
            );
            assert_eq!(result.stats.expanded, 40);
            assert_eq!(result.stats.discovered, 39);
        }
    }
}

#[test]
fn test_concurrent_independent_traversals() {
    let yahoo = yahoo_graph();
    let mixed = mixed_domain_graph();

    thread::scope(|s| {
        let a = s.spawn(|| crawl("http://news.yahoo.com/news/topics/", &yahoo, 4, Strategy::Counted));
        let b = s.spawn(|| crawl("http://site1.com", &mixed, 4, Strategy::Counted));
        assert_eq!(a.join().unwrap().len(), 4);
        assert_eq!(b.join().unwrap().len(), 4);
    });
}

#[test]
fn test_reference_matches_fixtures() {
    let visited =
        reference_crawl("http://site1.com".to_string(), &HostScope, &mixed_domain_graph()).unwrap();
    assert_eq!(visited.len(), 4);
}

// ============================================================================
// Completeness against the single-threaded reference
// ============================================================================

fn graph_strategy() -> BoxedStrategy<(LinkGraph, usize)> {
    (1usize..30).prop_flat_map(|nodes| {
        (
            prop::collection::vec(prop::bool::ANY, nodes),
            prop::collection::vec((0..nodes, 0..nodes), 0..nodes * 3),
            1usize..9,
        )
            .prop_map(move |(on_other_host, edges, workers)| {
                let url = |i: usize| {
                    // Node 0 is always the start and always on the main host
                    let host = if i > 0 && on_other_host[i] { "other.test" } else { "main.test" };
                    format!("http://{}/p{}", host, i)
                };
                let mut graph = LinkGraph::new();
                for (from, to) in edges {
                    graph.add_links(&url(from), [url(to)]);
                }
                (graph, workers)
            })
    })
    .boxed()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_matches_reference_traversal((graph, workers) in graph_strategy()) {
        let start = "http://main.test/p0".to_string();
        let expected = reference_crawl(start.clone(), &HostScope, &graph).unwrap();

        for strategy in STRATEGIES {
            let expander = CountingExpander::new(graph.clone());
            let result = Crawler::new()
                .with_workers(workers)
                .with_strategy(strategy)
                .crawl(start.clone(), &expander)
                .unwrap();

            prop_assert_eq!(&result.visited, &expected);
            prop_assert!(result.visited.iter().all(|u| u.starts_with("http://main.test/")));
            let calls = expander.calls();
            prop_assert_eq!(calls.len(), expected.len());
            prop_assert!(calls.values().all(|&n| n == 1));
        }
    }
}
