//! Node expansion: the capability that turns a node into its neighbours.

use crate::error::ExpandError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub trait Expander<N>: Send + Sync {
    fn expand(&self, node: &N) -> Result<Vec<N>, ExpandError>;
}

impl<N, F> Expander<N> for F
where
    F: Fn(&N) -> Result<Vec<N>, ExpandError> + Send + Sync,
{
    fn expand(&self, node: &N) -> Result<Vec<N>, ExpandError> {
        self(node)
    }
}

/// In-memory link graph. Unknown URLs expand to no links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkGraph {
    links: HashMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links<I, S>(mut self, url: &str, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_links(url, links);
        self
    }

    pub fn add_links<I, S>(&mut self, url: &str, links: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links
            .entry(url.to_string())
            .or_default()
            .extend(links.into_iter().map(Into::into));
    }

    pub fn links(&self, url: &str) -> &[String] {
        self.links.get(url).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of pages with an outgoing link list.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    pub fn pages(&self) -> impl Iterator<Item = &String> {
        self.links.keys()
    }

    /// `pages` pages under `base`, where `page{i}` links to the next `fanout` pages.
    pub fn layered(base: &str, pages: usize, fanout: usize) -> Self {
        let base = base.trim_end_matches('/');
        let mut graph = Self::new();
        for i in 0..pages {
            let targets = (i + 1..pages)
                .take(fanout)
                .map(|j| format!("{}/page{}", base, j));
            graph.add_links(&format!("{}/page{}", base, i), targets);
        }
        graph
    }
}

impl From<HashMap<String, Vec<String>>> for LinkGraph {
    fn from(links: HashMap<String, Vec<String>>) -> Self {
        Self { links }
    }
}

impl Expander<String> for LinkGraph {
    fn expand(&self, node: &String) -> Result<Vec<String>, ExpandError> {
        Ok(self.links(node).to_vec())
    }
}
