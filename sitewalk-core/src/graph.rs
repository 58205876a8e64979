// Link-graph fixture loading

use serde::Deserialize;
use sitewalk_scanner::LinkGraph;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// The two on-disk shapes a graph file may take.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GraphFile {
    /// `{ "urls": [...], "edges": [[from, to], ...] }`
    Indexed {
        urls: Vec<String>,
        edges: Vec<[usize; 2]>,
    },
    /// `{ "http://a": ["http://b", ...], ... }`
    Adjacency(HashMap<String, Vec<String>>),
}

/// Parse a link graph from JSON, in adjacency or indexed form.
pub fn parse_graph(json: &str) -> Result<LinkGraph, String> {
    let file: GraphFile =
        serde_json::from_str(json).map_err(|e| format!("Invalid graph JSON: {}", e))?;

    match file {
        GraphFile::Adjacency(links) => Ok(LinkGraph::from(links)),
        GraphFile::Indexed { urls, edges } => {
            let mut graph = LinkGraph::new();
            for url in &urls {
                graph.add_links(url, Vec::<String>::new());
            }
            for (i, [from, to]) in edges.into_iter().enumerate() {
                let from_url = urls.get(from).ok_or_else(|| out_of_range(i, from, urls.len()))?;
                let to_url = urls.get(to).ok_or_else(|| out_of_range(i, to, urls.len()))?;
                graph.add_links(from_url, [to_url.clone()]);
            }
            Ok(graph)
        }
    }
}

fn out_of_range(edge: usize, index: usize, len: usize) -> String {
    format!(
        "Edge {} references URL index {} but only {} URLs are defined",
        edge, index, len
    )
}

/// Load a link graph from a JSON file.
pub fn load_graph_from_file(path: &Path) -> Result<LinkGraph, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read graph file {}: {}", path.display(), e))?;
    parse_graph(&content)
}
