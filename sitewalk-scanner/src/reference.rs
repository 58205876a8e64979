//! Single-threaded depth-first traversal.
//!
//! Same contract as [`Crawler::crawl`](crate::crawler::Crawler::crawl) with a
//! pool of one and an explicit stack. Used to check the concurrent strategies.

use crate::error::{Result, ScanError};
use crate::expander::Expander;
use crate::scope::Scope;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

pub fn reference_crawl<N, S, E>(start: N, scope: &S, expander: &E) -> Result<HashSet<N>>
where
    N: Clone + Eq + Hash + fmt::Debug,
    S: Scope<N> + ?Sized,
    E: Expander<N> + ?Sized,
{
    let scope_key = scope.scope_key(&start);
    if !scope_key.is_valid() {
        return Err(ScanError::MalformedNode(format!("{:?}", start)));
    }

    let mut visited = HashSet::new();
    visited.insert(start.clone());
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        let neighbours = expander
            .expand(&node)
            .map_err(|error| ScanError::Expansion {
                node: format!("{:?}", node),
                source: error,
            })?;
        for neighbour in neighbours {
            if scope.in_scope(&neighbour, &scope_key) && visited.insert(neighbour.clone()) {
                stack.push(neighbour);
            }
        }
    }

    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::LinkGraph;
    use crate::scope::HostScope;

    #[test]
    fn test_reference_handles_cycles() {
        let graph = LinkGraph::new()
            .with_links("http://test.com/a", ["http://test.com/b"])
            .with_links("http://test.com/b", ["http://test.com/a"]);

        let visited = reference_crawl("http://test.com/a".to_string(), &HostScope, &graph).unwrap();
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_reference_deep_chain_does_not_recurse() {
        let graph = LinkGraph::layered("http://deep.test", 50_000, 1);
        let visited =
            reference_crawl("http://deep.test/page0".to_string(), &HostScope, &graph).unwrap();
        assert_eq!(visited.len(), 50_000);
    }

    #[test]
    fn test_reference_rejects_malformed_start() {
        let err = reference_crawl("::".to_string(), &HostScope, &LinkGraph::new()).unwrap_err();
        assert!(matches!(err, ScanError::MalformedNode(_)));
    }
}
