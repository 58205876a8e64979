//! Membership predicate: which nodes belong to the crawl.
//!
//! A node's [`ScopeKey`] is derived by a pure function. Two nodes are in scope
//! together iff both keys are [`ScopeKey::Host`] and equal.

use std::fmt;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// Lower-cased host, plus `:port` when the URL names a non-default port.
    Host(String),
    /// The node could not be parsed. Never in scope with anything.
    Unparseable,
}

impl ScopeKey {
    pub fn matches(&self, other: &ScopeKey) -> bool {
        match (self, other) {
            (ScopeKey::Host(a), ScopeKey::Host(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ScopeKey::Host(_))
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Host(host) => f.write_str(host),
            ScopeKey::Unparseable => f.write_str("<unparseable>"),
        }
    }
}

pub trait Scope<N>: Send + Sync {
    fn scope_key(&self, node: &N) -> ScopeKey;

    fn in_scope(&self, node: &N, reference: &ScopeKey) -> bool {
        self.scope_key(node).matches(reference)
    }
}

impl<N, F> Scope<N> for F
where
    F: Fn(&N) -> ScopeKey + Send + Sync,
{
    fn scope_key(&self, node: &N) -> ScopeKey {
        self(node)
    }
}

/// Same-hostname scope for URL strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostScope;

impl<N: AsRef<str>> Scope<N> for HostScope {
    fn scope_key(&self, node: &N) -> ScopeKey {
        host_key(node.as_ref())
    }
}

/// Extract the scope key of a URL string.
pub fn host_key(url: &str) -> ScopeKey {
    let Ok(parsed) = Url::parse(url) else {
        return ScopeKey::Unparseable;
    };
    let Some(host) = parsed.host_str() else {
        return ScopeKey::Unparseable;
    };
    if host.is_empty() {
        return ScopeKey::Unparseable;
    }

    let host = host.to_ascii_lowercase();
    match parsed.port() {
        Some(port) => ScopeKey::Host(format!("{}:{}", host, port)),
        None => ScopeKey::Host(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key_basic() {
        assert_eq!(
            host_key("http://news.yahoo.com/news/topics/"),
            ScopeKey::Host("news.yahoo.com".to_string())
        );
    }

    #[test]
    fn test_host_key_ignores_path_query_and_fragment() {
        let a = host_key("http://example.com/a?b=c#d");
        let b = host_key("http://example.com");
        assert!(a.matches(&b));
    }

    #[test]
    fn test_host_key_keeps_explicit_port() {
        assert_eq!(
            host_key("http://example.com:8080/api"),
            ScopeKey::Host("example.com:8080".to_string())
        );
        // Default port is normalised away by the url crate
        assert_eq!(
            host_key("http://example.com:80/api"),
            ScopeKey::Host("example.com".to_string())
        );
    }

    #[test]
    fn test_host_key_is_case_insensitive() {
        assert!(host_key("http://EXAMPLE.com/x").matches(&host_key("http://example.com")));
    }

    #[test]
    fn test_subdomain_is_a_different_scope() {
        assert!(!host_key("http://api.example.com").matches(&host_key("http://example.com")));
    }

    #[test]
    fn test_unparseable_never_matches() {
        let bad = host_key("not a valid url");
        assert_eq!(bad, ScopeKey::Unparseable);
        assert!(!bad.matches(&ScopeKey::Unparseable));
        assert!(!bad.matches(&host_key("http://example.com")));
    }

    #[test]
    fn test_hostless_url_is_unparseable() {
        assert_eq!(host_key("mailto:someone@example.com"), ScopeKey::Unparseable);
    }

    #[test]
    fn test_closure_scope() {
        let first_char = |n: &String| match n.chars().next() {
            Some(c) => ScopeKey::Host(c.to_string()),
            None => ScopeKey::Unparseable,
        };
        let reference = first_char.scope_key(&"apple".to_string());
        assert!(first_char.in_scope(&"avocado".to_string(), &reference));
        assert!(!first_char.in_scope(&"banana".to_string(), &reference));
        assert!(!first_char.in_scope(&String::new(), &reference));
    }
}
