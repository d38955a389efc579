//! Route specificity ordering.
//!
//! Routes are registered into a first-match table, so the registration
//! order alone decides which route wins. Sorting by the specificity key puts
//! literal paths ahead of any wildcard that would also match them, and longer
//! wildcard prefixes ahead of shorter ones.

use crate::config::RouteConfig;
use crate::routing::pattern::PathPattern;

/// Sort key for a raw public path.
///
/// Unparseable paths sort by their raw text; validation rejects them before
/// a table is ever built.
pub fn specificity_key(public_path: &str) -> String {
    PathPattern::parse(public_path)
        .map(|p| p.specificity_key())
        .unwrap_or_else(|_| public_path.to_string())
}

/// Order routes most-specific first. Stable and idempotent.
pub fn sort_by_specificity(mut routes: Vec<RouteConfig>) -> Vec<RouteConfig> {
    routes.sort_by_cached_key(|r| specificity_key(r.public_path()));
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FileRoute, RouteOptions};
    use std::path::PathBuf;

    fn file_route(path: &str) -> RouteConfig {
        RouteConfig::File(FileRoute {
            options: RouteOptions {
                public_path: path.to_string(),
                ..Default::default()
            },
            file: PathBuf::from("index.html"),
        })
    }

    fn paths(routes: &[RouteConfig]) -> Vec<&str> {
        routes.iter().map(|r| r.public_path()).collect()
    }

    #[test]
    fn test_gateway_order() {
        let input = ["/", "/*", "/assets/*", "/assets/foo", "/assets/bar/baz/*", "/assets/bar/baz"];
        let sorted = sort_by_specificity(input.iter().map(|p| file_route(p)).collect());
        assert_eq!(
            paths(&sorted),
            vec!["/", "/assets/bar/baz", "/assets/bar/baz/*", "/assets/foo", "/assets/*", "/*"]
        );
    }

    #[test]
    fn test_idempotent() {
        let input = ["/b/*", "/a", "/b/c", "/*", "/a/{proxy+}"];
        let once = sort_by_specificity(input.iter().map(|p| file_route(p)).collect());
        let twice = sort_by_specificity(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_wildcard_spellings_sort_alike() {
        assert_eq!(specificity_key("/a/*"), specificity_key("/a/{proxy+}"));
        assert!(specificity_key("/a/zzz") < specificity_key("/a/*"));
        assert!(specificity_key("/a/b/*") < specificity_key("/a/*"));
    }
}
