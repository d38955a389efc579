//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Validate, sort and compile route descriptors
//! - Register compiled routes into per-verb first-match lanes
//! - Look up the matching route for a request
//!
//! # Design Decisions
//! - Immutable after construction; reload builds a new table and swaps it
//! - Routes are identified by `RouteKey` (method + normalized path), which
//!   stays stable across reloads so caches can follow their route
//! - HEAD falls back to the GET lane when no HEAD route matches

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::validation::{validate_routes, ValidationError};
use crate::config::{HttpMethod, RouteConfig};
use crate::routing::matcher::VerbRouter;
use crate::routing::pattern::PathPattern;
use crate::routing::sorter::sort_by_specificity;

/// Stable identity of a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub method: HttpMethod,
    pub path: String,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A validated route ready for dispatch.
#[derive(Debug)]
pub struct CompiledRoute {
    pub key: RouteKey,
    pub pattern: PathPattern,
    pub config: RouteConfig,
}

/// A route selected for a request.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<CompiledRoute>,
    /// Wildcard name and captured remainder.
    pub wildcard: Option<(String, String)>,
}

/// Immutable, specificity-ordered route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
    lanes: VerbRouter<Arc<CompiledRoute>>,
}

impl RouteTable {
    /// Build a table from descriptors. No partial table is ever returned.
    pub fn build(routes: Vec<RouteConfig>) -> Result<Self, Vec<ValidationError>> {
        validate_routes(&routes)?;

        let mut table = RouteTable::default();
        for config in sort_by_specificity(routes) {
            let pattern = PathPattern::parse(config.public_path()).map_err(|source| {
                vec![ValidationError::InvalidPath {
                    path: config.public_path().to_string(),
                    source,
                }]
            })?;
            let method = config.method();
            let route = Arc::new(CompiledRoute {
                key: RouteKey {
                    method,
                    path: pattern.normalized(),
                },
                pattern,
                config,
            });
            table.lanes.register(method, route.clone());
            table.routes.push(route);
        }

        Ok(table)
    }

    /// Find the first route in registration order matching `method` and `path`.
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch> {
        let lookup = |m: HttpMethod| {
            self.lanes.first_match(m, |route| {
                route.pattern.match_path(path).map(|found| RouteMatch {
                    route: route.clone(),
                    wildcard: found.wildcard,
                })
            })
        };

        lookup(method).or_else(|| match method {
            HttpMethod::Head => lookup(HttpMethod::Get),
            _ => None,
        })
    }

    /// Methods with a route matching `path`, and whether any of them enables CORS.
    pub fn allowed_methods(&self, path: &str) -> (Vec<HttpMethod>, bool) {
        let mut methods = Vec::new();
        let mut cors = false;
        for method in HttpMethod::ALL {
            if let Some(found) = self.match_route(method, path) {
                cors |= found.route.config.options().cors_enabled;
                methods.push(method);
            }
        }
        (methods, cors)
    }

    /// Routes in specificity order.
    pub fn routes(&self) -> &[Arc<CompiledRoute>] {
        &self.routes
    }

    pub fn keys(&self) -> BTreeSet<RouteKey> {
        self.routes.iter().map(|r| r.key.clone()).collect()
    }

    /// Files and directories backing the routes.
    pub fn source_paths(&self) -> BTreeSet<PathBuf> {
        self.routes
            .iter()
            .map(|r| r.config.source_path().to_path_buf())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FileRoute, FolderRoute, FunctionRoute, RouteOptions};
    use std::collections::BTreeMap;

    fn options(path: &str) -> RouteOptions {
        RouteOptions {
            public_path: path.to_string(),
            ..Default::default()
        }
    }

    fn file(path: &str) -> RouteConfig {
        RouteConfig::File(FileRoute {
            options: options(path),
            file: PathBuf::from(format!("/srv{}", path.replace('*', "star"))),
        })
    }

    fn function(method: HttpMethod, path: &str) -> RouteConfig {
        RouteConfig::Function(FunctionRoute {
            options: RouteOptions {
                cors_enabled: true,
                ..options(path)
            },
            method,
            handler: PathBuf::from("/srv/handler.sh"),
            runtime: None,
            name: "fn".into(),
            memory_mb: 128,
            timeout_secs: 3,
            environment: BTreeMap::new(),
            parameters: Vec::new(),
        })
    }

    fn matched_path(table: &RouteTable, method: HttpMethod, path: &str) -> Option<String> {
        table.match_route(method, path).map(|m| m.route.key.path.clone())
    }

    #[test]
    fn test_most_specific_wins_regardless_of_input_order() {
        let table = RouteTable::build(vec![
            file("/*"),
            file("/assets/*"),
            file("/assets/bar/baz/*"),
            file("/assets/foo"),
            file("/assets/bar/baz"),
            file("/"),
        ])
        .unwrap();

        let get = |p| matched_path(&table, HttpMethod::Get, p);
        assert_eq!(get("/").as_deref(), Some("/"));
        assert_eq!(get("/index.html").as_deref(), Some("/*"));
        assert_eq!(get("/assets/foo").as_deref(), Some("/assets/foo"));
        assert_eq!(get("/assets/foo/x").as_deref(), Some("/assets/*"));
        assert_eq!(get("/assets/bar/baz").as_deref(), Some("/assets/bar/baz"));
        assert_eq!(get("/assets/bar/baz/q").as_deref(), Some("/assets/bar/baz/*"));
        assert_eq!(get("/assets/bar").as_deref(), Some("/assets/*"));
    }

    #[test]
    fn test_wildcard_capture() {
        let table = RouteTable::build(vec![RouteConfig::Folder(FolderRoute {
            options: options("/static/{file+}"),
            folder: PathBuf::from("/srv/public"),
        })])
        .unwrap();
        let found = table.match_route(HttpMethod::Get, "/static/css/site.css").unwrap();
        assert_eq!(found.wildcard, Some(("file".into(), "css/site.css".into())));
        assert_eq!(found.route.key.to_string(), "GET /static/*");
    }

    #[test]
    fn test_method_lanes_and_head_fallback() {
        let table = RouteTable::build(vec![
            function(HttpMethod::Post, "/items"),
            file("/items"),
        ])
        .unwrap();

        assert!(table.match_route(HttpMethod::Post, "/items").is_some());
        assert!(table.match_route(HttpMethod::Put, "/items").is_none());
        let head = table.match_route(HttpMethod::Head, "/items").unwrap();
        assert_eq!(head.route.key.method, HttpMethod::Get);

        let (methods, cors) = table.allowed_methods("/items");
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Head]);
        assert!(cors);
    }

    #[test]
    fn test_invalid_table_rejected_whole() {
        let result = RouteTable::build(vec![file("/ok"), file("/ok")]);
        assert!(result.is_err());
    }
}
