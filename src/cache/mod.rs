//! Per-route response caching.
//!
//! # Responsibilities
//! - Own one cache per cachable function route, keyed by `RouteKey`
//! - Map request URLs to successful invocation results
//! - Replace a route's cache wholesale when its source changes
//!
//! # Design Decisions
//! - Caches are addressed by route identity, not captured by handlers, so a
//!   reload can swap them without touching the route table
//! - Only status 200 results are stored; entries are never updated in place
//! - In-flight requests hold an `Arc<RouteCache>`; a clear swaps in a new
//!   cache and late writes land in the discarded one

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use url::form_urlencoded;

use crate::config::{FunctionRoute, RouteConfig};
use crate::invoke::InvocationResult;
use crate::observability::metrics;
use crate::routing::{CompiledRoute, RouteKey, RouteTable};

#[derive(Debug, Clone)]
struct CachedResponse {
    result: InvocationResult,
    stored_at: Instant,
}

/// The cache of a single route.
#[derive(Debug)]
pub struct RouteCache {
    ttl: Duration,
    entries: DashMap<String, CachedResponse>,
}

impl RouteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached result for `url`, unless absent or older than the TTL.
    pub fn get(&self, url: &str) -> Option<InvocationResult> {
        self.entries
            .get(url)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.result.clone())
    }

    /// `get`, reporting the hit or miss in logs and metrics.
    pub fn lookup(&self, key: &RouteKey, url: &str) -> Option<InvocationResult> {
        let hit = self.get(url);
        metrics::record_cache_lookup(hit.is_some());
        if hit.is_some() {
            tracing::info!(route = %key, url = %url, "Cache hit");
        } else {
            tracing::info!(route = %key, url = %url, "Cache miss");
        }
        hit
    }

    /// Store a result. Anything but a 200 is ignored.
    pub fn put(&self, url: &str, result: &InvocationResult) {
        if !result.is_success() {
            return;
        }
        self.entries.insert(
            url.to_string(),
            CachedResponse {
                result: result.clone(),
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All route caches of a running server.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    enabled: bool,
    caches: Arc<DashMap<RouteKey, Arc<RouteCache>>>,
}

impl ResponseCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            caches: Arc::new(DashMap::new()),
        }
    }

    /// TTL for a route, if the route may be cached at all.
    fn ttl_for(&self, config: &RouteConfig) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        match config {
            RouteConfig::Function(f) => f
                .options
                .cache_ttl_in_seconds
                .filter(|ttl| *ttl > 0)
                .map(Duration::from_secs),
            RouteConfig::File(_) | RouteConfig::Folder(_) => None,
        }
    }

    /// Create caches for newly registered routes and drop caches of routes
    /// that are gone or no longer cachable.
    pub fn sync(&self, table: &RouteTable) {
        let mut live = BTreeSet::new();
        for route in table.routes() {
            let Some(ttl) = self.ttl_for(&route.config) else {
                continue;
            };
            live.insert(route.key.clone());
            let stale = self
                .caches
                .get(&route.key)
                .map(|c| c.ttl() != ttl)
                .unwrap_or(true);
            if stale {
                self.caches.insert(route.key.clone(), Arc::new(RouteCache::new(ttl)));
            }
        }
        self.caches.retain(|key, _| live.contains(key));
        metrics::record_cache_routes(self.caches.len());
    }

    /// The live cache of `route`, if it is cachable.
    pub fn route_cache(&self, route: &CompiledRoute) -> Option<Arc<RouteCache>> {
        self.caches.get(&route.key).map(|c| c.value().clone())
    }

    /// Replace a route's cache with an empty one.
    pub fn clear(&self, key: &RouteKey) {
        if let Some(mut entry) = self.caches.get_mut(key) {
            let ttl = entry.ttl();
            *entry = Arc::new(RouteCache::new(ttl));
            tracing::debug!(route = %key, "Cache cleared");
        }
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

/// URL under which a function route's result is cached.
///
/// When the route declares cache-key parameters only those take part in the
/// key (sorted by name); otherwise the full path and query string are used.
pub fn cache_url(function: &FunctionRoute, path: &str, query: Option<&str>) -> String {
    let query = query.unwrap_or_default();
    let keys = function.cache_key_parameters();
    if keys.is_empty() {
        return if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        };
    }

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| keys.iter().any(|key| *key == &**k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        return path.to_string();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{}?{}", path, encoded)
}
