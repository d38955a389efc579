//! Hot reload of the route table.
//!
//! # Responsibilities
//! - Receive changed paths from the source watcher (or the handle)
//! - Coalesce bursts of events into one reload
//! - Clear caches of routes backed by a changed file
//! - Re-read the route file when it changed
//! - Build the next table and swap it in atomically
//!
//! # Design Decisions
//! - Reloads are processed one at a time on a single task
//! - A failed reload keeps the last good table; there is no error state
//! - Requests already dispatched keep the table they loaded

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{timeout_at, Instant};

use crate::cache::ResponseCache;
use crate::config::loader::{load_config, ConfigError};
use crate::config::validation::ValidationError;
use crate::config::watcher::SourceWatcher;
use crate::config::RouteConfig;
use crate::observability::metrics;
use crate::routing::{RouteKey, RouteTable};

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("route table rejected: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Listening,
    Reloading,
}

/// Published after every reload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadStatus {
    pub state: ReloadState,
    /// Number of completed reload attempts, successful or not.
    pub generation: u64,
    /// Error of the most recent attempt, if it failed.
    pub last_error: Option<String>,
}

impl Default for ReloadStatus {
    fn default() -> Self {
        Self {
            state: ReloadState::Listening,
            generation: 0,
            last_error: None,
        }
    }
}

pub struct ReloadController {
    routes: Arc<ArcSwap<RouteTable>>,
    cache: ResponseCache,
    /// Routes the current table was built from.
    current: Vec<RouteConfig>,
    config_path: Option<PathBuf>,
    watcher: Option<SourceWatcher>,
    debounce: Duration,
    status: watch::Sender<ReloadStatus>,
}

impl ReloadController {
    pub fn new(
        routes: Arc<ArcSwap<RouteTable>>,
        cache: ResponseCache,
        current: Vec<RouteConfig>,
        config_path: Option<PathBuf>,
        debounce: Duration,
    ) -> Self {
        let (status, _) = watch::channel(ReloadStatus::default());
        Self {
            routes,
            cache,
            current,
            config_path,
            watcher: None,
            debounce,
            status,
        }
    }

    /// Attach a filesystem watcher and point it at the current sources.
    pub fn with_watcher(mut self, watcher: SourceWatcher) -> Self {
        self.watcher = Some(watcher);
        self.sync_watcher();
        self
    }

    pub fn status(&self) -> watch::Receiver<ReloadStatus> {
        self.status.subscribe()
    }

    /// Process change notifications until shutdown or until every sender is gone.
    ///
    /// The first relevant change opens a batch that closes `debounce` later,
    /// however many events arrive in between.
    pub async fn run(
        mut self,
        mut changes: mpsc::UnboundedReceiver<PathBuf>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        'events: loop {
            let first = tokio::select! {
                _ = shutdown.recv() => break,
                changed = changes.recv() => match changed {
                    Some(path) if self.is_relevant(&path) => path,
                    Some(path) => {
                        tracing::trace!(path = ?path, "Ignoring change to unrelated file");
                        continue;
                    }
                    None => break,
                },
            };

            let mut batch = BTreeSet::from([first]);
            let deadline = Instant::now() + self.debounce;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break 'events,
                    changed = timeout_at(deadline, changes.recv()) => match changed {
                        Ok(Some(path)) => {
                            if self.is_relevant(&path) {
                                batch.insert(path);
                            }
                        }
                        Ok(None) | Err(_) => break,
                    },
                }
            }

            self.reload(&batch);
        }
        tracing::debug!("Reload controller stopped");
    }

    /// Whether `path` is the route file or backs a route of the current table.
    fn is_relevant(&self, path: &Path) -> bool {
        self.config_path.as_deref() == Some(path)
            || self
                .routes
                .load()
                .routes()
                .iter()
                .any(|route| route.config.is_backed_by(path))
    }

    /// One reload pass over a set of changed paths.
    pub fn reload(&mut self, changed: &BTreeSet<PathBuf>) {
        self.status.send_modify(|s| s.state = ReloadState::Reloading);
        for path in changed {
            tracing::info!(path = ?path, "File changed");
        }

        let outcome = self.apply(changed);
        let last_error = match &outcome {
            Ok(count) => {
                metrics::record_reload("success");
                tracing::info!(routes = count, "Routes reloaded");
                None
            }
            Err(e) => {
                metrics::record_reload("error");
                tracing::error!(error = %e, "Reload failed, keeping previous routes");
                Some(e.to_string())
            }
        };

        self.sync_watcher();
        self.status.send_modify(|s| {
            s.state = ReloadState::Listening;
            s.generation += 1;
            s.last_error = last_error;
        });
    }

    fn apply(&mut self, changed: &BTreeSet<PathBuf>) -> Result<usize, ReloadError> {
        let previous = self.routes.load_full();

        for route in previous.routes() {
            if changed.iter().any(|path| route.config.is_backed_by(path)) {
                self.cache.clear(&route.key);
            }
        }

        let configs = match &self.config_path {
            Some(path) if changed.contains(path) => load_config(path)?.routes,
            _ => self.current.clone(),
        };

        let next = RouteTable::build(configs.clone()).map_err(ReloadError::Validation)?;

        // A route whose definition changed keeps its key but not its cache.
        let before: BTreeMap<&RouteKey, &RouteConfig> = previous
            .routes()
            .iter()
            .map(|r| (&r.key, &r.config))
            .collect();
        for route in next.routes() {
            if before.get(&route.key).is_some_and(|old| **old != route.config) {
                self.cache.clear(&route.key);
            }
        }

        self.cache.sync(&next);
        let count = next.len();
        self.routes.store(Arc::new(next));
        self.current = configs;
        Ok(count)
    }

    fn sync_watcher(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let mut targets = self.routes.load().source_paths();
        if let Some(path) = &self.config_path {
            targets.insert(path.clone());
        }
        watcher.sync(targets);
    }
}
