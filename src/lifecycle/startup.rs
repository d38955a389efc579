//! Server startup and the running-server handle.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cache::ResponseCache;
use crate::config::validation::ValidationError;
use crate::config::watcher::SourceWatcher;
use crate::config::{EmulatorConfig, RouteConfig};
use crate::http::{AppState, HttpServer};
use crate::invoke::{FunctionRuntime, InvocationEngine, ProcessRuntime};
use crate::lifecycle::reload::{ReloadController, ReloadStatus};
use crate::lifecycle::Shutdown;
use crate::net::{bind_available, ListenerError, PORT_ATTEMPTS};
use crate::observability::{logging, metrics};
use crate::routing::RouteTable;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid route table: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("server failed: {0}")]
    Server(#[from] std::io::Error),

    #[error("server task panicked")]
    Join(#[from] tokio::task::JoinError),
}

/// Builder for a running emulator.
pub struct Emulator {
    config: EmulatorConfig,
    config_path: Option<PathBuf>,
    runtime: Arc<dyn FunctionRuntime>,
}

impl Emulator {
    pub fn new(config: EmulatorConfig) -> Self {
        Self {
            config,
            config_path: None,
            runtime: Arc::new(ProcessRuntime::default()),
        }
    }

    /// Route file the config was loaded from; edits to it reload the table.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Replace the process runtime.
    pub fn with_runtime(mut self, runtime: Arc<dyn FunctionRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Validate the routes, bind, and start serving.
    pub async fn start(self) -> Result<ServerHandle, StartError> {
        let Emulator {
            config,
            config_path,
            runtime,
        } = self;

        let table = RouteTable::build(config.routes.clone()).map_err(StartError::Validation)?;
        tracing::info!(routes = table.len(), caching = config.caching, "Route table validated");

        if let Some(addr) = &config.metrics_address {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|_| StartError::MetricsAddress(addr.clone()))?;
            metrics::init_metrics(addr);
        }

        let cache = ResponseCache::new(config.caching);
        cache.sync(&table);
        let routes = Arc::new(ArcSwap::from_pointee(table));

        let listener = bind_available(&config.host, config.port, PORT_ATTEMPTS).await?;
        let local_addr = listener.local_addr()?;

        let shutdown = Shutdown::new();
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        let mut controller = ReloadController::new(
            routes.clone(),
            cache.clone(),
            config.routes.clone(),
            config_path,
            Duration::from_millis(config.reload_debounce_ms),
        );
        match SourceWatcher::new(change_tx.clone()) {
            Ok(watcher) => controller = controller.with_watcher(watcher),
            Err(e) => tracing::warn!(error = %e, "File watching unavailable, hot reload disabled"),
        }
        let reload_status = controller.status();
        let reload_task = tokio::spawn(controller.run(change_rx, shutdown.subscribe()));

        let server = HttpServer::new(AppState {
            routes: routes.clone(),
            cache: cache.clone(),
            engine: InvocationEngine::new(runtime),
            stage: config.stage.clone(),
        });
        let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

        tracing::info!(address = %local_addr, "Listening for connections");

        Ok(ServerHandle {
            local_addr,
            routes,
            cache,
            change_tx,
            reload_status,
            shutdown,
            server_task,
            reload_task,
        })
    }
}

/// Start serving `routes` on `port`, printing the bound URL once listening.
pub async fn start(
    routes: Vec<RouteConfig>,
    port: u16,
    caching: bool,
    verbose: bool,
) -> Result<ServerHandle, StartError> {
    logging::init_logging(verbose);

    let config = EmulatorConfig {
        port,
        caching,
        verbose,
        routes,
        ..Default::default()
    };
    let handle = Emulator::new(config).start().await?;
    println!("Server listening at {}", handle.url());
    Ok(handle)
}

/// Handle to a running emulator.
pub struct ServerHandle {
    local_addr: SocketAddr,
    routes: Arc<ArcSwap<RouteTable>>,
    cache: ResponseCache,
    change_tx: mpsc::UnboundedSender<PathBuf>,
    reload_status: watch::Receiver<ReloadStatus>,
    shutdown: Shutdown,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    reload_task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Route table currently being served.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.load_full()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Report a changed source file, as the watcher would.
    pub fn notify_change(&self, path: impl Into<PathBuf>) {
        let _ = self.change_tx.send(path.into());
    }

    /// Status of the reload controller; changes after every reload attempt.
    pub fn reload_status(&self) -> watch::Receiver<ReloadStatus> {
        self.reload_status.clone()
    }

    /// Shutdown coordinator shared by the server and the reload controller.
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Resolve once the server has stopped.
    pub async fn wait(self) -> Result<(), StartError> {
        let result = self.server_task.await?;
        self.shutdown.trigger();
        let _ = self.reload_task.await;
        result.map_err(StartError::from)
    }

    /// Stop accepting, finish in-flight requests, and stop reloading.
    pub async fn shutdown(self) -> Result<(), StartError> {
        self.shutdown.trigger();
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FolderRoute, RouteOptions};

    fn config(routes: Vec<RouteConfig>) -> EmulatorConfig {
        EmulatorConfig {
            port: 0,
            routes,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_table_aborts_startup() {
        let routes = vec![RouteConfig::Folder(FolderRoute {
            options: RouteOptions {
                public_path: "/assets".into(),
                ..Default::default()
            },
            folder: PathBuf::from("/srv/assets"),
        })];

        let err = Emulator::new(config(routes)).start().await.err().unwrap();
        assert!(matches!(err, StartError::Validation(ref errors) if errors.len() == 1));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let handle = Emulator::new(config(Vec::new())).start().await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);
        assert!(handle.url().starts_with("http://127.0.0.1:"));
        assert!(handle.routes().is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_metrics_address() {
        let mut cfg = config(Vec::new());
        cfg.metrics_address = Some("nowhere".into());
        let err = Emulator::new(cfg).start().await.err().unwrap();
        assert!(matches!(err, StartError::MetricsAddress(_)));
    }
}
