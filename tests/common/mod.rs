//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gateway_emulator::config::schema::{FileRoute, FolderRoute, FunctionRoute, RouteOptions};
use gateway_emulator::config::{EmulatorConfig, HttpMethod, RouteConfig};
use gateway_emulator::lifecycle::ReloadStatus;
use gateway_emulator::{Emulator, ServerHandle};

/// PATH for handlers that need external commands; the runtime clears the
/// inherited environment.
pub const HANDLER_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Write an executable `/bin/sh` handler.
pub fn write_handler(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Handler that appends a line to `counter` on every run and answers `body`.
pub fn counting_handler(dir: &Path, name: &str, counter: &Path, body: &str) -> PathBuf {
    write_handler(
        dir,
        name,
        &format!(
            "echo run >> '{}'\nprintf '%s' '{{\"statusCode\":200,\"body\":\"{}\"}}'",
            counter.display(),
            body
        ),
    )
}

/// Number of times a counting handler ran.
pub fn runs(counter: &Path) -> usize {
    fs::read_to_string(counter)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

pub fn function(method: HttpMethod, public_path: &str, handler: &Path) -> FunctionRoute {
    FunctionRoute {
        options: RouteOptions {
            public_path: public_path.into(),
            ..Default::default()
        },
        method,
        handler: handler.to_path_buf(),
        runtime: None,
        name: handler
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "handler".into()),
        memory_mb: 128,
        timeout_secs: 5,
        environment: BTreeMap::from([("PATH".to_string(), HANDLER_PATH.to_string())]),
        parameters: Vec::new(),
    }
}

pub fn cached(mut function: FunctionRoute, ttl: u64) -> RouteConfig {
    function.options.cache_ttl_in_seconds = Some(ttl);
    RouteConfig::Function(function)
}

pub fn file(public_path: &str, file: &Path) -> RouteConfig {
    RouteConfig::File(FileRoute {
        options: RouteOptions {
            public_path: public_path.into(),
            ..Default::default()
        },
        file: file.to_path_buf(),
    })
}

pub fn folder(public_path: &str, folder: &Path, cors: bool) -> RouteConfig {
    RouteConfig::Folder(FolderRoute {
        options: RouteOptions {
            public_path: public_path.into(),
            cors_enabled: cors,
            ..Default::default()
        },
        folder: folder.to_path_buf(),
    })
}

/// Start an emulator on an ephemeral port.
pub async fn start(routes: Vec<RouteConfig>, caching: bool) -> ServerHandle {
    let config = EmulatorConfig {
        port: 0,
        caching,
        reload_debounce_ms: 50,
        routes,
        ..Default::default()
    };
    Emulator::new(config).start().await.unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

/// Wait until the reload controller finishes an attempt beyond `generation`.
pub async fn wait_for_reload(handle: &ServerHandle, generation: u64) -> ReloadStatus {
    let mut status = handle.reload_status();
    let settled = tokio::time::timeout(
        Duration::from_secs(10),
        status.wait_for(|s| s.generation > generation),
    )
    .await
    .expect("reload did not happen in time")
    .unwrap()
    .clone();
    settled
}

pub fn generation(handle: &ServerHandle) -> u64 {
    handle.reload_status().borrow().generation
}
