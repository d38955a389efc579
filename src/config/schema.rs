//! Configuration schema definitions.
//!
//! This module defines the route file structure consumed by the emulator.
//! All types derive Serde traits for deserialization from the TOML route file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard integration timeout of the upstream gateway, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 28;

/// Root configuration for the emulator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Host to bind (e.g., "127.0.0.1").
    pub host: String,

    /// Requested listen port. The next free port is used if busy.
    pub port: u16,

    /// Enable per-route response caching.
    pub caching: bool,

    /// Debug-level logging.
    pub verbose: bool,

    /// Stage label reported in the request context.
    pub stage: String,

    /// Window in which file events coalesce into one reload.
    pub reload_debounce_ms: u64,

    /// Prometheus exporter bind address.
    pub metrics_address: Option<String>,

    /// Route definitions.
    pub routes: Vec<RouteConfig>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            caching: false,
            verbose: false,
            stage: "dev".to_string(),
            reload_debounce_ms: 100,
            metrics_address: None,
            routes: Vec::new(),
        }
    }
}

/// HTTP verbs a function route may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Map a framework method onto the supported set.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == method.as_str())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags shared by every route kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RouteOptions {
    /// URL path pattern; may end in a wildcard segment.
    pub public_path: String,

    #[serde(default)]
    pub cors_enabled: bool,

    /// Accepted and passed through; authorization is not emulated.
    #[serde(default)]
    pub authentication_enabled: bool,

    #[serde(default)]
    pub cache_ttl_in_seconds: Option<u64>,
}

/// A declarative route descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RouteConfig {
    Function(FunctionRoute),
    File(FileRoute),
    Folder(FolderRoute),
}

/// A route answered by invoking a handler.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FunctionRoute {
    #[serde(flatten)]
    pub options: RouteOptions,

    pub method: HttpMethod,

    /// Path to the handler source or executable.
    pub handler: PathBuf,

    /// Interpreter used to run the handler (e.g., "node").
    #[serde(default)]
    pub runtime: Option<String>,

    /// Logical function name.
    pub name: String,

    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub parameters: Vec<ParameterRule>,
}

fn default_memory_mb() -> u32 {
    128
}

fn default_timeout_secs() -> u64 {
    MAX_TIMEOUT_SECS
}

impl FunctionRoute {
    /// Effective timeout, capped at the upstream integration limit.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.min(MAX_TIMEOUT_SECS))
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().filter(|p| p.required).map(|p| p.name.as_str())
    }

    pub fn cache_key_parameters(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.cache_key)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Query parameter acceptance rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParameterRule {
    pub name: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub cache_key: bool,
}

/// A route answered with a single file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileRoute {
    #[serde(flatten)]
    pub options: RouteOptions,

    pub file: PathBuf,
}

/// A route answered from a directory; the wildcard selects the file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FolderRoute {
    #[serde(flatten)]
    pub options: RouteOptions,

    pub folder: PathBuf,
}

impl RouteConfig {
    pub fn options(&self) -> &RouteOptions {
        match self {
            RouteConfig::Function(r) => &r.options,
            RouteConfig::File(r) => &r.options,
            RouteConfig::Folder(r) => &r.options,
        }
    }

    pub fn public_path(&self) -> &str {
        &self.options().public_path
    }

    /// Static routes are served for GET.
    pub fn method(&self) -> HttpMethod {
        match self {
            RouteConfig::Function(r) => r.method,
            RouteConfig::File(_) | RouteConfig::Folder(_) => HttpMethod::Get,
        }
    }

    /// The file or directory on disk backing this route.
    pub fn source_path(&self) -> &Path {
        match self {
            RouteConfig::Function(r) => &r.handler,
            RouteConfig::File(r) => &r.file,
            RouteConfig::Folder(r) => &r.folder,
        }
    }

    /// True if a change at `changed` affects this route.
    pub fn is_backed_by(&self, changed: &Path) -> bool {
        match self {
            RouteConfig::Folder(r) => changed.starts_with(&r.folder),
            _ => self.source_path() == changed,
        }
    }

    /// Resolve relative paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        match self {
            RouteConfig::Function(r) => resolve(&mut r.handler),
            RouteConfig::File(r) => resolve(&mut r.file),
            RouteConfig::Folder(r) => resolve(&mut r.folder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_file() {
        let toml_src = r#"
            port = 4000
            caching = true

            [[routes]]
            type = "function"
            method = "GET"
            public_path = "/hello"
            handler = "functions/hello.sh"
            name = "hello"
            timeout_secs = 60
            cache_ttl_in_seconds = 30
            parameters = [{ name = "q", required = true }]

            [routes.environment]
            GREETING = "hi"

            [[routes]]
            type = "folder"
            public_path = "/assets/*"
            folder = "public"
            cors_enabled = true
        "#;

        let config: EmulatorConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.port, 4000);
        assert!(config.caching);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.routes.len(), 2);

        match &config.routes[0] {
            RouteConfig::Function(f) => {
                assert_eq!(f.method, HttpMethod::Get);
                assert_eq!(f.timeout(), Duration::from_secs(28));
                assert_eq!(f.memory_mb, 128);
                assert_eq!(f.environment.get("GREETING").map(String::as_str), Some("hi"));
                assert_eq!(f.required_parameters().collect::<Vec<_>>(), vec!["q"]);
                assert_eq!(f.options.cache_ttl_in_seconds, Some(30));
            }
            other => panic!("expected function route, got {:?}", other),
        }
        assert!(config.routes[1].options().cors_enabled);
        assert_eq!(config.routes[1].method(), HttpMethod::Get);
    }

    #[test]
    fn test_unknown_method_rejected() {
        let toml_src = r#"
            [[routes]]
            type = "function"
            method = "TRACE"
            public_path = "/x"
            handler = "x.sh"
            name = "x"
        "#;
        assert!(toml::from_str::<EmulatorConfig>(toml_src).is_err());
    }

    #[test]
    fn test_folder_backing() {
        let mut route = RouteConfig::Folder(FolderRoute {
            options: RouteOptions {
                public_path: "/static/*".into(),
                ..Default::default()
            },
            folder: PathBuf::from("site"),
        });
        route.resolve_paths(Path::new("/srv"));
        assert!(route.is_backed_by(Path::new("/srv/site/css/app.css")));
        assert!(!route.is_backed_by(Path::new("/srv/other.css")));
    }
}
