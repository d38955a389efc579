//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::EmulatorConfig;
use crate::config::validation::{validate_routes, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a route file from a string, resolving relative paths against `base_dir`.
pub fn parse_config(content: &str, base_dir: &Path) -> Result<EmulatorConfig, ConfigError> {
    let mut config: EmulatorConfig = toml::from_str(content)?;
    for route in &mut config.routes {
        route.resolve_paths(base_dir);
    }

    validate_routes(&config.routes).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML route file.
pub fn load_config(path: &Path) -> Result<EmulatorConfig, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let path = std::path::absolute(path).map_err(io_err)?;
    let content = fs::read_to_string(&path).map_err(io_err)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("/"));

    parse_config(&content, base_dir)
}
