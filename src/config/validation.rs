//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check wildcard placement and folder route patterns
//! - Detect conflicting routes within one HTTP method
//! - Validate value ranges (timeouts > 0, names non-empty)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: &[RouteConfig] → Result<(), Vec<ValidationError>>
//! - Runs before a route table is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{HttpMethod, RouteConfig};
use crate::routing::pattern::{PathPattern, PatternError};

/// A single semantic problem in the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PatternError,
    },

    #[error("folder route '{path}' must end in a wildcard segment")]
    FolderWithoutWildcard { path: String },

    #[error("duplicate route {method} {path}")]
    DuplicatePath { method: HttpMethod, path: String },

    #[error("function '{name}' must have a timeout greater than zero")]
    InvalidTimeout { name: String },

    #[error("function route '{path}' has an empty name")]
    EmptyFunctionName { path: String },

    #[error("function '{name}' declares parameter '{parameter}' more than once or with an empty name")]
    InvalidParameter { name: String, parameter: String },
}

/// Validate a route table as a whole.
pub fn validate_routes(routes: &[RouteConfig]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen: HashSet<(HttpMethod, String)> = HashSet::new();

    for route in routes {
        let raw = route.public_path();
        let pattern = match PathPattern::parse(raw) {
            Ok(p) => p,
            Err(source) => {
                errors.push(ValidationError::InvalidPath {
                    path: raw.to_string(),
                    source,
                });
                continue;
            }
        };

        if let RouteConfig::Folder(_) = route {
            if !pattern.has_wildcard() {
                errors.push(ValidationError::FolderWithoutWildcard { path: raw.to_string() });
            }
        }

        if !seen.insert((route.method(), pattern.normalized())) {
            errors.push(ValidationError::DuplicatePath {
                method: route.method(),
                path: pattern.normalized(),
            });
        }

        if let RouteConfig::Function(f) = route {
            if f.name.trim().is_empty() {
                errors.push(ValidationError::EmptyFunctionName { path: raw.to_string() });
            }
            if f.timeout_secs == 0 {
                errors.push(ValidationError::InvalidTimeout { name: f.name.clone() });
            }
            let mut params = HashSet::new();
            for p in &f.parameters {
                if p.name.is_empty() || !params.insert(p.name.as_str()) {
                    errors.push(ValidationError::InvalidParameter {
                        name: f.name.clone(),
                        parameter: p.name.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
