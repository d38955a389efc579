//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! route file (TOML)
//!     → loader.rs (parse, deserialize, resolve relative paths)
//!     → validation.rs (semantic checks)
//!     → EmulatorConfig (validated, immutable)
//!     → routes compiled into a RouteTable
//!
//! On source change:
//!     watcher.rs detects change
//!     → reload controller clears affected caches
//!     → route file re-loaded and re-validated if it changed
//!     → atomic swap of Arc<RouteTable>
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All top-level fields have defaults to allow minimal route files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::EmulatorConfig;
pub use schema::FunctionRoute;
pub use schema::HttpMethod;
pub use schema::RouteConfig;
