//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route table lookup)
//!     → matcher.rs (per-verb first-match lane)
//!     → pattern.rs (segment match, wildcard capture)
//!     → Return: matched route or NoMatch
//!
//! Route Compilation (at startup and on every reload):
//!     RouteConfig[]
//!     → validate (config::validation)
//!     → sorter.rs (specificity order)
//!     → Register into verb lanes
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Tables are compiled once, immutable while serving
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by specificity)

pub mod matcher;
pub mod pattern;
pub mod router;
pub mod sorter;

pub use router::{CompiledRoute, RouteKey, RouteMatch, RouteTable};
