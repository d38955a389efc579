//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events: bound URL, cache hit/miss, reloads)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Terminal (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (route, url, path) on every event
//! - Handler stderr is forwarded as log lines under the function name
//! - Metrics are cheap (no-ops without a recorder)

pub mod logging;
pub mod metrics;
