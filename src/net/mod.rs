//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Requested host:port
//!     → listener.rs (bind, fall back to the next port while busy)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - A busy port is not fatal; up to `PORT_ATTEMPTS` successive ports are tried
//! - Any other bind error aborts startup

pub mod listener;

pub use listener::{bind_available, ListenerError, PORT_ATTEMPTS};
