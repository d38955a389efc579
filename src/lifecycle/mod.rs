//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate routes → Bind (port fallback) → Spawn reload controller
//!     → Spawn HTTP server → Return ServerHandle
//!
//! Reload (reload.rs):
//!     Watcher event → Debounce → Listening → Reloading
//!     → Clear affected caches → Rebuild table → Swap → Listening
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C / handle.shutdown() → Stop accepting → Drain requests → Exit
//! ```
//!
//! # Design Decisions
//! - Startup fails fast on an invalid route table
//! - Reload failures are logged; the last good table keeps serving
//! - One broadcast signal stops both the server and the reload controller

pub mod reload;
pub mod shutdown;
pub mod startup;

pub use reload::{ReloadController, ReloadError, ReloadState, ReloadStatus};
pub use shutdown::Shutdown;
pub use startup::{start, Emulator, ServerHandle, StartError};
