//! Function invocation subsystem.
//!
//! # Data Flow
//! ```text
//! InvocationEvent (from http::request)
//!     → engine.rs (timeout, outcome classification, metrics)
//!     → process.rs (child process per invocation)
//!     → InvocationResult | Timeout | HandlerError
//! ```
//!
//! # Design Decisions
//! - Event/result shapes match the upstream gateway's proxy integration
//! - Timeouts are non-negotiable; every invocation has a deadline
//! - Handler failures never escape as panics; they are values

pub mod engine;
pub mod event;
pub mod process;

pub use engine::{FunctionRuntime, HandlerError, InvocationEngine, InvocationError};
pub use event::{InvocationEvent, InvocationResult};
pub use process::ProcessRuntime;
