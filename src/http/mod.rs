//! HTTP boundary of the emulator.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all dispatch)
//!     → [route table lookup]
//!     → request.rs (HTTP request → InvocationEvent)
//!     → [cache / invocation engine]
//!     → response.rs (InvocationResult → HTTP response)
//!     → cors.rs (allow-origin on CORS-enabled routes)
//!     → Send to client
//!
//! File and folder routes skip the engine:
//!     server.rs → assets.rs (resolve + stream from disk)
//! ```

pub mod assets;
pub mod cors;
pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
