//! Local API Gateway emulator library.

pub mod cache;
pub mod config;
pub mod http;
pub mod invoke;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::EmulatorConfig;
pub use http::HttpServer;
pub use lifecycle::{start, Emulator, ServerHandle, Shutdown};
