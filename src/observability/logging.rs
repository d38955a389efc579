//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the log level from `RUST_LOG`, falling back to the verbose flag
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Pretty fmt output; this is a development tool
//! - Safe to call more than once (later calls are ignored)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "gateway_emulator=debug,tower_http=debug"
    } else {
        "gateway_emulator=info,tower_http=warn"
    }
}

/// Install the global subscriber.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert!(default_directives(true).contains("debug"));
        assert!(default_directives(false).starts_with("gateway_emulator=info"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(false);
        init_logging(true);
    }
}
