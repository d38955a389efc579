//! Local API Gateway emulator.
//!
//! Serves a route file the way the cloud gateway would: function routes run
//! their handler per request, file and folder routes are answered from disk,
//! and edits to any backing file are picked up without a restart.
//!
//! ```text
//!     Client Request
//!     ──────────▶ net (bind) ──▶ http (dispatch) ──▶ routing (match)
//!                                     │
//!                 ┌───────────────────┴──────────────────┐
//!                 ▼                                      ▼
//!          cache ──▶ invoke (handler process)      static assets
//!                 │                                      │
//!     ◀───────────┴──────── response translation ◀──────┘
//!
//!     config watcher ──▶ lifecycle::reload ──▶ swap route table
//! ```

use std::path::PathBuf;

use clap::Parser;

use gateway_emulator::config::loader::load_config;
use gateway_emulator::lifecycle::shutdown;
use gateway_emulator::observability::logging;
use gateway_emulator::Emulator;

#[derive(Parser)]
#[command(name = "gateway-emulator")]
#[command(about = "Serve an API Gateway route table locally", long_about = None)]
#[command(version)]
struct Cli {
    /// Route file (TOML)
    routes: PathBuf,

    /// Port to listen on; the next free port is used if busy
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable per-route response caching
    #[arg(long)]
    cache: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.routes)?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.caching |= cli.cache;
    config.verbose |= cli.verbose;

    logging::init_logging(config.verbose);
    tracing::info!(
        routes = config.routes.len(),
        file = ?cli.routes,
        "gateway-emulator v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let handle = Emulator::new(config)
        .with_config_path(std::path::absolute(&cli.routes)?)
        .start()
        .await?;
    println!("Server listening at {}", handle.url());

    let signal = handle.shutdown_signal();
    tokio::spawn(async move {
        shutdown::ctrl_c().await;
        signal.trigger();
    });

    handle.wait().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
