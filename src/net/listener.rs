//! TCP listener binding with port fallback.
//!
//! # Responsibilities
//! - Bind to the configured host and port
//! - Move on to the next port while the requested one is busy
//! - Report the address actually bound

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

/// Ports tried, starting at the requested one, before giving up.
pub const PORT_ATTEMPTS: u16 = 20;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid listen host '{0}'")]
    InvalidHost(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("no free port in {first}..={last}")]
    Exhausted { first: u16, last: u16 },
}

/// Bind `host:port`, or the first free port among the next `attempts - 1`.
///
/// Port 0 asks the OS for an ephemeral port and never falls back.
pub async fn bind_available(host: &str, port: u16, attempts: u16) -> Result<TcpListener, ListenerError> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| ListenerError::InvalidHost(host.to_string()))?;

    let last = if port == 0 {
        0
    } else {
        port.saturating_add(attempts.max(1) - 1)
    };

    for candidate in port..=last {
        let addr = SocketAddr::new(ip, candidate);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if candidate != port {
                    tracing::warn!(requested = port, bound = candidate, "Requested port busy, using alternate");
                }
                tracing::debug!(address = %addr, "Listener bound");
                return Ok(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::debug!(address = %addr, "Port in use");
            }
            Err(source) => return Err(ListenerError::Bind { addr, source }),
        }
    }

    Err(ListenerError::Exhausted { first: port, last })
}
