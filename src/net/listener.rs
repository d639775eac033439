//! TCP listener binding for server instances.
//!
//! # Responsibilities
//! - Bind to the configured host and port
//! - Report the bound local address
//! - Distinguish address errors from bind errors

use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Configured host is not an address.
    #[error("Invalid bind host '{0}'")]
    Address(String),
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a listener on `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| ListenerError::Address(host.to_string()))?;
    let addr = SocketAddr::new(ip, port);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(address = %addr, "Listener bound");
    Ok(listener)
}
