//! HTTP server startup logic.

use std::net::{IpAddr, SocketAddr};

use axum::Router;
use axum_server::Handle;

use crate::config::HttpServerConfig;

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    Address(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Resolve the configured host (IPv4 or IPv6 literal) and port into a socket address.
fn listen_addr(config: &HttpServerConfig) -> Result<SocketAddr, ServerError> {
    let ip: IpAddr = config
        .host
        .parse()
        .map_err(|e| ServerError::Address(format!("{}: {}", config.host, e)))?;
    Ok(SocketAddr::from((ip, config.port)))
}

/// Start the HTTP server on the configured host and port.
///
/// This function blocks until the server shuts down.
pub async fn start_server(app: Router, config: &HttpServerConfig) -> Result<(), ServerError> {
    let addr = listen_addr(config)?;

    let handle = Handle::new();

    tracing::info!(%addr, "Starting HTTP server");

    // Setup graceful shutdown
    shutdown::setup_shutdown_handler(handle.clone());

    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
