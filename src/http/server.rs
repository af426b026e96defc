//! HTTP server startup logic.

use std::net::SocketAddr;
use std::time::Duration;

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

/// Resolve `host:port` from configuration into a socket address.
pub fn listen_addr(config: &HttpServerConfig) -> Result<SocketAddr, ServerError> {
    format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            ServerError::Address(format!(
                "Invalid http.host or http.port ({}:{}): {}",
                config.host, config.port, e
            ))
        })
}

/// Start the HTTP server.
///
/// This function blocks until the server shuts down.
pub async fn start_server(app: Router, config: &HttpServerConfig) -> Result<(), ServerError> {
    let addr = listen_addr(config)?;
    let handle = Handle::new();

    tracing::info!(%addr, "Starting HTTP server");

    shutdown::setup_shutdown_handler(
        handle.clone(),
        Duration::from_secs(config.shutdown_grace_seconds),
    );

    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_from_defaults() {
        let addr = listen_addr(&HttpServerConfig::default()).unwrap();
        assert_eq!(addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn listen_addr_rejects_hostnames() {
        let config = HttpServerConfig {
            host: "not a host".to_string(),
            ..HttpServerConfig::default()
        };
        assert!(matches!(listen_addr(&config), Err(ServerError::Address(_))));
    }
}
