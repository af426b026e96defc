//! HTTP server module.
//!
//! Serves the router over plain HTTP; TLS is expected to be terminated by the
//! ingress in front of the pod. The server includes:
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! A deliberate crash bypasses graceful shutdown entirely: the process exits
//! from the fault task and open connections are cut.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
