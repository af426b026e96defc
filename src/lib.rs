//! imakube-backend: a small HTTP service for cluster demonstrations.
//!
//! Exposes a parity check, synthetic CPU load through naive Fibonacci, a
//! health check and a fault-injection endpoint that crashes the process only
//! after its response has reached the caller.

pub mod config;
pub mod error;
pub mod fault;
pub mod http;
pub mod load;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod testing;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
