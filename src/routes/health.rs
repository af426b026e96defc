//! Health check for container orchestration.
//!
//! Answers 200 for as long as the process exists, including the short window
//! after a crash has been scheduled. Once the process is gone health checks fail at
//! the connection level, which is the signal the orchestrator acts on.

use axum::http::StatusCode;

/// Health check handler.
pub async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
