//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::fault::{ProcessExit, ProcessLifecycle, Terminator};

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Holds the immutable configuration and the process lifecycle driven by the
/// crash endpoint. Handlers share nothing else.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub lifecycle: ProcessLifecycle,
}

impl AppState {
    /// Creates application state that really exits the process on crash.
    pub fn new(config: AppConfig) -> Self {
        Self::with_terminator(config, Arc::new(ProcessExit))
    }

    /// Creates application state with a custom terminator.
    pub fn with_terminator(config: AppConfig, terminator: Arc<dyn Terminator>) -> Self {
        let lifecycle = ProcessLifecycle::new(&config.fault, terminator);
        Self {
            config: Arc::new(config),
            lifecycle,
        }
    }
}
