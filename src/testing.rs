//! Testing utilities for exercising the service without killing the test runner.
//!
//! `RecordingTerminator` stands in for `ProcessExit` and remembers every exit it
//! was asked to perform. `TestServer` serves the full router on an ephemeral
//! loopback port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

use crate::config::AppConfig;
use crate::fault::Terminator;
use crate::routes::create_router;
use crate::state::AppState;

/// A terminator that records exit requests instead of exiting.
#[derive(Default)]
pub struct RecordingTerminator {
    exits: Mutex<Vec<(i32, Instant)>>,
    notify: Notify,
}

impl RecordingTerminator {
    /// Exit codes requested so far, oldest first.
    pub fn exit_codes(&self) -> Vec<i32> {
        self.exits
            .lock()
            .map(|exits| exits.iter().map(|(code, _)| *code).collect())
            .unwrap_or_default()
    }

    /// When the first exit was requested.
    pub fn first_exit_at(&self) -> Option<Instant> {
        self.exits
            .lock()
            .ok()
            .and_then(|exits| exits.first().map(|(_, at)| *at))
    }

    /// Wait until an exit has been requested, up to `timeout`.
    pub async fn wait_for_exit(&self, timeout: Duration) -> Option<i32> {
        tokio::time::timeout(timeout, async {
            loop {
                if let Some(code) = self.exit_codes().first().copied() {
                    return code;
                }
                self.notify.notified().await;
            }
        })
        .await
        .ok()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, exit_code: i32) {
        if let Ok(mut exits) = self.exits.lock() {
            exits.push((exit_code, Instant::now()));
        }
        self.notify.notify_one();
    }
}

/// Build application state wired to a fresh `RecordingTerminator`.
pub fn recording_state(config: AppConfig) -> (AppState, Arc<RecordingTerminator>) {
    let terminator = Arc::new(RecordingTerminator::default());
    let state = AppState::with_terminator(config, terminator.clone());
    (state, terminator)
}

/// The full router served on 127.0.0.1 with an OS-assigned port.
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    pub terminator: Arc<RecordingTerminator>,
    pub state: AppState,
}

impl TestServer {
    pub async fn start(config: AppConfig) -> std::io::Result<Self> {
        let (state, terminator) = recording_state(config);
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = create_router(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Test server failed");
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            terminator,
            state,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
