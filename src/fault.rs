//! Process lifecycle and deferred termination for fault injection.
//!
//! A crash request must never look like a connection reset to its caller. The
//! crash is therefore split in two phases:
//!
//! 1. The handler returns a response whose body reports, through a oneshot
//!    channel, the moment the HTTP layer is done with it (fully written or
//!    abandoned by the peer).
//! 2. A detached task waits for that report, sleeps the configured delay so
//!    the transport can flush, then hands control to a [`Terminator`].
//!
//! The process state only moves forward: `Alive -> Terminating -> Terminated`.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::FaultConfig;

const ALIVE: u8 = 0;
const TERMINATING: u8 = 1;
const TERMINATED: u8 = 2;

/// Observable process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Alive,
    Terminating,
    Terminated,
}

impl LifecycleState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            ALIVE => LifecycleState::Alive,
            TERMINATING => LifecycleState::Terminating,
            _ => LifecycleState::Terminated,
        }
    }
}

/// Ends the process once a crash has been delivered.
pub trait Terminator: Send + Sync + 'static {
    fn terminate(&self, exit_code: i32);
}

/// Production terminator: exits the OS process immediately.
///
/// In-flight requests on other connections are dropped on the floor.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, exit_code: i32) {
        std::process::exit(exit_code)
    }
}

/// Shared handle on the process lifecycle.
#[derive(Clone)]
pub struct ProcessLifecycle {
    inner: Arc<LifecycleInner>,
}

struct LifecycleInner {
    state: AtomicU8,
    delay: Duration,
    exit_code: i32,
    terminator: Arc<dyn Terminator>,
}

impl ProcessLifecycle {
    pub fn new(config: &FaultConfig, terminator: Arc<dyn Terminator>) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                state: AtomicU8::new(ALIVE),
                delay: Duration::from_millis(config.crash_delay_ms),
                exit_code: config.exit_code,
                terminator,
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_raw(self.inner.state.load(Ordering::Acquire))
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Move `Alive -> Terminating`.
    ///
    /// Returns `true` only for the caller that performed the transition; every
    /// later caller sees `false` and must not schedule another exit.
    pub fn begin_termination(&self) -> bool {
        self.inner
            .state
            .compare_exchange(ALIVE, TERMINATING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Spawn the detached task that ends the process after `delivered` fires.
    ///
    /// A dropped sender counts as delivered: the response body is gone either
    /// way and the crash must still happen.
    pub fn terminate_after(&self, delivered: oneshot::Receiver<()>) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _ = delivered.await;
            tracing::debug!(
                delay_ms = inner.delay.as_millis() as u64,
                "Crash response handed to transport, waiting before exit"
            );

            tokio::time::sleep(inner.delay).await;

            inner.state.store(TERMINATED, Ordering::Release);
            tracing::warn!(exit_code = inner.exit_code, "Terminating process");
            inner.terminator.terminate(inner.exit_code);
        })
    }
}

/// Fires its sender when dropped.
struct DeliverySignal(Option<oneshot::Sender<()>>);

impl Drop for DeliverySignal {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// Build a single-chunk body that reports when the HTTP layer releases it.
///
/// Hyper drops a response body after writing its last frame, or when the
/// connection goes away; both paths trip the returned receiver.
pub fn delivery_tracked_body(payload: Bytes) -> (Body, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    let signal = DeliverySignal(Some(tx));

    let stream = futures::stream::once(async move { Ok::<_, Infallible>(payload) }).map(
        move |chunk| {
            let _held = &signal;
            chunk
        },
    );

    (Body::from_stream(stream), rx)
}
