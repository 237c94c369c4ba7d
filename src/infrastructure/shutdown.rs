//! Cancellation and Graceful Shutdown
//!
//! A cloneable cancellation token polled by enrichment between records,
//! and a controller that tracks in-flight batches so servers can drain
//! before the process exits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// Cooperative cancellation signal.
///
/// Cancelling is sticky and idempotent; every clone observes it.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Signal cancellation to all holders of this token.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Complete once the token has been cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Shutdown coordinator for the servers hosting enrichment.
///
/// Tracks in-flight batches and broadcasts shutdown through a shared
/// [`CancelToken`].
#[derive(Clone)]
pub struct ShutdownController {
    token: CancelToken,
    in_flight: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            token: CancelToken::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Token cancelled when shutdown begins.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Initiate graceful shutdown.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("initiating graceful shutdown");
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of batches currently being enriched.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Register an in-flight batch; the count drops when the guard does.
    pub fn batch_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            controller: self.clone(),
        }
    }

    fn batch_finished(&self) {
        let prev = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Wait for in-flight batches to finish, up to `timeout`.
    ///
    /// Returns false if batches were still running at the deadline.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            // Registered before the check so a concurrent drop is not missed.
            let notified = self.drained.notified();
            if self.in_flight() == 0 {
                return true;
            }

            tokio::select! {
                _ = notified => {}
                _ = &mut deadline => {
                    tracing::warn!(
                        "drain timeout: {} batches still in flight",
                        self.in_flight()
                    );
                    return false;
                }
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for an in-flight batch.
pub struct InFlightGuard {
    controller: ShutdownController,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.controller.batch_finished();
    }
}

/// Wait for SIGINT or SIGTERM, then start shutdown.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }

    controller.shutdown();
}
