//! Quit confirmation.
//!
//! Stopping mid-job can leave half-written media and a stale archive entry, so the
//! first Ctrl-C while the worker is busy only warns. A second Ctrl-C forces the exit;
//! otherwise the guard waits for the running task to finish.

use std::future::Future;

use crate::download::queue::WorkerStatus;

/// Why the guard let the process go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Nothing was running
    Idle,
    /// The running task finished after the first interrupt
    TaskCompleted,
    /// Second interrupt while busy
    Forced,
}

pub struct ShutdownGuard {
    status: WorkerStatus,
}

impl ShutdownGuard {
    pub fn new(status: WorkerStatus) -> Self {
        Self { status }
    }

    /// Waits for Ctrl-C and applies the confirmation rule.
    pub async fn wait(&self) -> ShutdownReason {
        self.wait_with(|| async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Same as [`wait`](Self::wait) with an arbitrary interrupt source.
    pub async fn wait_with<F, Fut>(&self, mut interrupt: F) -> ShutdownReason
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        interrupt().await;
        if !self.status.is_busy() {
            log::info!("Shutting down");
            return ShutdownReason::Idle;
        }

        log::warn!("A task is running; force quit may corrupt files. Press Ctrl-C again to force quit.");
        if let Some(url) = self.status.current_task() {
            log::warn!("Running: {}", url);
        }

        tokio::select! {
            _ = interrupt() => {
                log::warn!("Forced shutdown");
                ShutdownReason::Forced
            }
            _ = self.status.wait_idle() => {
                log::info!("Task finished, shutting down");
                ShutdownReason::TaskCompleted
            }
        }
    }
}
