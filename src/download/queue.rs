//! Single-worker FIFO task queue.
//!
//! Any number of producers hold a [`TaskSubmitter`]; exactly one tokio task drives
//! [`TaskQueue::run`]. Jobs run strictly one after another, so the download archive
//! and the output tree never see two writers at once.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::download::events::{EventSink, Events};
use crate::download::request::TaskInput;
use crate::download::runner::JobRunner;

/// Snapshot of what the worker is doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub busy: bool,
    /// URL of the running task
    pub current_task: Option<String>,
}

/// The busy flag and current task. Only the worker loop writes it.
#[derive(Debug)]
pub struct WorkerState {
    tx: watch::Sender<WorkerSnapshot>,
}

impl WorkerState {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(WorkerSnapshot::default());
        Self { tx }
    }

    fn begin(&self, url: &str) {
        self.tx.send_replace(WorkerSnapshot {
            busy: true,
            current_task: Some(url.to_string()),
        });
    }

    fn finish(&self) {
        self.tx.send_replace(WorkerSnapshot::default());
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus { rx: self.tx.subscribe() }
    }
}

/// Read-only view of [`WorkerState`].
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    rx: watch::Receiver<WorkerSnapshot>,
}

impl WorkerStatus {
    pub fn is_busy(&self) -> bool {
        self.rx.borrow().busy
    }

    pub fn current_task(&self) -> Option<String> {
        self.rx.borrow().current_task.clone()
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        self.rx.borrow().clone()
    }

    /// Resolves once the worker is idle (immediately if it already is).
    pub async fn wait_idle(&self) {
        let mut rx = self.rx.clone();
        // Err means the worker is gone, which is idle too
        let _ = rx.wait_for(|s| !s.busy).await;
    }
}

/// Producer handle. Cheap to clone; submitting never blocks and never fails.
#[derive(Debug, Clone)]
pub struct TaskSubmitter {
    tx: mpsc::UnboundedSender<TaskInput>,
    status: WorkerStatus,
}

impl TaskSubmitter {
    /// Enqueues a task. A bare URL string is accepted as well as a [`TaskInput`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tubeforge::download::queue::TaskSubmitter;
    /// # use tubeforge::download::request::{QualityMode, TaskInput};
    /// # fn example(submitter: &TaskSubmitter) {
    /// submitter.submit("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    /// submitter.submit(
    ///     TaskInput::new("https://www.bilibili.com/video/BV1xx411c7mD").quality_mode(QualityMode::AudioOnly),
    /// );
    /// # }
    /// ```
    pub fn submit(&self, input: impl Into<TaskInput>) {
        let input = input.into();
        let url = input.display_url().to_string();
        match self.tx.send(input) {
            Ok(()) => log::info!("Task queued: {}", url),
            Err(_) => log::warn!("Worker has shut down, dropping task {}", url),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }
}

/// Totals returned when the queue drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub completed: usize,
    pub failed: usize,
}

/// The worker side of the queue.
pub struct TaskQueue {
    rx: mpsc::UnboundedReceiver<TaskInput>,
    runner: JobRunner,
    events: Events,
    state: Arc<WorkerState>,
}

impl TaskQueue {
    pub fn new(runner: JobRunner, sink: Arc<dyn EventSink>) -> (Self, TaskSubmitter) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(WorkerState::new());
        let submitter = TaskSubmitter {
            tx,
            status: state.status(),
        };
        let queue = Self {
            rx,
            runner,
            events: Events::new(sink),
            state,
        };
        (queue, submitter)
    }

    pub fn status(&self) -> WorkerStatus {
        self.state.status()
    }

    /// Worker loop. Returns once every submitter is dropped and the queue is empty.
    pub async fn run(mut self) -> QueueSummary {
        log::info!("Task worker started");
        let mut summary = QueueSummary::default();

        while let Some(input) = self.rx.recv().await {
            let url = input.display_url().to_string();
            self.state.begin(&url);
            self.events.task_started(&url);

            let succeeded = match AssertUnwindSafe(self.runner.execute(input, &self.events))
                .catch_unwind()
                .await
            {
                Ok(report) => {
                    log::info!(
                        "Task finished: {} ({} attempt(s), success: {})",
                        report.url,
                        report.attempts.len(),
                        report.is_success()
                    );
                    report.is_success()
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    log::error!("Task panicked: {}: {}", url, message);
                    self.events.log(format!("❌ Fatal error: {}", message));
                    false
                }
            };
            if succeeded {
                summary.completed += 1;
            } else {
                summary.failed += 1;
            }

            self.events.task_finished(&url);
            self.state.finish();
            self.events.reset();
        }

        log::info!(
            "Task worker stopped ({} completed, {} failed)",
            summary.completed,
            summary.failed
        );
        summary
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
