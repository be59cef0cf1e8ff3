//! Lifecycle and progress notifications consumed by a UI.
//!
//! The engine only needs a publish contract ([`EventSink`]). [`Events`] is the cheap,
//! cloneable handle the worker, runner and compositor emit through.

use std::sync::Arc;
use tokio::sync::mpsc;

/// Status label shown whenever no task is running.
pub const IDLE_STATUS: &str = "Idle";

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// Free-form human-readable line
    Log(String),
    /// Progress of the current phase, 0-100
    Progress(f64),
    /// Short phase label
    Status(String),
    TaskStarted(String),
    TaskFinished(String),
}

/// Receiver side of task events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TaskEvent);
}

/// Forwards events into a tokio channel, for UIs that consume them on their own task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: TaskEvent) {
        // A closed receiver means the UI is gone; the engine keeps going.
        let _ = self.tx.send(event);
    }
}

/// Writes events through the `log` facade. Used by the headless binary.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: TaskEvent) {
        match event {
            TaskEvent::Log(line) => log::info!("{}", line),
            TaskEvent::Progress(percent) => log::debug!("progress {:.1}%", percent),
            TaskEvent::Status(status) => log::debug!("status: {}", status),
            TaskEvent::TaskStarted(url) => log::info!("▶️ Task started: {}", url),
            TaskEvent::TaskFinished(url) => log::info!("⏹️ Task finished: {}", url),
        }
    }
}

/// Emitter handle.
#[derive(Clone)]
pub struct Events {
    sink: Arc<dyn EventSink>,
}

impl Events {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn log(&self, text: impl Into<String>) {
        self.sink.publish(TaskEvent::Log(text.into()));
    }

    /// Emits progress, clamped to 0-100.
    pub fn progress(&self, percent: f64) {
        let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
        self.sink.publish(TaskEvent::Progress(percent));
    }

    pub fn status(&self, text: impl Into<String>) {
        self.sink.publish(TaskEvent::Status(text.into()));
    }

    pub fn task_started(&self, url: &str) {
        self.sink.publish(TaskEvent::TaskStarted(url.to_string()));
    }

    pub fn task_finished(&self, url: &str) {
        self.sink.publish(TaskEvent::TaskFinished(url.to_string()));
    }

    /// Progress back to 0 and status back to idle.
    pub fn reset(&self) {
        self.progress(0.0);
        self.status(IDLE_STATUS);
    }
}
