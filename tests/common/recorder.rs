//! Event sink that records everything it is given
//!
//! When attached to a queue it also samples the worker's busy flag at the moment
//! each event is published.

#![allow(dead_code)]

use once_cell::sync::OnceCell;
use std::sync::Mutex;

use tubeforge::download::events::{EventSink, TaskEvent};
use tubeforge::download::queue::WorkerStatus;

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(TaskEvent, Option<bool>)>>,
    status: OnceCell<WorkerStatus>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts sampling `status` on every publish.
    pub fn watch(&self, status: WorkerStatus) {
        let _ = self.status.set(status);
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }

    /// Events paired with the busy flag observed when they were published.
    pub fn events_with_busy(&self) -> Vec<(TaskEvent, Option<bool>)> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn has_log(&self, needle: &str) -> bool {
        self.logs().iter().any(|l| l.contains(needle))
    }

    /// Only `TaskStarted` / `TaskFinished`, in order.
    pub fn lifecycle(&self) -> Vec<TaskEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, TaskEvent::TaskStarted(_) | TaskEvent::TaskFinished(_)))
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: TaskEvent) {
        let busy = self.status.get().map(|s| s.is_busy());
        self.events.lock().unwrap().push((event, busy));
    }
}
