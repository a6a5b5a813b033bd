use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::timer::Phase;

/// Why a `TaskUpdated` event was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskUpdateSource {
    Started,
    Skipped,
    Completed,
}

/// Everything the engine tells the outside world.
/// Task-list owners subscribe to credit progress; a sound player would hang
/// off `PhaseCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    TaskUpdated {
        task: Task,
        source: TaskUpdateSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elapsed_pomodoros: Option<f64>,
        at: DateTime<Utc>,
    },
    InterruptionEnded {
        id: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration_seconds: u64,
        interruption_type: Option<String>,
        selected_action: Option<String>,
    },
    /// Quantized work time flushed for one task, in hundredths of a pomodoro.
    PomodoroProgressByTaskId {
        task_id: String,
        elapsed_pomodoros: f64,
    },
    PhaseCompleted {
        from: Phase,
        to: Phase,
        skipped: bool,
        session_count: u32,
        at: DateTime<Utc>,
    },
}

pub trait EventSink {
    fn emit(&self, event: Event);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// In-process queue. The engine pushes, the owner drains; clones share the
/// same queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<Event>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Event> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl EventSink for EventQueue {
    fn emit(&self, event: Event) {
        self.inner.borrow_mut().push_back(event);
    }
}

impl EventSink for mpsc::Sender<Event> {
    fn emit(&self, event: Event) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.send(event);
    }
}
