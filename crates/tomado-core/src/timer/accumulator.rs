//! Per-task work-time accounting.
//!
//! The current task accrues time through an [`AccrualWindow`]: an interval
//! with its own pause bookkeeping. Every accrual recomputes the task's total
//! from the window's timestamps, so missed ticks never lose time and repeated
//! ticks never add any.
//!
//! ```text
//! accumulated = carried + floor(now - started_at - paused) - flushed
//! ```
//!
//! `carried` is what the task had already accumulated when the window opened
//! (for example before an interruption). `flushed` is what has since been
//! reported or discarded, so it is never counted twice.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::whole_secs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrualWindow {
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub paused_ms: i64,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub carried_secs: u64,
    #[serde(default)]
    pub flushed_secs: u64,
}

impl AccrualWindow {
    fn new(task_id: &str, now: DateTime<Utc>, carried_secs: u64) -> Self {
        Self {
            task_id: task_id.to_string(),
            started_at: now,
            paused_ms: 0,
            paused_at: None,
            carried_secs,
            flushed_secs: 0,
        }
    }

    /// Carried plus active seconds up to `now` (or up to the pause).
    fn total_secs(&self, now: DateTime<Utc>) -> u64 {
        let end = self.paused_at.unwrap_or(now);
        let active = end - self.started_at - Duration::milliseconds(self.paused_ms);
        self.carried_secs + whole_secs(active)
    }
}

/// Work seconds as hundredths of a pomodoro, rounded down.
pub fn quantize(secs: u64, work_duration: u64) -> f64 {
    if work_duration == 0 {
        return 0.0;
    }
    let unit = work_duration as f64 / 100.0;
    (secs as f64 / unit).floor() / 100.0
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkTimeAccumulator {
    accumulated: HashMap<String, u64>,
    window: Option<AccrualWindow>,
}

impl WorkTimeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(accumulated: HashMap<String, u64>, window: Option<AccrualWindow>) -> Self {
        Self {
            accumulated,
            window,
        }
    }

    pub fn accumulated(&self, task_id: &str) -> u64 {
        self.accumulated.get(task_id).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> &HashMap<String, u64> {
        &self.accumulated
    }

    pub fn window(&self) -> Option<&AccrualWindow> {
        self.window.as_ref()
    }

    /// What `accrue` would store for `task_id` at `now`, without storing it.
    pub fn accrued_at(&self, task_id: &str, now: DateTime<Utc>) -> u64 {
        match &self.window {
            Some(w) if w.task_id == task_id => w.total_secs(now).saturating_sub(w.flushed_secs),
            _ => self.accumulated(task_id),
        }
    }

    /// Recompute `task_id`'s accumulation from its window. No-op for any task
    /// other than the window's.
    pub fn accrue(&mut self, task_id: &str, now: DateTime<Utc>) -> u64 {
        if !self.window.as_ref().is_some_and(|w| w.task_id == task_id) {
            return self.accumulated(task_id);
        }
        let secs = self.accrued_at(task_id, now);
        if secs > 0 {
            self.accumulated.insert(task_id.to_string(), secs);
        }
        secs
    }

    /// Open a window for `task_id`, carrying over its unflushed seconds.
    pub fn open_window(&mut self, task_id: &str, now: DateTime<Utc>) {
        let carried = self.accumulated(task_id);
        debug!(task_id, carried, "accrual window opened");
        self.window = Some(AccrualWindow::new(task_id, now, carried));
    }

    pub fn close_window(&mut self) -> Option<AccrualWindow> {
        let closed = self.window.take();
        if let Some(w) = &closed {
            debug!(task_id = %w.task_id, "accrual window closed");
        }
        closed
    }

    pub fn pause_window(&mut self, now: DateTime<Utc>) {
        if let Some(w) = self.window.as_mut() {
            if w.paused_at.is_none() {
                w.paused_at = Some(now);
            }
        }
    }

    pub fn resume_window(&mut self, now: DateTime<Utc>) {
        if let Some(w) = self.window.as_mut() {
            if let Some(paused_at) = w.paused_at.take() {
                w.paused_ms += (now - paused_at).num_milliseconds().max(0);
            }
        }
    }

    /// Report and clear every entry. Returns `(task_id, elapsed_pomodoros)`
    /// for each task with at least 0.01 pomodoro, sorted by task id.
    /// Sub-hundredth remainders are dropped.
    pub fn flush_all(&mut self, work_duration: u64) -> Vec<(String, f64)> {
        let mut drained: Vec<(String, u64)> = self.accumulated.drain().collect();
        drained.sort();

        let mut progress = Vec::with_capacity(drained.len());
        for (task_id, secs) in drained {
            if let Some(w) = self.window.as_mut().filter(|w| w.task_id == task_id) {
                w.flushed_secs += secs;
            }
            let pomodoros = quantize(secs, work_duration);
            if pomodoros > 0.0 {
                progress.push((task_id, pomodoros));
            }
        }
        progress
    }

    /// Drop one task's entry without reporting it.
    pub fn clear(&mut self, task_id: &str) {
        if let Some(secs) = self.accumulated.remove(task_id) {
            if let Some(w) = self.window.as_mut().filter(|w| w.task_id == task_id) {
                w.flushed_secs += secs;
            }
        }
    }

    /// Forget everything, including the open window.
    pub fn clear_all(&mut self) {
        self.accumulated.clear();
        self.window = None;
    }

    /// Quantized accumulation for `task_id` at `now`.
    pub fn elapsed_pomodoros(&self, task_id: &str, now: DateTime<Utc>, work_duration: u64) -> f64 {
        quantize(self.accrued_at(task_id, now), work_duration)
    }

    /// Total seconds the open window has accrued, flushed or not.
    pub fn window_elapsed(&self, now: DateTime<Utc>) -> u64 {
        self.window.as_ref().map_or(0, |w| w.total_secs(now))
    }
}
