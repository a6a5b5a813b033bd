//! Phase engine implementation.
//!
//! The phase engine is a timestamp-based state machine over
//! `work -> break -> ... -> longBreak -> work`. It does not use internal
//! threads: the caller calls `tick()` periodically, and every tick recomputes
//! the remaining time from absolute timestamps, so a late or missed tick
//! never skews the result.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PhaseEngine::new(SystemClock, Database::open()?, EventQueue::new());
//! engine.set_current_task(tree.current_task().cloned());
//! engine.start();
//! // In a loop:
//! engine.tick(); // Returns Some(PhaseTransition) when a phase completes
//! ```
//!
//! Time spent on the current task is accrued only in the work phase and only
//! while no interruption is active. Accrued time is flushed as
//! `PomodoroProgressByTaskId` events whenever the timer pauses, a work phase
//! ends, the timer is reset, or the current task changes.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::accumulator::WorkTimeAccumulator;
use super::interruption::{
    ActiveInterruption, InterruptionRecord, InterruptionTracker, DEFAULT_INTERRUPTION_TYPE,
};
use super::phase::{Phase, TimerSettings};
use crate::clock::{from_epoch_secs, to_epoch_secs, whole_secs, Clock};
use crate::error::ValidationError;
use crate::events::{Event, EventSink, TaskUpdateSource};
use crate::storage::{keys, Persistence};
use crate::task::Task;

/// State is checkpointed whenever the remaining seconds hit a multiple of this.
const CHECKPOINT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub is_running: bool,
    pub session_count: u32,
    /// Set once the phase has started; `None` before the first start.
    pub phase_start_time: Option<DateTime<Utc>>,
    /// Set while paused, never while running.
    pub paused_at: Option<DateTime<Utc>>,
    /// Paused time since `phase_start_time`, in milliseconds.
    pub total_paused_ms: i64,
}

impl TimerState {
    fn fresh(settings: &TimerSettings) -> Self {
        Self {
            phase: Phase::Work,
            remaining_seconds: settings.work_duration,
            is_running: false,
            session_count: 0,
            phase_start_time: None,
            paused_at: None,
            total_paused_ms: 0,
        }
    }

    fn clear_timestamps(&mut self) {
        self.phase_start_time = None;
        self.paused_at = None;
        self.total_paused_ms = 0;
    }
}

/// Result of a completed (or skipped) phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub skipped: bool,
    pub session_count: u32,
    pub at: DateTime<Utc>,
}

/// Point-in-time view for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub is_running: bool,
    pub session_count: u32,
    pub cycles_until_long_break: u32,
    pub current_task_id: Option<String>,
    pub elapsed_pomodoros: f64,
    pub window_elapsed_seconds: u64,
    pub interruption: Option<ActiveInterruption>,
}

/// Core phase engine.
///
/// Owns the work-time accumulator and the interruption tracker; reads time
/// from the injected clock, writes through the injected store and publishes
/// through the injected sink.
pub struct PhaseEngine {
    settings: TimerSettings,
    state: TimerState,
    accumulator: WorkTimeAccumulator,
    interruptions: InterruptionTracker,
    current_task: Option<Task>,
    clock: Box<dyn Clock>,
    store: Box<dyn Persistence>,
    sink: Box<dyn EventSink>,
}

impl PhaseEngine {
    /// Create an engine, restoring settings and state from `store`.
    ///
    /// Missing or malformed values fall back to their defaults. A restored
    /// running timer is not reconciled until [`PhaseEngine::enter_foreground`]
    /// or [`PhaseEngine::tick`] is called.
    pub fn new(
        clock: impl Clock + 'static,
        store: impl Persistence + 'static,
        sink: impl EventSink + 'static,
    ) -> Self {
        let store: Box<dyn Persistence> = Box::new(store);
        let settings = TimerSettings::load(&*store);
        let state = restore_state(&*store, &settings);
        let accumulator = WorkTimeAccumulator::restore(
            read_json(&*store, keys::ACCUMULATED_WORK_TIME_BLOB).unwrap_or_default(),
            read_json(&*store, keys::TASK_WINDOW_BLOB),
        );
        let interruptions = InterruptionTracker::restore(
            read_json(&*store, keys::ACTIVE_INTERRUPTION_BLOB),
            read_json(&*store, keys::INTERRUPTION_RECORDS_BLOB).unwrap_or_default(),
        );
        debug!(
            phase = %state.phase,
            remaining = state.remaining_seconds,
            running = state.is_running,
            "phase engine restored"
        );

        Self {
            settings,
            state,
            accumulator,
            interruptions,
            current_task: None,
            clock: Box::new(clock),
            store,
            sink: Box::new(sink),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn session_count(&self) -> u32 {
        self.state.session_count
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current_task.as_ref()
    }

    pub fn accumulator(&self) -> &WorkTimeAccumulator {
        &self.accumulator
    }

    pub fn is_interrupted(&self) -> bool {
        self.interruptions.is_active()
    }

    pub fn active_interruption(&self) -> Option<&ActiveInterruption> {
        self.interruptions.active()
    }

    pub fn interruption_records(&self) -> &[InterruptionRecord] {
        self.interruptions.records()
    }

    /// Unflushed progress of the current task, in hundredths of a pomodoro.
    pub fn elapsed_pomodoros(&self) -> f64 {
        self.current_task
            .as_ref()
            .map_or(0.0, |task| self.elapsed_pomodoros_for(&task.id))
    }

    pub fn elapsed_pomodoros_for(&self, task_id: &str) -> f64 {
        if !self.state.phase.is_work() {
            return 0.0;
        }
        self.accumulator
            .elapsed_pomodoros(task_id, self.clock.now(), self.settings.work_duration)
    }

    /// Seconds accrued by the open accrual window, flushed or not.
    pub fn window_elapsed(&self) -> u64 {
        self.accumulator.window_elapsed(self.clock.now())
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            phase: self.state.phase,
            remaining_seconds: self.state.remaining_seconds,
            is_running: self.state.is_running,
            session_count: self.state.session_count,
            cycles_until_long_break: self.settings.cycles_until_long_break,
            current_task_id: self.current_task.as_ref().map(|t| t.id.clone()),
            elapsed_pomodoros: self.elapsed_pomodoros(),
            window_elapsed_seconds: self.window_elapsed(),
            interruption: self.interruptions.active().cloned(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) {
        if self.state.is_running {
            return;
        }
        let now = self.clock.now();
        match (self.state.phase_start_time, self.state.paused_at.take()) {
            (None, _) => {
                // Back-date the start so a partially used phase keeps its remaining time.
                let used = self.duration().saturating_sub(self.state.remaining_seconds);
                self.state.phase_start_time = Some(now - Duration::seconds(used as i64));
                self.state.total_paused_ms = 0;
            }
            (Some(_), Some(paused_at)) => {
                self.state.total_paused_ms += (now - paused_at).num_milliseconds().max(0);
            }
            (Some(_), None) => {}
        }
        self.state.is_running = true;

        if self.state.phase.is_work() && !self.interruptions.is_active() {
            if let Some(task_id) = self.current_task.as_ref().map(|t| t.id.clone()) {
                let resumes = self
                    .accumulator
                    .window()
                    .is_some_and(|w| w.task_id == task_id);
                if resumes {
                    self.accumulator.resume_window(now);
                } else {
                    self.accumulator.open_window(&task_id, now);
                }
            }
        }

        debug!(
            phase = %self.state.phase,
            remaining = self.state.remaining_seconds,
            "timer started"
        );
        self.emit_task_updated(TaskUpdateSource::Started, None, now);
        self.persist();
    }

    pub fn pause(&mut self) {
        if !self.state.is_running {
            return;
        }
        let now = self.clock.now();
        self.state.remaining_seconds = self.remaining_at(now);
        self.accrue(now);
        self.state.is_running = false;
        self.state.paused_at = Some(now);
        self.accumulator.pause_window(now);
        self.flush();
        debug!(
            phase = %self.state.phase,
            remaining = self.state.remaining_seconds,
            "timer paused"
        );
        self.persist();
    }

    pub fn toggle(&mut self) {
        if self.state.is_running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Call periodically. Returns `Some(PhaseTransition)` when a phase completes.
    pub fn tick(&mut self) -> Option<PhaseTransition> {
        if !self.state.is_running {
            return None;
        }
        let now = self.clock.now();
        let remaining = self.remaining_at(now);
        if remaining == 0 {
            self.state.remaining_seconds = 0;
            return Some(self.complete_phase(false, now));
        }

        self.state.remaining_seconds = remaining;
        if self.interruptions.is_active() {
            self.interruptions.update(now);
        } else {
            self.accrue(now);
        }
        if remaining % CHECKPOINT_INTERVAL_SECS == 0 {
            self.persist();
        }
        None
    }

    /// End the current phase early and start the next one.
    pub fn skip(&mut self) -> PhaseTransition {
        self.pause();
        let now = self.clock.now();
        let transition = self.complete_phase(true, now);
        self.start();
        transition
    }

    /// Stop and rewind the current phase.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.accrue(now);
        self.flush();
        self.state.is_running = false;
        self.state.remaining_seconds = self.duration();
        self.state.clear_timestamps();
        if self.state.phase.is_work() {
            if let Some(task_id) = self.current_task.as_ref().map(|t| t.id.clone()) {
                self.accumulator.clear(&task_id);
            }
            self.accumulator.close_window();
            self.interruptions.reset_live();
        }
        debug!(phase = %self.state.phase, "timer reset");
        self.persist();
    }

    /// Stop and return to the first work phase of a new cycle. A running timer
    /// is paused first so its unflushed work time is reported as progress.
    /// The interruption log and settings are kept.
    pub fn reset_cycle(&mut self) {
        self.pause();
        self.state = TimerState::fresh(&self.settings);
        self.accumulator.clear_all();
        debug!("cycle reset");
        self.persist();
    }

    /// Validate and apply new settings, restarting the cycle at work.
    pub fn update_settings(&mut self, settings: TimerSettings) -> Result<(), ValidationError> {
        settings.validate()?;
        self.pause();
        self.settings = settings;
        self.settings.save(&*self.store);
        self.accumulator.close_window();
        self.state = TimerState::fresh(&self.settings);
        self.interruptions.reset_live();
        info!(
            work = self.settings.work_duration,
            cycles = self.settings.cycles_until_long_break,
            "timer settings updated"
        );
        self.persist();
        Ok(())
    }

    /// Reconcile with the clock after the process was inactive.
    pub fn enter_foreground(&mut self) -> Option<PhaseTransition> {
        if !self.state.is_running {
            return None;
        }
        self.tick()
    }

    /// Persist immediately before the process goes inactive.
    pub fn enter_background(&mut self) {
        if self.state.is_running {
            let now = self.clock.now();
            self.state.remaining_seconds = self.remaining_at(now);
            self.accrue(now);
            self.persist();
        }
    }

    /// Switch the task that accrues work time. The previous task's time is
    /// flushed first.
    pub fn set_current_task(&mut self, task: Option<Task>) {
        let now = self.clock.now();
        let new_id = task.as_ref().map(|t| t.id.as_str());
        let switching = self
            .accumulator
            .window()
            .is_some_and(|w| Some(w.task_id.as_str()) != new_id);
        if switching {
            self.accrue(now);
            self.flush();
            self.accumulator.close_window();
        }

        self.current_task = task;
        if self.accumulator.window().is_none() && self.accrues() {
            if let Some(task_id) = self.current_task.as_ref().map(|t| t.id.clone()) {
                self.accumulator.open_window(&task_id, now);
            }
        }
        self.persist_accumulation();
    }

    /// Drop `task_id`'s unflushed time without reporting it.
    pub fn clear_accumulated_time(&mut self, task_id: &str) {
        self.accrue(self.clock.now());
        self.accumulator.clear(task_id);
        self.persist_accumulation();
    }

    /// Report the current task as done. Returns the progress handed over
    /// with the event; the accumulated time is cleared so it is never
    /// flushed again.
    pub fn complete_current_task(&mut self) -> Option<f64> {
        self.hand_over_current_task(TaskUpdateSource::Completed)
    }

    /// Report the current task as skipped; see [`PhaseEngine::complete_current_task`].
    pub fn skip_current_task(&mut self) -> Option<f64> {
        self.hand_over_current_task(TaskUpdateSource::Skipped)
    }

    /// Begin an interruption, starting the timer if it is stopped. Returns
    /// `false` if one is already active.
    pub fn start_interruption(
        &mut self,
        interruption_type: impl Into<String>,
        selected_action: Option<String>,
    ) -> bool {
        if self.interruptions.is_active() {
            return false;
        }
        let now = self.clock.now();
        self.accrue(now);
        self.accumulator.close_window();
        self.interruptions.start(interruption_type, selected_action, now);
        debug!("interruption started");
        if !self.state.is_running {
            self.start();
        }
        self.persist();
        true
    }

    /// End the active interruption and resume accrual for the current task.
    pub fn end_interruption(&mut self) -> Option<InterruptionRecord> {
        if !self.interruptions.is_active() {
            return None;
        }
        let now = self.clock.now();
        let record = self.interruptions.end(now);
        if let Some(record) = &record {
            info!(
                duration = record.duration_seconds,
                kind = record.interruption_type.as_deref().unwrap_or_default(),
                "interruption ended"
            );
            self.sink.emit(Event::InterruptionEnded {
                id: record.id.clone(),
                start_time: record.start_time,
                end_time: record.end_time,
                duration_seconds: record.duration_seconds,
                interruption_type: record.interruption_type.clone(),
                selected_action: record.selected_action.clone(),
            });
        }
        if self.accrues() {
            if let Some(task_id) = self.current_task.as_ref().map(|t| t.id.clone()) {
                self.accumulator.open_window(&task_id, now);
            }
        }
        self.persist();
        record
    }

    /// End the active interruption, or start one of `interruption_type`
    /// (default `"chore"`). Returns whether an interruption is now active.
    pub fn toggle_interruption(
        &mut self,
        interruption_type: Option<String>,
        selected_action: Option<String>,
    ) -> bool {
        if self.interruptions.is_active() {
            self.end_interruption();
            false
        } else {
            let kind = interruption_type.unwrap_or_else(|| DEFAULT_INTERRUPTION_TYPE.to_string());
            self.start_interruption(kind, selected_action)
        }
    }

    pub fn clear_interruption_records(&mut self) {
        self.interruptions.clear_records();
        self.persist_interruptions();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn duration(&self) -> u64 {
        self.settings.duration_of(self.state.phase)
    }

    /// Whether the current task should be accruing right now.
    fn accrues(&self) -> bool {
        self.state.is_running && self.state.phase.is_work() && !self.interruptions.is_active()
    }

    fn active_elapsed(&self, now: DateTime<Utc>) -> u64 {
        match self.state.phase_start_time {
            Some(start) => {
                whole_secs(now - start - Duration::milliseconds(self.state.total_paused_ms))
            }
            None => self.duration().saturating_sub(self.state.remaining_seconds),
        }
    }

    fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        self.duration().saturating_sub(self.active_elapsed(now))
    }

    /// When the running phase ran out, if it has started.
    fn phase_end(&self) -> Option<DateTime<Utc>> {
        let start = self.state.phase_start_time?;
        Some(
            start
                + Duration::milliseconds(self.state.total_paused_ms)
                + Duration::seconds(self.duration() as i64),
        )
    }

    fn accrue(&mut self, now: DateTime<Utc>) {
        if !self.state.phase.is_work() || self.interruptions.is_active() {
            return;
        }
        if let Some(task_id) = self.accumulator.window().map(|w| w.task_id.clone()) {
            self.accumulator.accrue(&task_id, now);
        }
    }

    fn flush(&mut self) {
        let flushed = self.accumulator.flush_all(self.settings.work_duration);
        for (task_id, elapsed_pomodoros) in flushed {
            debug!(task_id = %task_id, elapsed_pomodoros, "progress flushed");
            self.sink.emit(Event::PomodoroProgressByTaskId {
                task_id,
                elapsed_pomodoros,
            });
        }
    }

    fn complete_phase(&mut self, skipped: bool, now: DateTime<Utc>) -> PhaseTransition {
        let from = self.state.phase;
        if from.is_work() {
            self.state.session_count += 1;
            // Work past the end of the phase (e.g. while suspended) does not count.
            let end = self.phase_end().map_or(now, |end| end.min(now));
            self.accrue(end);
            self.flush();
        }

        let to = match from {
            Phase::Work if self.state.session_count >= self.settings.cycles_until_long_break => {
                self.state.session_count = 0;
                Phase::LongBreak
            }
            Phase::Work => Phase::Break,
            Phase::Break | Phase::LongBreak => Phase::Work,
        };

        self.state.phase = to;
        self.state.remaining_seconds = self.duration();
        self.state.phase_start_time = Some(now);
        self.state.paused_at = None;
        self.state.total_paused_ms = 0;

        self.accumulator.close_window();
        if to.is_work() && !self.interruptions.is_active() {
            if let Some(task_id) = self.current_task.as_ref().map(|t| t.id.clone()) {
                self.accumulator.open_window(&task_id, now);
            }
        }

        let transition = PhaseTransition {
            from,
            to,
            skipped,
            session_count: self.state.session_count,
            at: now,
        };
        info!(%from, %to, skipped, session_count = transition.session_count, "phase completed");
        self.sink.emit(Event::PhaseCompleted {
            from,
            to,
            skipped,
            session_count: transition.session_count,
            at: now,
        });
        self.persist();
        transition
    }

    fn hand_over_current_task(&mut self, source: TaskUpdateSource) -> Option<f64> {
        let task_id = self.current_task.as_ref()?.id.clone();
        let now = self.clock.now();
        self.accrue(now);
        let elapsed = self.elapsed_pomodoros_for(&task_id);
        self.accumulator.clear(&task_id);
        self.emit_task_updated(source, Some(elapsed), now);
        self.persist_accumulation();
        Some(elapsed)
    }

    fn emit_task_updated(
        &self,
        source: TaskUpdateSource,
        elapsed_pomodoros: Option<f64>,
        at: DateTime<Utc>,
    ) {
        if let Some(task) = &self.current_task {
            self.sink.emit(Event::TaskUpdated {
                task: task.clone(),
                source,
                elapsed_pomodoros,
                at,
            });
        }
    }

    fn persist(&self) {
        self.persist_state();
        self.persist_accumulation();
        self.persist_interruptions();
    }

    fn persist_state(&self) {
        let store = &*self.store;
        let state = &self.state;
        store.set(keys::REMAINING_SECONDS, state.remaining_seconds.into());
        store.set(keys::CURRENT_PHASE, state.phase.as_str().into());
        store.set(keys::SESSION_COUNT, state.session_count.into());
        store.set(keys::IS_RUNNING, state.is_running.into());
        store.set(
            keys::TOTAL_PAUSED_DURATION,
            (state.total_paused_ms as f64 / 1000.0).into(),
        );
        match state.phase_start_time {
            Some(at) => store.set(keys::PHASE_START_TIME, to_epoch_secs(at).into()),
            None => store.remove(keys::PHASE_START_TIME),
        }
        match state.paused_at {
            Some(at) => store.set(keys::PAUSED_AT, to_epoch_secs(at).into()),
            None => store.remove(keys::PAUSED_AT),
        }
    }

    fn persist_accumulation(&self) {
        let store = &*self.store;
        write_json(store, keys::ACCUMULATED_WORK_TIME_BLOB, self.accumulator.entries());
        match self.accumulator.window() {
            Some(window) => write_json(store, keys::TASK_WINDOW_BLOB, window),
            None => store.remove(keys::TASK_WINDOW_BLOB),
        }
    }

    fn persist_interruptions(&self) {
        let store = &*self.store;
        write_json(store, keys::INTERRUPTION_RECORDS_BLOB, self.interruptions.records());
        match self.interruptions.active() {
            Some(active) => write_json(store, keys::ACTIVE_INTERRUPTION_BLOB, active),
            None => store.remove(keys::ACTIVE_INTERRUPTION_BLOB),
        }
    }
}

fn restore_state(store: &dyn Persistence, settings: &TimerSettings) -> TimerState {
    let phase = store
        .get_string(keys::CURRENT_PHASE)
        .and_then(|s| s.parse::<Phase>().ok())
        .unwrap_or_default();
    let duration = settings.duration_of(phase);
    let remaining_seconds = store
        .get_int(keys::REMAINING_SECONDS)
        .and_then(|v| u64::try_from(v).ok())
        .map_or(duration, |v| v.min(duration));
    let session_count = store
        .get_int(keys::SESSION_COUNT)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);
    let mut phase_start_time = store
        .get_double(keys::PHASE_START_TIME)
        .and_then(from_epoch_secs);
    let mut total_paused_ms = store
        .get_double(keys::TOTAL_PAUSED_DURATION)
        .map(|secs| (secs * 1000.0).round() as i64)
        .filter(|ms| *ms >= 0)
        .unwrap_or(0);
    let is_running =
        store.get_bool(keys::IS_RUNNING).unwrap_or(false) && phase_start_time.is_some();
    let paused_at = if is_running {
        None
    } else {
        store.get_double(keys::PAUSED_AT).and_then(from_epoch_secs)
    };

    // A stopped phase without a pause instant cannot be resumed from its
    // timestamps; restart it from the remaining seconds instead.
    if !is_running && paused_at.is_none() {
        phase_start_time = None;
        total_paused_ms = 0;
    }

    TimerState {
        phase,
        remaining_seconds,
        is_running,
        session_count,
        phase_start_time,
        paused_at,
        total_paused_ms,
    }
}

fn read_json<T: DeserializeOwned>(store: &dyn Persistence, key: &str) -> Option<T> {
    let bytes = store.get_blob(key)?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable persisted value");
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(store: &dyn Persistence, key: &str, value: &T) {
    match serde_json::to_vec(value) {
        Ok(bytes) => store.set_blob(key, &bytes),
        Err(e) => warn!(key, error = %e, "failed to serialize persisted value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::EventQueue;
    use crate::storage::MemoryStore;
    use crate::task::Priority;
    use std::rc::Rc;

    struct Harness {
        clock: ManualClock,
        store: Rc<MemoryStore>,
        events: EventQueue,
        engine: PhaseEngine,
    }

    fn harness() -> Harness {
        let clock = ManualClock::at_epoch();
        let store = Rc::new(MemoryStore::new());
        let events = EventQueue::new();
        let engine = PhaseEngine::new(clock.clone(), Rc::clone(&store), events.clone());
        Harness {
            clock,
            store,
            events,
            engine,
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut h = harness();
        assert!(!h.engine.is_running());
        h.engine.start();
        assert!(h.engine.is_running());

        h.clock.advance_secs(10);
        h.engine.pause();
        assert!(!h.engine.is_running());
        assert_eq!(h.engine.remaining_seconds(), 1490);

        h.clock.advance_secs(600);
        h.engine.start();
        assert_eq!(h.engine.tick(), None);
        assert_eq!(h.engine.remaining_seconds(), 1490);
    }

    #[test]
    fn tick_is_noop_when_stopped() {
        let mut h = harness();
        h.clock.advance_secs(5000);
        assert!(h.engine.tick().is_none());
        assert_eq!(h.engine.remaining_seconds(), 1500);
    }

    #[test]
    fn missed_ticks_do_not_skew_remaining() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(333);
        h.engine.tick();
        h.engine.tick();
        assert_eq!(h.engine.remaining_seconds(), 1167);
    }

    #[test]
    fn skip_advances_phase_and_keeps_running() {
        let mut h = harness();
        let transition = h.engine.skip();
        assert_eq!(transition.from, Phase::Work);
        assert_eq!(transition.to, Phase::Break);
        assert!(transition.skipped);
        assert_eq!(h.engine.session_count(), 1);
        assert!(h.engine.is_running());
        assert_eq!(h.engine.remaining_seconds(), 300);
    }

    #[test]
    fn reset_rewinds_current_phase() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(200);
        h.engine.tick();
        h.engine.reset();
        assert!(!h.engine.is_running());
        assert_eq!(h.engine.remaining_seconds(), 1500);
        assert!(h.engine.state().phase_start_time.is_none());
    }

    #[test]
    fn update_settings_validates_and_restarts_cycle() {
        let mut h = harness();
        h.engine.skip();
        let mut settings = TimerSettings::default();
        settings.work_duration = 0;
        assert!(h.engine.update_settings(settings).is_err());
        assert_eq!(h.engine.phase(), Phase::Break);

        let mut settings = TimerSettings::default();
        settings.work_duration = 600;
        h.engine.update_settings(settings).unwrap();
        assert_eq!(h.engine.phase(), Phase::Work);
        assert_eq!(h.engine.remaining_seconds(), 600);
        assert_eq!(h.engine.session_count(), 0);
        assert_eq!(h.store.get_int(keys::WORK_DURATION), Some(600));
    }

    #[test]
    fn start_reports_current_task() {
        let mut h = harness();
        let task = Task::new("Write", Priority::High);
        h.engine.set_current_task(Some(task.clone()));
        h.engine.start();
        let events = h.events.drain();
        assert!(matches!(
            events.as_slice(),
            [Event::TaskUpdated {
                task: t,
                source: TaskUpdateSource::Started,
                elapsed_pomodoros: None,
                ..
            }] if t.id == task.id
        ));
    }

    #[test]
    fn complete_current_task_hands_over_progress_once() {
        let mut h = harness();
        let task = Task::new("Write", Priority::Medium);
        h.engine.set_current_task(Some(task));
        h.engine.start();
        h.clock.advance_secs(750);
        h.engine.tick();
        h.events.drain();

        assert_eq!(h.engine.complete_current_task(), Some(0.5));
        assert!(matches!(
            h.events.drain().as_slice(),
            [Event::TaskUpdated {
                source: TaskUpdateSource::Completed,
                elapsed_pomodoros: Some(p),
                ..
            }] if *p == 0.5
        ));

        h.engine.pause();
        assert!(h.events.is_empty());
    }

    #[test]
    fn switching_tasks_flushes_the_previous_one() {
        let mut h = harness();
        let first = Task::new("First", Priority::Medium);
        let second = Task::new("Second", Priority::Medium);
        h.engine.set_current_task(Some(first.clone()));
        h.engine.start();
        h.clock.advance_secs(150);
        h.engine.set_current_task(Some(second.clone()));

        let progress: Vec<Event> = h
            .events
            .drain()
            .into_iter()
            .filter(|e| matches!(e, Event::PomodoroProgressByTaskId { .. }))
            .collect();
        assert_eq!(
            progress,
            vec![Event::PomodoroProgressByTaskId {
                task_id: first.id.clone(),
                elapsed_pomodoros: 0.1
            }]
        );
        assert_eq!(h.engine.accumulator().window().unwrap().task_id, second.id);
    }

    #[test]
    fn interruption_logs_and_pauses_accrual() {
        let mut h = harness();
        let task = Task::new("Write", Priority::Medium);
        h.engine.set_current_task(Some(task.clone()));
        assert!(h.engine.start_interruption("call", None));
        assert!(h.engine.is_running());
        assert!(!h.engine.start_interruption("call", None));

        h.clock.advance_secs(120);
        h.engine.tick();
        assert_eq!(h.engine.active_interruption().unwrap().elapsed_secs, 120);
        assert_eq!(h.engine.elapsed_pomodoros(), 0.0);

        let record = h.engine.end_interruption().unwrap();
        assert_eq!(record.duration_seconds, 120);
        h.clock.advance_secs(150);
        h.engine.tick();
        assert_eq!(h.engine.accumulator().accumulated(&task.id), 150);
        assert!(h
            .events
            .drain()
            .iter()
            .any(|e| matches!(e, Event::InterruptionEnded { duration_seconds: 120, .. })));
    }

    #[test]
    fn toggle_interruption_uses_default_type() {
        let mut h = harness();
        assert!(h.engine.toggle_interruption(None, None));
        assert_eq!(
            h.engine.active_interruption().unwrap().interruption_type,
            DEFAULT_INTERRUPTION_TYPE
        );
        h.clock.advance_secs(3);
        assert!(!h.engine.toggle_interruption(None, None));
        assert_eq!(h.engine.interruption_records().len(), 1);
        h.engine.clear_interruption_records();
        assert!(h.engine.interruption_records().is_empty());
    }

    #[test]
    fn work_past_phase_end_is_not_accrued() {
        let mut h = harness();
        let task = Task::new("Write", Priority::Medium);
        h.engine.set_current_task(Some(task.clone()));
        h.engine.start();
        h.events.drain();
        h.clock.advance_secs(4000);
        let transition = h.engine.enter_foreground().unwrap();
        assert_eq!(transition.to, Phase::Break);
        assert!(h.events.drain().contains(&Event::PomodoroProgressByTaskId {
            task_id: task.id.clone(),
            elapsed_pomodoros: 1.0
        }));
    }

    #[test]
    fn restores_running_timer_from_store() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(100);
        h.engine.enter_background();

        let mut restored =
            PhaseEngine::new(h.clock.clone(), Rc::clone(&h.store), EventQueue::new());
        assert!(restored.is_running());
        h.clock.advance_secs(50);
        restored.enter_foreground();
        assert_eq!(restored.remaining_seconds(), 1350);
    }

    #[test]
    fn garbage_in_store_falls_back_to_defaults() {
        let store = Rc::new(MemoryStore::new());
        store.set_raw(keys::CURRENT_PHASE, "nap");
        store.set_raw(keys::REMAINING_SECONDS, "99999");
        store.set_blob(keys::INTERRUPTION_RECORDS_BLOB, b"{oops");
        let engine = PhaseEngine::new(ManualClock::at_epoch(), store, EventQueue::new());
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.remaining_seconds(), 1500);
        assert!(engine.interruption_records().is_empty());
    }
}
