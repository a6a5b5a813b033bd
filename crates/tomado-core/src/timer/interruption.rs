//! Ad-hoc interruption tracking.
//!
//! While an interruption is active the current task accrues nothing. Its
//! length is wall-clock time from start to end, pauses included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::whole_secs;

/// Type used by [`InterruptionTracker::toggle`] when none is given.
pub const DEFAULT_INTERRUPTION_TYPE: &str = "chore";

/// A finished interruption. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptionRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u64,
    #[serde(default)]
    pub interruption_type: Option<String>,
    #[serde(default)]
    pub selected_action: Option<String>,
}

/// The interruption in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveInterruption {
    pub started_at: DateTime<Utc>,
    pub interruption_type: String,
    #[serde(default)]
    pub selected_action: Option<String>,
    /// Live counter for display, refreshed on tick.
    #[serde(default)]
    pub elapsed_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterruptionTracker {
    active: Option<ActiveInterruption>,
    records: Vec<InterruptionRecord>,
}

impl InterruptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(active: Option<ActiveInterruption>, records: Vec<InterruptionRecord>) -> Self {
        Self { active, records }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveInterruption> {
        self.active.as_ref()
    }

    pub fn records(&self) -> &[InterruptionRecord] {
        &self.records
    }

    /// Begin an interruption. Returns `false` if one is already active.
    pub fn start(
        &mut self,
        interruption_type: impl Into<String>,
        selected_action: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(ActiveInterruption {
            started_at: now,
            interruption_type: interruption_type.into(),
            selected_action,
            elapsed_secs: 0,
        });
        true
    }

    /// Refresh the live counter.
    pub fn update(&mut self, now: DateTime<Utc>) -> u64 {
        match self.active.as_mut() {
            Some(active) => {
                active.elapsed_secs = whole_secs(now - active.started_at);
                active.elapsed_secs
            }
            None => 0,
        }
    }

    pub fn reset_live(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.elapsed_secs = 0;
        }
    }

    /// End the active interruption. Logs and returns a record only when it
    /// lasted at least one whole second.
    pub fn end(&mut self, now: DateTime<Utc>) -> Option<InterruptionRecord> {
        let active = self.active.take()?;
        let duration_seconds = whole_secs(now - active.started_at);
        if duration_seconds == 0 {
            return None;
        }
        let record = InterruptionRecord {
            id: Uuid::new_v4().to_string(),
            start_time: active.started_at,
            end_time: now,
            duration_seconds,
            interruption_type: Some(active.interruption_type),
            selected_action: active.selected_action,
        };
        self.records.push(record.clone());
        Some(record)
    }

    pub fn clear_records(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(secs)
    }

    #[test]
    fn start_is_idempotent() {
        let mut tracker = InterruptionTracker::new();
        assert!(tracker.start("chore", None, at(0)));
        assert!(!tracker.start("meeting", None, at(5)));
        assert_eq!(tracker.active().unwrap().interruption_type, "chore");
    }

    #[test]
    fn end_logs_wall_clock_duration() {
        let mut tracker = InterruptionTracker::new();
        tracker.start("call", Some("create task".into()), at(100));
        assert_eq!(tracker.update(at(130)), 30);
        let record = tracker.end(at(190)).unwrap();
        assert_eq!(record.duration_seconds, 90);
        assert_eq!(record.interruption_type.as_deref(), Some("call"));
        assert_eq!(record.selected_action.as_deref(), Some("create task"));
        assert_eq!(tracker.records().len(), 1);
        assert!(!tracker.is_active());
    }

    #[test]
    fn sub_second_interruptions_are_not_logged() {
        let mut tracker = InterruptionTracker::new();
        tracker.start("chore", None, at(10));
        assert!(tracker.end(at(10)).is_none());
        assert!(tracker.records().is_empty());
        assert!(!tracker.is_active());
        assert!(tracker.end(at(20)).is_none());
    }

    #[test]
    fn clear_records_keeps_active_interruption() {
        let mut tracker = InterruptionTracker::new();
        tracker.start("a", None, at(0));
        tracker.end(at(5));
        tracker.start("b", None, at(6));
        tracker.clear_records();
        assert!(tracker.records().is_empty());
        assert!(tracker.is_active());
    }
}
