//! Hierarchical task model.
//!
//! Tasks form a forest through `parent_id` links. The [`TaskList`] keeps them
//! in *execution order*: every task's subtasks come before the task itself,
//! so working the list top to bottom finishes children before their parents.
//!
//! - [`ordering`]: pure sort/traversal functions over a task slice
//! - [`codec`]: indented Markdown-checkbox import/export
//! - [`tree`]: [`TaskTree`], the single writer of a persisted `TaskList`

pub mod codec;
pub mod ordering;
pub mod tree;

pub use codec::{DecodeOptions, EncodeOptions, IndentStyle, TextHierarchyCodec};
pub use tree::TaskTree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task priority. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Numeric rank: low = 1, medium = 2, high = 3.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Marker used in the text format: `!`, `!!`, `!!!`.
    pub fn symbol(self) -> &'static str {
        match self {
            Priority::Low => "!",
            Priority::Medium => "!!",
            Priority::High => "!!!",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" | "1" | "!" => Ok(Priority::Low),
            "medium" | "m" | "2" | "!!" => Ok(Priority::Medium),
            "high" | "h" | "3" | "!!!" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    /// Completed pomodoros credited to this task.
    #[serde(default)]
    pub pomodoro_count: u32,
    pub created_at: DateTime<Utc>,
    /// Parent task; `None` for root tasks.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Number of ancestors (0 = root).
    #[serde(default)]
    pub indent_level: u32,
}

impl Task {
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            priority,
            completed: false,
            pomodoro_count: 0,
            created_at: Utc::now(),
            parent_id: None,
            indent_level: 0,
        }
    }

    /// Attach to `parent`, deriving the indent level from it.
    pub fn with_parent(mut self, parent: &Task) -> Self {
        self.parent_id = Some(parent.id.clone());
        self.indent_level = parent.indent_level + 1;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_child_of(&self, parent_id: &str) -> bool {
        self.parent_id.as_deref() == Some(parent_id)
    }
}

/// Summary counts over a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStats {
    pub completed: usize,
    pub total: usize,
    pub pomodoros: u32,
}

/// The persisted document: all tasks in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub last_modified: DateTime<Utc>,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            last_modified: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// First incomplete task in execution order.
    pub fn next_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| !t.completed)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            completed: self.tasks.iter().filter(|t| t.completed).count(),
            total: self.tasks.len(),
            pomodoros: self.tasks.iter().map(|t| t.pomodoro_count).sum(),
        }
    }

    /// Index where the incomplete segment ends.
    pub fn incomplete_end(&self) -> usize {
        self.tasks
            .iter()
            .position(|t| t.completed)
            .unwrap_or(self.tasks.len())
    }
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_rank() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::High.rank(), 3);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn priority_parses_names_and_symbols() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("!".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn task_serializes_camel_case() {
        let parent = Task::new("Parent", Priority::High);
        let child = Task::new("Child", Priority::Low).with_parent(&parent);
        let json = serde_json::to_value(&child).unwrap();
        assert_eq!(json["parentId"], serde_json::Value::String(parent.id.clone()));
        assert_eq!(json["indentLevel"], 1);
        assert_eq!(json["pomodoroCount"], 0);
        assert_eq!(json["priority"], "low");
    }

    #[test]
    fn stats_counts_completed_and_pomodoros() {
        let mut a = Task::new("A", Priority::Medium);
        a.pomodoro_count = 2;
        let mut b = Task::new("B", Priority::Medium);
        b.completed = true;
        b.pomodoro_count = 1;
        let list = TaskList::new(vec![a, b]);
        assert_eq!(
            list.stats(),
            TaskStats {
                completed: 1,
                total: 2,
                pomodoros: 3
            }
        );
        assert_eq!(list.incomplete_end(), 1);
        assert_eq!(list.next_task().map(|t| t.title.as_str()), Some("A"));
    }
}
