//! The task tree: every mutation of the task list goes through here.
//!
//! Each mutating call stamps `last_modified` and writes the whole list to the
//! backing [`TaskStore`]. Store failures are logged and otherwise ignored so
//! the in-memory tree stays usable.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, warn};

use super::codec::{DecodeOptions, EncodeOptions, TextHierarchyCodec};
use super::ordering::{self, ancestor_ids, descendant_ids, is_descendant};
use super::{Priority, Task, TaskList, TaskStats};
use crate::storage::{MemoryTaskStore, TaskStore};

pub struct TaskTree {
    list: TaskList,
    current_task_id: Option<String>,
    store: Box<dyn TaskStore>,
}

impl TaskTree {
    /// Open a tree backed by `store`, starting empty if nothing readable is stored.
    pub fn open(store: impl TaskStore + 'static) -> Self {
        let list = match store.load() {
            Ok(Some(list)) => list,
            Ok(None) => TaskList::default(),
            Err(e) => {
                warn!(error = %e, "task list unreadable, starting empty");
                TaskList::default()
            }
        };
        Self {
            list,
            current_task_id: None,
            store: Box::new(store),
        }
    }

    /// A tree that only lives in memory.
    pub fn in_memory() -> Self {
        Self::open(MemoryTaskStore::default())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn list(&self) -> &TaskList {
        &self.list
    }

    pub fn tasks(&self) -> &[Task] {
        &self.list.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.list.get(id)
    }

    pub fn len(&self) -> usize {
        self.list.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.tasks.is_empty()
    }

    pub fn stats(&self) -> TaskStats {
        self.list.stats()
    }

    pub fn next_task(&self) -> Option<&Task> {
        self.list.next_task()
    }

    /// The selected task if it is still open, otherwise the first open task.
    pub fn current_task(&self) -> Option<&Task> {
        self.current_task_id
            .as_deref()
            .and_then(|id| self.list.get(id))
            .filter(|t| !t.completed)
            .or_else(|| self.list.next_task())
    }

    pub fn current_task_id(&self) -> Option<&str> {
        self.current_task_id.as_deref()
    }

    /// Open tasks, parents before children.
    pub fn hierarchy_order(&self) -> Vec<&Task> {
        ordering::hierarchy_order(&self.list.tasks, false)
    }

    /// Ancestor ids of `id`, nearest parent first.
    pub fn ancestor_ids(&self, id: &str) -> Vec<String> {
        ancestor_ids(&self.list.tasks, id)
    }

    pub fn root_of(&self, id: &str) -> Option<&Task> {
        let root_id = self.ancestor_ids(id).pop().unwrap_or_else(|| id.to_string());
        self.list.get(&root_id).filter(|t| t.is_root())
    }

    pub fn export_text(&self, options: &EncodeOptions) -> String {
        TextHierarchyCodec::encode(&self.list.tasks, options)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Add a task and return its id.
    ///
    /// A subtask goes immediately before its parent. A root task goes in
    /// front of the first open root group with a lower priority, or at the
    /// end of the open tasks. An unknown `parent_id` adds a root task.
    pub fn add(
        &mut self,
        title: impl Into<String>,
        priority: Priority,
        parent_id: Option<&str>,
    ) -> String {
        let parent = parent_id.and_then(|id| self.list.get(id)).cloned();
        let mut task = Task::new(title, priority);

        let index = match &parent {
            Some(parent) => {
                task = task.with_parent(parent);
                self.list.position(&parent.id).unwrap_or(self.list.tasks.len())
            }
            None => self.root_insert_index(priority),
        };

        let id = task.id.clone();
        debug!(task_id = %id, index, "task added");
        self.list.tasks.insert(index, task);
        self.persist();
        id
    }

    /// Complete a task together with all of its descendants and move them to
    /// the end of the list.
    pub fn complete(&mut self, id: &str) -> bool {
        if self.list.get(id).is_none() {
            return false;
        }
        let mut ids = descendant_ids(&self.list.tasks, id);
        ids.push(id.to_string());
        let affected: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let tasks = std::mem::take(&mut self.list.tasks);
        let (mut done, rest): (Vec<Task>, Vec<Task>) = tasks
            .into_iter()
            .partition(|t| affected.contains(t.id.as_str()));
        for task in &mut done {
            task.completed = true;
        }
        self.list.tasks = rest;
        self.list.tasks.extend(done);

        self.clear_selection_within(&affected);
        debug!(task_id = %id, count = affected.len(), "tasks completed");
        self.persist();
        true
    }

    /// Reopen a single completed task at the end of the open segment.
    pub fn uncomplete(&mut self, id: &str) -> bool {
        let Some(pos) = self.list.position(id) else {
            return false;
        };
        if !self.list.tasks[pos].completed {
            return false;
        }
        let mut task = self.list.tasks.remove(pos);
        task.completed = false;
        let index = self.list.incomplete_end();
        self.list.tasks.insert(index, task);
        self.persist();
        true
    }

    /// Delete a task together with all of its descendants.
    pub fn delete(&mut self, id: &str) -> bool {
        if self.list.get(id).is_none() {
            return false;
        }
        let mut ids = descendant_ids(&self.list.tasks, id);
        ids.push(id.to_string());
        let affected: HashSet<&str> = ids.iter().map(String::as_str).collect();

        self.list.tasks.retain(|t| !affected.contains(t.id.as_str()));
        self.clear_selection_within(&affected);
        debug!(task_id = %id, count = affected.len(), "tasks deleted");
        self.persist();
        true
    }

    /// Make `task_id` a subtask of `new_parent_id`.
    ///
    /// Returns `false` without touching the tree when either task is missing,
    /// when both are the same task, or when the new parent lies inside the
    /// task's own subtree. On success the task and its subtree move to just
    /// before the new parent.
    pub fn reparent(&mut self, task_id: &str, new_parent_id: &str) -> bool {
        if task_id == new_parent_id || self.list.get(task_id).is_none() {
            return false;
        }
        let Some(parent_level) = self.list.get(new_parent_id).map(|p| p.indent_level) else {
            return false;
        };
        if is_descendant(&self.list.tasks, new_parent_id, task_id) {
            debug!(task_id, new_parent_id, "reparent rejected: would create a cycle");
            return false;
        }

        if let Some(task) = self.list.get_mut(task_id) {
            task.parent_id = Some(new_parent_id.to_string());
            task.indent_level = parent_level + 1;
        }
        self.relevel_descendants(task_id);

        let mut block_ids = descendant_ids(&self.list.tasks, task_id);
        block_ids.push(task_id.to_string());
        let block: HashSet<&str> = block_ids.iter().map(String::as_str).collect();

        let tasks = std::mem::take(&mut self.list.tasks);
        let (moving, mut rest): (Vec<Task>, Vec<Task>) = tasks
            .into_iter()
            .partition(|t| block.contains(t.id.as_str()));
        let at = rest
            .iter()
            .position(|t| t.id == new_parent_id)
            .unwrap_or(rest.len());
        rest.splice(at..at, moving);
        self.list.tasks = rest;

        self.persist();
        true
    }

    /// Detach a task from its parent; its descendants shift up by the same
    /// number of levels.
    pub fn make_root(&mut self, task_id: &str) -> bool {
        let Some(task) = self.list.get_mut(task_id) else {
            return false;
        };
        let delta = task.indent_level;
        task.parent_id = None;
        task.indent_level = 0;

        let descendants: HashSet<String> =
            descendant_ids(&self.list.tasks, task_id).into_iter().collect();
        for task in self
            .list
            .tasks
            .iter_mut()
            .filter(|t| descendants.contains(&t.id))
        {
            task.indent_level = task.indent_level.saturating_sub(delta);
        }

        self.persist();
        true
    }

    pub fn set_priority(&mut self, id: &str, priority: Priority) -> bool {
        let Some(task) = self.list.get_mut(id) else {
            return false;
        };
        task.priority = priority;
        self.persist();
        true
    }

    pub fn set_title(&mut self, id: &str, title: impl Into<String>) -> bool {
        let Some(task) = self.list.get_mut(id) else {
            return false;
        };
        task.title = title.into();
        self.persist();
        true
    }

    pub fn add_pomodoro(&mut self, id: &str) -> bool {
        let Some(task) = self.list.get_mut(id) else {
            return false;
        };
        task.pomodoro_count += 1;
        self.persist();
        true
    }

    /// Credit one pomodoro to the current task, returning its id.
    pub fn add_pomodoro_to_current(&mut self) -> Option<String> {
        let id = self.current_task()?.id.clone();
        self.add_pomodoro(&id);
        Some(id)
    }

    /// Select an open task as the current one.
    pub fn select(&mut self, id: &str) -> bool {
        match self.list.get(id) {
            Some(task) if !task.completed => {
                self.current_task_id = Some(id.to_string());
                true
            }
            _ => false,
        }
    }

    /// Restore a selection without validating it; stale ids are ignored by
    /// [`TaskTree::current_task`].
    pub fn set_current_task_id(&mut self, id: Option<String>) {
        self.current_task_id = id;
    }

    /// Move the selection to the next open task after the current one,
    /// wrapping around to the first open task.
    pub fn postpone_current(&mut self) -> Option<&Task> {
        let current_id = self.current_task()?.id.clone();
        let pos = self.list.position(&current_id)?;
        let next_id = self.list.tasks[pos + 1..]
            .iter()
            .find(|t| !t.completed)
            .or_else(|| self.list.next_task())
            .map(|t| t.id.clone())?;
        self.current_task_id = Some(next_id);
        self.current_task()
    }

    /// Move a single task to just before `target_id`.
    pub fn insert_before(&mut self, task_id: &str, target_id: &str) -> bool {
        if task_id == target_id {
            return false;
        }
        let (Some(from), Some(target)) =
            (self.list.position(task_id), self.list.position(target_id))
        else {
            return false;
        };
        let task = self.list.tasks.remove(from);
        let to = if from < target { target - 1 } else { target };
        self.list.tasks.insert(to, task);
        self.persist();
        true
    }

    /// Normalize into execution order; see [`ordering::sort`].
    pub fn sort(&mut self, ascending: bool) {
        self.list.tasks = ordering::sort(&self.list.tasks, ascending);
        self.persist();
    }

    /// Append tasks parsed from indented text, then sort. Returns how many
    /// tasks were added.
    pub fn import_text(&mut self, text: &str, options: &DecodeOptions) -> usize {
        let parsed = TextHierarchyCodec::decode(text, options);
        if parsed.is_empty() {
            return 0;
        }
        let count = parsed.len();
        self.list.tasks.extend(parsed);
        self.list.tasks = ordering::sort(&self.list.tasks, false);
        info!(count, "tasks imported");
        self.persist();
        count
    }

    pub fn clear_all(&mut self) -> usize {
        let removed = self.list.tasks.len();
        self.list.tasks.clear();
        self.current_task_id = None;
        self.persist();
        removed
    }

    pub fn clear_completed(&mut self) -> usize {
        let before = self.list.tasks.len();
        self.list.tasks.retain(|t| !t.completed);
        self.persist();
        before - self.list.tasks.len()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn root_insert_index(&self, priority: Priority) -> usize {
        let lower = self
            .list
            .tasks
            .iter()
            .find(|t| !t.completed && t.is_root() && t.priority < priority);

        match lower {
            Some(root) => {
                let ids = descendant_ids(&self.list.tasks, &root.id);
                let group: HashSet<&str> = ids.iter().map(String::as_str).collect();
                self.list
                    .tasks
                    .iter()
                    .position(|t| t.id == root.id || group.contains(t.id.as_str()))
                    .unwrap_or(self.list.tasks.len())
            }
            None => self.list.incomplete_end(),
        }
    }

    /// Recompute indent levels below `id` from its current level.
    fn relevel_descendants(&mut self, id: &str) {
        let mut queue = VecDeque::from([id.to_string()]);
        let mut seen = HashSet::new();
        while let Some(parent_id) = queue.pop_front() {
            if !seen.insert(parent_id.clone()) {
                continue;
            }
            let Some(level) = self.list.get(&parent_id).map(|t| t.indent_level) else {
                continue;
            };
            for child in self
                .list
                .tasks
                .iter_mut()
                .filter(|t| t.is_child_of(&parent_id))
            {
                child.indent_level = level + 1;
                queue.push_back(child.id.clone());
            }
        }
    }

    fn clear_selection_within(&mut self, ids: &HashSet<&str>) {
        if self
            .current_task_id
            .as_deref()
            .is_some_and(|id| ids.contains(id))
        {
            self.current_task_id = None;
        }
    }

    fn persist(&mut self) {
        self.list.touch();
        if let Err(e) = self.store.save(&self.list) {
            warn!(error = %e, "failed to save task list");
        }
    }
}
