//! Ordering over a task slice.
//!
//! Two orders matter:
//!
//! ```text
//! execution order          hierarchy order
//!   - B   (child of A)       - A
//!   - A                        - B
//!   - C                      - C
//! ```
//!
//! Execution order is the stored order (children first). Hierarchy order is
//! what gets displayed and exported (parents first). All functions here are
//! pure; walks keep a visited set so corrupted parent links cannot loop.

use std::collections::{HashMap, HashSet};

use super::Task;

/// Parent id -> direct children, in slice order.
pub struct ChildIndex<'a> {
    children: HashMap<&'a str, Vec<&'a Task>>,
}

impl<'a> ChildIndex<'a> {
    pub fn new<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut children: HashMap<&'a str, Vec<&'a Task>> = HashMap::new();
        for task in tasks {
            if let Some(parent) = task.parent_id.as_deref() {
                children.entry(parent).or_default().push(task);
            }
        }
        Self { children }
    }

    pub fn children_of(&self, id: &str) -> &[&'a Task] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of descendants below `id`.
    pub fn count_descendants(&self, id: &str) -> usize {
        let mut seen = HashSet::new();
        self.count_from(id, &mut seen)
    }

    fn count_from(&self, id: &str, seen: &mut HashSet<&'a str>) -> usize {
        let mut count = 0;
        for &child in self.children_of(id) {
            if seen.insert(child.id.as_str()) {
                count += 1 + self.count_from(&child.id, seen);
            }
        }
        count
    }

    /// Descendants of `id`, deepest first: each child's own subtree precedes it.
    pub fn subtree_execution_order(&self, id: &str) -> Vec<&'a Task> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_execution(id, id, &mut out, &mut seen);
        out
    }

    fn collect_execution(
        &self,
        root: &str,
        id: &str,
        out: &mut Vec<&'a Task>,
        seen: &mut HashSet<&'a str>,
    ) {
        for &child in self.children_of(id) {
            if child.id != root && seen.insert(child.id.as_str()) {
                self.collect_execution(root, &child.id, out, seen);
                out.push(child);
            }
        }
    }

    fn collect_hierarchy(
        &self,
        task: &'a Task,
        out: &mut Vec<&'a Task>,
        seen: &mut HashSet<&'a str>,
    ) {
        if !seen.insert(task.id.as_str()) {
            return;
        }
        out.push(task);
        for &child in self.children_of(&task.id) {
            self.collect_hierarchy(child, out, seen);
        }
    }
}

/// Sort into normalized execution order.
///
/// Only incomplete tasks are reordered; completed tasks keep their relative
/// order at the end. Incomplete roots are ordered by priority (high first
/// unless `ascending`), then by fewest incomplete descendants. Each root is
/// preceded by its incomplete subtree. Incomplete subtasks whose ancestors
/// are missing or completed trail the root groups in their original order.
pub fn sort(tasks: &[Task], ascending: bool) -> Vec<Task> {
    let incomplete: Vec<&Task> = tasks.iter().filter(|t| !t.completed).collect();
    let index = ChildIndex::new(incomplete.iter().copied());

    let mut roots: Vec<(&Task, usize)> = incomplete
        .iter()
        .filter(|t| t.is_root())
        .map(|t| (*t, index.count_descendants(&t.id)))
        .collect();

    roots.sort_by(|(a, a_count), (b, b_count)| {
        let by_priority = if ascending {
            a.priority.cmp(&b.priority)
        } else {
            b.priority.cmp(&a.priority)
        };
        by_priority.then(a_count.cmp(b_count))
    });

    let mut sorted: Vec<Task> = Vec::with_capacity(tasks.len());
    let mut placed: HashSet<&str> = HashSet::new();
    for (root, _) in &roots {
        for task in index.subtree_execution_order(&root.id) {
            if placed.insert(task.id.as_str()) {
                sorted.push(task.clone());
            }
        }
        if placed.insert(root.id.as_str()) {
            sorted.push((*root).clone());
        }
    }

    for task in &incomplete {
        if placed.insert(task.id.as_str()) {
            sorted.push((*task).clone());
        }
    }

    sorted.extend(tasks.iter().filter(|t| t.completed).cloned());
    sorted
}

/// Parent-before-children traversal for display and export.
///
/// Roots are visited in slice order and each is followed by its children in
/// slice order, recursively. With `include_completed == false` completed
/// tasks (and everything below them) are left out. With `include_completed`
/// any task not reachable from a root is appended at the end.
pub fn hierarchy_order(tasks: &[Task], include_completed: bool) -> Vec<&Task> {
    let visible: Vec<&Task> = tasks
        .iter()
        .filter(|t| include_completed || !t.completed)
        .collect();
    let index = ChildIndex::new(visible.iter().copied());

    let mut out = Vec::with_capacity(visible.len());
    let mut seen = HashSet::new();
    for &root in visible.iter().filter(|t| t.is_root()) {
        index.collect_hierarchy(root, &mut out, &mut seen);
    }

    if include_completed {
        for &task in &visible {
            if seen.insert(task.id.as_str()) {
                out.push(task);
            }
        }
    }
    out
}

/// Ids of all descendants of `id`, deepest first.
pub fn descendant_ids(tasks: &[Task], id: &str) -> Vec<String> {
    ChildIndex::new(tasks)
        .subtree_execution_order(id)
        .into_iter()
        .map(|t| t.id.clone())
        .collect()
}

/// Ancestors of `id`, nearest parent first.
pub fn ancestor_ids(tasks: &[Task], id: &str) -> Vec<String> {
    let mut ancestors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut current = id;
    while let Some(parent) = tasks
        .iter()
        .find(|t| t.id == current)
        .and_then(|t| t.parent_id.as_deref())
    {
        if !seen.insert(parent) {
            break;
        }
        ancestors.push(parent.to_string());
        current = parent;
    }
    ancestors
}

/// Whether `candidate` sits somewhere below `ancestor`.
pub fn is_descendant(tasks: &[Task], candidate: &str, ancestor: &str) -> bool {
    ancestor_ids(tasks, candidate).iter().any(|id| id == ancestor)
}
