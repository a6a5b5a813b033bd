//! Task management commands for CLI.

use std::io::Read;
use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;
use tomado_core::{Config, EncodeOptions, IndentStyle, Priority, TaskTree};

use super::common::{print_json, resolve_id, CliResult, Session};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// low, medium or high (also l/m/h, 1-3, !/!!/!!!)
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Parent task ID; the new task becomes its subtask
        #[arg(long)]
        parent: Option<String>,
    },
    /// List tasks in execution order
    List {
        /// Open tasks only, parents before children
        #[arg(long)]
        hierarchy: bool,
    },
    /// Complete a task and its subtasks
    Complete { id: String },
    /// Reopen a completed task
    Uncomplete { id: String },
    /// Delete a task and its subtasks
    Delete { id: String },
    /// Move a task (with its subtasks) under another task
    Move {
        id: String,
        #[arg(long)]
        parent: String,
    },
    /// Turn a subtask into a root task
    Root { id: String },
    /// Change a task's priority
    Priority { id: String, priority: Priority },
    /// Rename a task
    Rename { id: String, title: String },
    /// Select the task the timer works on
    Select { id: String },
    /// Show the task the timer works on
    Current,
    /// Move the selection to the next open task
    Postpone,
    /// Credit one pomodoro to a task (default: the current one)
    Pomodoro { id: Option<String> },
    /// Move a single task in front of another one
    Before { id: String, target: String },
    /// Sort into execution order
    Sort {
        /// Lowest priority first
        #[arg(long)]
        ascending: bool,
    },
    /// Remove tasks
    Clear {
        /// Only remove completed tasks
        #[arg(long)]
        completed: bool,
    },
    /// Import indented checkbox text from a file or stdin
    Import {
        #[arg(long)]
        file: Option<PathBuf>,
        /// Also accept plain `-`, `*` and `1.` list items
        #[arg(long)]
        allow_list: bool,
    },
    /// Export tasks as indented checkbox text
    Export {
        /// Indent with tabs
        #[arg(long)]
        tab: bool,
        /// Spaces per indent level
        #[arg(long)]
        spaces: Option<usize>,
    },
    /// Task counts and credited pomodoros
    Stats,
}

pub fn run(action: TaskAction) -> CliResult {
    let mut session = Session::open()?;

    match action {
        TaskAction::Add {
            title,
            priority,
            parent,
        } => {
            let parent = parent
                .map(|p| resolve_id(&session.tree, &p))
                .transpose()?;
            let id = session.tree.add(title, priority, parent.as_deref());
            print_task(&session.tree, &id)?;
        }
        TaskAction::List { hierarchy } => {
            if hierarchy {
                print_json(&session.tree.hierarchy_order())?;
            } else {
                print_json(session.tree.tasks())?;
            }
        }
        TaskAction::Complete { id } => {
            let id = resolve_id(&session.tree, &id)?;
            session.tree.complete(&id);
            print_task(&session.tree, &id)?;
        }
        TaskAction::Uncomplete { id } => {
            let id = resolve_id(&session.tree, &id)?;
            if !session.tree.uncomplete(&id) {
                return Err(format!("task is not completed: {id}").into());
            }
            print_task(&session.tree, &id)?;
        }
        TaskAction::Delete { id } => {
            let id = resolve_id(&session.tree, &id)?;
            session.tree.delete(&id);
            print_json(&json!({ "deleted": id }))?;
        }
        TaskAction::Move { id, parent } => {
            let id = resolve_id(&session.tree, &id)?;
            let parent = resolve_id(&session.tree, &parent)?;
            if !session.tree.reparent(&id, &parent) {
                return Err("cannot move a task under itself or its own subtask".into());
            }
            print_task(&session.tree, &id)?;
        }
        TaskAction::Root { id } => {
            let id = resolve_id(&session.tree, &id)?;
            session.tree.make_root(&id);
            print_task(&session.tree, &id)?;
        }
        TaskAction::Priority { id, priority } => {
            let id = resolve_id(&session.tree, &id)?;
            session.tree.set_priority(&id, priority);
            print_task(&session.tree, &id)?;
        }
        TaskAction::Rename { id, title } => {
            let id = resolve_id(&session.tree, &id)?;
            session.tree.set_title(&id, title);
            print_task(&session.tree, &id)?;
        }
        TaskAction::Select { id } => {
            let id = resolve_id(&session.tree, &id)?;
            if !session.tree.select(&id) {
                return Err(format!("task is completed: {id}").into());
            }
            print_task(&session.tree, &id)?;
        }
        TaskAction::Current => print_json(&session.tree.current_task())?,
        TaskAction::Postpone => {
            session.tree.postpone_current();
            print_json(&session.tree.current_task())?;
        }
        TaskAction::Pomodoro { id } => {
            let id = match id {
                Some(id) => resolve_id(&session.tree, &id)?,
                None => session
                    .tree
                    .current_task()
                    .map(|t| t.id.clone())
                    .ok_or("no current task")?,
            };
            session.tree.add_pomodoro(&id);
            print_task(&session.tree, &id)?;
        }
        TaskAction::Before { id, target } => {
            let id = resolve_id(&session.tree, &id)?;
            let target = resolve_id(&session.tree, &target)?;
            session.tree.insert_before(&id, &target);
            print_json(session.tree.tasks())?;
        }
        TaskAction::Sort { ascending } => {
            session.tree.sort(ascending);
            print_json(session.tree.tasks())?;
        }
        TaskAction::Clear { completed } => {
            let removed = if completed {
                session.tree.clear_completed()
            } else {
                session.tree.clear_all()
            };
            print_json(&json!({ "removed": removed }))?;
        }
        TaskAction::Import { file, allow_list } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let mut options = Config::load()?.decode_options();
            options.allow_list_format |= allow_list;
            let imported = session.tree.import_text(&text, &options);
            print_json(&json!({ "imported": imported }))?;
        }
        TaskAction::Export { tab, spaces } => {
            let mut options: EncodeOptions = Config::load()?.encode_options();
            if tab {
                options.indent_style = IndentStyle::Tab;
            } else if let Some(spaces) = spaces {
                options.indent_style = IndentStyle::Spaces;
                options.indent_spaces = spaces;
            }
            println!("{}", session.tree.export_text(&options));
        }
        TaskAction::Stats => print_json(&session.tree.stats())?,
    }

    // Selection or completion may have changed the current task.
    session.bind_current_task();
    session.finish();
    Ok(())
}

fn print_task(tree: &TaskTree, id: &str) -> CliResult {
    print_json(&tree.get(id))
}
