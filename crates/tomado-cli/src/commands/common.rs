//! Wiring shared by the timer, task and interrupt commands.
//!
//! Every invocation opens a [`Session`]: the engine is restored from the
//! database and reconciled with the wall clock, the task tree is loaded and
//! the engine is bound to the tree's current task. Events published while
//! the command runs are applied to the tree (a finished work phase credits
//! one pomodoro) and collected for output.

use std::error::Error;
use std::rc::Rc;

use serde::Serialize;
use tomado_core::storage::keys;
use tomado_core::{
    Database, Event, EventQueue, JsonFileTaskStore, Persistence, Phase, PhaseEngine,
    SystemClock, TaskTree, ValidationError,
};

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

pub struct Session {
    pub engine: PhaseEngine,
    pub tree: TaskTree,
    db: Rc<Database>,
    queue: EventQueue,
    events: Vec<Event>,
}

impl Session {
    pub fn open() -> CliResult<Self> {
        let db = Rc::new(Database::open()?);
        let mut tree = TaskTree::open(JsonFileTaskStore::open_default()?);
        tree.set_current_task_id(db.get_string(keys::CURRENT_TASK_ID));

        let queue = EventQueue::new();
        let engine = PhaseEngine::new(SystemClock, Rc::clone(&db), queue.clone());
        let mut session = Self {
            engine,
            tree,
            db,
            queue,
            events: Vec::new(),
        };
        session.bind_current_task();
        session.engine.enter_foreground();
        session.settle();
        Ok(session)
    }

    /// Point the engine at the tree's current task.
    pub fn bind_current_task(&mut self) {
        let task = self.tree.current_task().cloned();
        self.engine.set_current_task(task);
        self.settle();
    }

    /// Apply queued events to the task tree and keep them for output.
    pub fn settle(&mut self) {
        loop {
            let batch = self.queue.drain();
            if batch.is_empty() {
                break;
            }
            for event in batch {
                if let Event::PhaseCompleted {
                    from: Phase::Work,
                    skipped: false,
                    ..
                } = event
                {
                    if let Some(id) = self.tree.add_pomodoro_to_current() {
                        tracing::info!(task_id = %id, "pomodoro credited");
                        let task = self.tree.current_task().cloned();
                        self.engine.set_current_task(task);
                    }
                }
                self.events.push(event);
            }
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn events_since(&self, from: usize) -> &[Event] {
        self.events.get(from..).unwrap_or_default()
    }

    /// Persist everything and return the events published during the command.
    pub fn finish(mut self) -> Vec<Event> {
        self.settle();
        self.engine.enter_background();
        match self.tree.current_task_id() {
            Some(id) => self.db.set(keys::CURRENT_TASK_ID, id.into()),
            None => self.db.remove(keys::CURRENT_TASK_ID),
        }
        self.settle();
        self.events
    }
}

/// Resolve a full task id or a unique prefix of one.
pub fn resolve_id(tree: &TaskTree, id: &str) -> CliResult<String> {
    if tree.get(id).is_some() {
        return Ok(id.to_string());
    }
    let mut matches = tree.tasks().iter().filter(|t| t.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(task), None) if !id.is_empty() => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(format!("ambiguous task id: {id}").into()),
        _ => Err(ValidationError::TaskNotFound(id.to_string()).into()),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
