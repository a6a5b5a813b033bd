//! Whole-document storage for the task list.

use std::cell::{Cell, RefCell};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::data_dir;
use crate::error::Result;
use crate::task::TaskList;

pub trait TaskStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<TaskList>>;
    fn save(&self, list: &TaskList) -> Result<()>;
}

/// Pretty-printed JSON file, `<data_dir>/tasks.json` by default.
#[derive(Debug, Clone)]
pub struct JsonFileTaskStore {
    path: PathBuf,
}

impl JsonFileTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(data_dir()?.join("tasks.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for JsonFileTaskStore {
    fn load(&self) -> Result<Option<TaskList>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, list: &TaskList) -> Result<()> {
        let content = serde_json::to_string_pretty(list)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Keeps the last saved list in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    saved: Rc<RefCell<Option<TaskList>>>,
    saves: Rc<Cell<usize>>,
}

impl MemoryTaskStore {
    pub fn snapshot(&self) -> Option<TaskList> {
        self.saved.borrow().clone()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl TaskStore for MemoryTaskStore {
    fn load(&self) -> Result<Option<TaskList>> {
        Ok(self.snapshot())
    }

    fn save(&self, list: &TaskList) -> Result<()> {
        *self.saved.borrow_mut() = Some(list.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
