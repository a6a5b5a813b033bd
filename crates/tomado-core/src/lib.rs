//! # Tomado Core Library
//!
//! This library provides the core logic of Tomado, a focus timer that pairs
//! timed work/break phases with a prioritized, hierarchical task list. The
//! `tomado` CLI binary is a thin shell over it.
//!
//! ## Architecture
//!
//! - **Phase Engine**: A timestamp-based state machine that requires the caller
//!   to periodically invoke `tick()`; it also accounts real work time per task
//!   and tracks interruptions
//! - **Task Tree**: Tree-structured tasks kept in execution order, with
//!   cascading completion, cycle-safe reparenting and text import/export
//! - **Storage**: SQLite key-value persistence, a JSON task document and
//!   TOML configuration
//!
//! ## Key Components
//!
//! - [`PhaseEngine`]: Core timer state machine
//! - [`TaskTree`]: Single writer of the task list
//! - [`TextHierarchyCodec`]: Indented checkbox text format
//! - [`Database`]: Timer state persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod storage;
pub mod task;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{Event, EventQueue, EventSink, NullSink, TaskUpdateSource};
pub use storage::{
    Config, Database, JsonFileTaskStore, MemoryStore, MemoryTaskStore, Persistence, TaskStore,
};
pub use task::{
    DecodeOptions, EncodeOptions, IndentStyle, Priority, Task, TaskList, TaskStats, TaskTree,
    TextHierarchyCodec,
};
pub use timer::{
    InterruptionRecord, Phase, PhaseEngine, PhaseTransition, TimerSettings, TimerState,
    TimerStatus,
};
