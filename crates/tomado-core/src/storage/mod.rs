mod config;
pub mod database;
pub mod kv;
pub mod task_store;

pub use config::{Config, ExportConfig, ImportConfig};
pub use database::Database;
pub use kv::{MemoryStore, Persistence, Value};
pub use task_store::{JsonFileTaskStore, MemoryTaskStore, TaskStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Persistence keys. Values are stored as text in the kv table; the
/// `*_BLOB` keys hold JSON documents.
pub mod keys {
    pub const WORK_DURATION: &str = "pomodoro_work_duration";
    pub const BREAK_DURATION: &str = "pomodoro_break_duration";
    pub const LONG_BREAK_DURATION: &str = "pomodoro_long_break_duration";
    pub const CYCLE_COUNT: &str = "pomodoro_cycle_count";

    pub const SOUND_ENABLED: &str = "pomodoro_sound_enabled";
    pub const COMPLETION_SOUND: &str = "pomodoro_completion_sound";
    pub const SEPARATE_START_END_SOUNDS: &str = "pomodoro_separate_start_end_sounds";
    pub const START_SOUND: &str = "pomodoro_start_sound";
    pub const SOUND_VOLUME: &str = "pomodoro_sound_volume";

    pub const REMAINING_SECONDS: &str = "pomodoro_remaining_seconds";
    pub const CURRENT_PHASE: &str = "pomodoro_current_phase";
    pub const SESSION_COUNT: &str = "pomodoro_session_count";
    /// Epoch seconds.
    pub const PHASE_START_TIME: &str = "pomodoro_phase_start_time";
    pub const TOTAL_PAUSED_DURATION: &str = "pomodoro_total_paused_duration";
    /// Epoch seconds.
    pub const PAUSED_AT: &str = "pomodoro_paused_at";
    pub const IS_RUNNING: &str = "pomodoro_is_running";

    pub const ACCUMULATED_WORK_TIME_BLOB: &str = "pomodoro_accumulated_work_time";
    pub const TASK_WINDOW_BLOB: &str = "pomodoro_task_window";
    pub const INTERRUPTION_RECORDS_BLOB: &str = "pomodoro_interruption_records";
    pub const ACTIVE_INTERRUPTION_BLOB: &str = "pomodoro_active_interruption";

    pub const CURRENT_TASK_ID: &str = "current_task_id";
}

/// Returns the data directory, creating it if needed.
///
/// `TOMADO_DATA_DIR` overrides the location. Otherwise this is
/// `~/.config/tomado`, or `~/.config/tomado-dev` when `TOMADO_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TOMADO_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TOMADO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("tomado-dev")
            } else {
                base_dir.join("tomado")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
