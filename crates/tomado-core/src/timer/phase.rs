use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::ValidationError;
use crate::storage::{keys, Persistence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Work,
    Break,
    LongBreak,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Break => "break",
            Phase::LongBreak => "longBreak",
        }
    }

    pub fn is_work(self) -> bool {
        self == Phase::Work
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Phase::Work),
            "break" => Ok(Phase::Break),
            "longBreak" => Ok(Phase::LongBreak),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

/// Sound preferences. Carried and persisted, never interpreted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundSettings {
    pub enabled: bool,
    pub completion_sound: String,
    pub separate_start_end_sounds: bool,
    pub start_sound: String,
    pub volume: f64,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            completion_sound: "Glass".to_string(),
            separate_start_end_sounds: false,
            start_sound: "Ping".to_string(),
            volume: 1.0,
        }
    }
}

/// Phase lengths in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_duration: u64,
    pub break_duration: u64,
    pub long_break_duration: u64,
    pub cycles_until_long_break: u32,
    #[serde(default)]
    pub sound: SoundSettings,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration: 25 * 60,
            break_duration: 5 * 60,
            long_break_duration: 15 * 60,
            cycles_until_long_break: 4,
            sound: SoundSettings::default(),
        }
    }
}

impl TimerSettings {
    pub fn duration_of(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_duration,
            Phase::Break => self.break_duration,
            Phase::LongBreak => self.long_break_duration,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let durations = [
            ("work_duration", self.work_duration),
            ("break_duration", self.break_duration),
            ("long_break_duration", self.long_break_duration),
        ];
        for (field, secs) in durations {
            if secs == 0 {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if self.cycles_until_long_break == 0 {
            return Err(ValidationError::InvalidValue {
                field: "cycles_until_long_break".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.sound.volume) {
            return Err(ValidationError::InvalidValue {
                field: "volume".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        Ok(())
    }

    /// Read settings from `store`. Missing or non-positive values keep their
    /// defaults.
    pub fn load(store: &dyn Persistence) -> Self {
        let defaults = Self::default();
        let positive = |key: &str, fallback: u64| -> u64 {
            match store.get_int(key) {
                Some(v) if v > 0 => v as u64,
                Some(v) => {
                    debug!(key, value = v, "ignoring non-positive setting");
                    fallback
                }
                None => fallback,
            }
        };

        let cycles = positive(keys::CYCLE_COUNT, u64::from(defaults.cycles_until_long_break));
        let sound = SoundSettings {
            enabled: store
                .get_bool(keys::SOUND_ENABLED)
                .unwrap_or(defaults.sound.enabled),
            completion_sound: store
                .get_string(keys::COMPLETION_SOUND)
                .unwrap_or(defaults.sound.completion_sound),
            separate_start_end_sounds: store
                .get_bool(keys::SEPARATE_START_END_SOUNDS)
                .unwrap_or(defaults.sound.separate_start_end_sounds),
            start_sound: store
                .get_string(keys::START_SOUND)
                .unwrap_or(defaults.sound.start_sound),
            volume: store
                .get_double(keys::SOUND_VOLUME)
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(defaults.sound.volume),
        };

        Self {
            work_duration: positive(keys::WORK_DURATION, defaults.work_duration),
            break_duration: positive(keys::BREAK_DURATION, defaults.break_duration),
            long_break_duration: positive(keys::LONG_BREAK_DURATION, defaults.long_break_duration),
            cycles_until_long_break: u32::try_from(cycles)
                .unwrap_or(defaults.cycles_until_long_break),
            sound,
        }
    }

    pub fn save(&self, store: &dyn Persistence) {
        store.set(keys::WORK_DURATION, self.work_duration.into());
        store.set(keys::BREAK_DURATION, self.break_duration.into());
        store.set(keys::LONG_BREAK_DURATION, self.long_break_duration.into());
        store.set(keys::CYCLE_COUNT, self.cycles_until_long_break.into());
        store.set(keys::SOUND_ENABLED, self.sound.enabled.into());
        store.set(keys::COMPLETION_SOUND, self.sound.completion_sound.as_str().into());
        store.set(
            keys::SEPARATE_START_END_SOUNDS,
            self.sound.separate_start_end_sounds.into(),
        );
        store.set(keys::START_SOUND, self.sound.start_sound.as_str().into());
        store.set(keys::SOUND_VOLUME, self.sound.volume.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn phase_names_round_trip() {
        for phase in [Phase::Work, Phase::Break, Phase::LongBreak] {
            assert_eq!(phase.as_str().parse::<Phase>(), Ok(phase));
            assert_eq!(
                serde_json::to_value(phase).unwrap(),
                serde_json::Value::String(phase.as_str().into())
            );
        }
    }

    #[test]
    fn defaults_are_classic_pomodoro() {
        let settings = TimerSettings::default();
        assert_eq!(settings.duration_of(Phase::Work), 1500);
        assert_eq!(settings.duration_of(Phase::Break), 300);
        assert_eq!(settings.duration_of(Phase::LongBreak), 900);
        assert_eq!(settings.cycles_until_long_break, 4);
        assert_eq!(settings.sound.completion_sound, "Glass");
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut settings = TimerSettings::default();
        settings.break_duration = 0;
        assert!(settings.validate().is_err());

        let mut settings = TimerSettings::default();
        settings.cycles_until_long_break = 0;
        assert!(settings.validate().is_err());

        assert!(TimerSettings::default().validate().is_ok());
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let mut settings = TimerSettings::default();
        settings.work_duration = 50 * 60;
        settings.cycles_until_long_break = 2;
        settings.sound.volume = 0.25;
        settings.save(&store);
        assert_eq!(TimerSettings::load(&store), settings);
    }

    #[test]
    fn load_ignores_garbage() {
        let store = MemoryStore::new();
        store.set_raw(keys::WORK_DURATION, "-5");
        store.set_raw(keys::BREAK_DURATION, "soon");
        store.set_raw(keys::SOUND_VOLUME, "7");
        assert_eq!(TimerSettings::load(&store), TimerSettings::default());
    }
}
