mod accumulator;
mod engine;
mod interruption;
mod phase;

pub use accumulator::{quantize, AccrualWindow, WorkTimeAccumulator};
pub use engine::{PhaseEngine, PhaseTransition, TimerState, TimerStatus};
pub use interruption::{
    ActiveInterruption, InterruptionRecord, InterruptionTracker, DEFAULT_INTERRUPTION_TYPE,
};
pub use phase::{Phase, SoundSettings, TimerSettings};
