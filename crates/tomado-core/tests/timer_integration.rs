//! Integration tests for the phase engine.
//!
//! Every scenario drives a `ManualClock` and checks state, accrued work time
//! and the published events.

use std::rc::Rc;

use tomado_core::storage::keys;
use tomado_core::{
    Database, Event, EventQueue, ManualClock, MemoryStore, Persistence, Phase, PhaseEngine,
    Priority, Task, TaskUpdateSource, TimerSettings,
};

fn engine_with_task() -> (ManualClock, EventQueue, PhaseEngine, Task) {
    let clock = ManualClock::at_epoch();
    let events = EventQueue::new();
    let mut engine = PhaseEngine::new(clock.clone(), MemoryStore::new(), events.clone());
    let task = Task::new("Write report", Priority::High);
    engine.set_current_task(Some(task.clone()));
    (clock, events, engine, task)
}

fn progress_events(events: &EventQueue) -> Vec<(String, f64)> {
    events
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            Event::PomodoroProgressByTaskId {
                task_id,
                elapsed_pomodoros,
            } => Some((task_id, elapsed_pomodoros)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_pause_resume_scenario() {
    let (clock, events, mut engine, task) = engine_with_task();

    engine.start();
    clock.advance_secs(700);
    engine.pause();
    assert_eq!(engine.remaining_seconds(), 800);
    assert_eq!(progress_events(&events), vec![(task.id.clone(), 0.46)]);

    clock.advance_secs(200);
    engine.start();
    clock.advance_secs(500);
    assert!(engine.tick().is_none());

    assert_eq!(engine.remaining_seconds(), 300);
    assert_eq!(engine.window_elapsed(), 1200);
    // The 700 s flushed at the pause are not reported again.
    assert_eq!(engine.accumulator().accumulated(&task.id), 500);
    assert_eq!(engine.elapsed_pomodoros(), 0.33);
}

#[test]
fn test_four_sessions_reach_long_break() {
    let (clock, events, mut engine, _task) = engine_with_task();
    engine.start();

    let mut transitions = Vec::new();
    for _ in 0..4 {
        clock.advance_secs(1500);
        transitions.push(engine.tick().expect("work completes"));
        if engine.phase() == Phase::Break {
            clock.advance_secs(300);
            transitions.push(engine.tick().expect("break completes"));
        }
    }

    assert_eq!(engine.phase(), Phase::LongBreak);
    assert_eq!(engine.session_count(), 0);
    assert_eq!(engine.remaining_seconds(), 900);
    let phases: Vec<(Phase, Phase)> = transitions.iter().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        phases,
        [
            (Phase::Work, Phase::Break),
            (Phase::Break, Phase::Work),
            (Phase::Work, Phase::Break),
            (Phase::Break, Phase::Work),
            (Phase::Work, Phase::Break),
            (Phase::Break, Phase::Work),
            (Phase::Work, Phase::LongBreak),
        ]
    );

    // Each work phase flushed exactly one full pomodoro.
    let progress = progress_events(&events);
    assert_eq!(progress.len(), 4);
    assert!(progress.iter().all(|(_, p)| *p == 1.0));

    clock.advance_secs(900);
    let back = engine.tick().unwrap();
    assert_eq!((back.from, back.to), (Phase::LongBreak, Phase::Work));
}

#[test]
fn test_break_time_is_not_work() {
    let (clock, events, mut engine, task) = engine_with_task();
    engine.skip();
    assert_eq!(engine.phase(), Phase::Break);
    events.drain();

    clock.advance_secs(120);
    engine.tick();
    assert_eq!(engine.elapsed_pomodoros(), 0.0);
    assert_eq!(engine.accumulator().accumulated(&task.id), 0);

    clock.advance_secs(180);
    let transition = engine.tick().unwrap();
    assert_eq!(transition.to, Phase::Work);
    clock.advance_secs(60);
    engine.tick();
    assert_eq!(engine.accumulator().accumulated(&task.id), 60);
}

#[test]
fn test_interruption_excludes_time_and_logs_record() {
    let (clock, events, mut engine, task) = engine_with_task();
    engine.start();
    clock.advance_secs(300);
    engine.tick();

    assert!(engine.start_interruption("meeting", Some("create task".into())));
    clock.advance_secs(600);
    engine.tick();
    let record = engine.end_interruption().unwrap();
    assert_eq!(record.duration_seconds, 600);
    assert_eq!(record.interruption_type.as_deref(), Some("meeting"));

    clock.advance_secs(100);
    engine.tick();
    assert_eq!(engine.accumulator().accumulated(&task.id), 400);
    assert!(events
        .drain()
        .iter()
        .any(|e| matches!(e, Event::InterruptionEnded { duration_seconds: 600, .. })));
}

#[test]
fn test_interruption_counts_wall_clock_while_paused() {
    let (clock, _events, mut engine, _task) = engine_with_task();
    engine.start_interruption("chore", None);
    engine.pause();
    clock.advance_secs(45);
    let record = engine.end_interruption().unwrap();
    assert_eq!(record.duration_seconds, 45);
}

#[test]
fn test_reset_clears_task_time() {
    let (clock, events, mut engine, task) = engine_with_task();
    engine.start();
    clock.advance_secs(450);
    engine.tick();
    events.drain();

    engine.reset();
    assert_eq!(progress_events(&events), vec![(task.id.clone(), 0.3)]);
    assert_eq!(engine.remaining_seconds(), 1500);
    assert!(!engine.is_running());
    assert!(engine.accumulator().window().is_none());
    assert_eq!(engine.elapsed_pomodoros(), 0.0);
}

#[test]
fn test_skip_current_task_hands_over_progress() {
    let (clock, events, mut engine, task) = engine_with_task();
    engine.start();
    clock.advance_secs(300);
    engine.tick();
    events.drain();

    assert_eq!(engine.skip_current_task(), Some(0.2));
    let skipped: Vec<Option<f64>> = events
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            Event::TaskUpdated {
                task: t,
                source: TaskUpdateSource::Skipped,
                elapsed_pomodoros,
                ..
            } if t.id == task.id => Some(elapsed_pomodoros),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![Some(0.2)]);
    assert_eq!(engine.accumulator().accumulated(&task.id), 0);
    assert!(engine.is_running());

    // The handed-over seconds are never reported again.
    engine.pause();
    assert!(progress_events(&events).is_empty());

    engine.start();
    clock.advance_secs(150);
    engine.pause();
    assert_eq!(progress_events(&events), vec![(task.id.clone(), 0.1)]);
}

#[test]
fn test_reset_cycle_reports_progress_then_clears() {
    let (clock, events, mut engine, task) = engine_with_task();
    engine.skip();
    engine.skip();
    engine.start();
    clock.advance_secs(200);
    engine.tick();
    assert_eq!(engine.session_count(), 1);
    events.drain();

    engine.reset_cycle();
    assert_eq!(progress_events(&events), vec![(task.id.clone(), 0.13)]);
    assert!(!engine.is_running());
    assert_eq!(engine.phase(), Phase::Work);
    assert_eq!(engine.session_count(), 0);
    assert_eq!(engine.remaining_seconds(), 1500);
    assert_eq!(engine.accumulator().accumulated(&task.id), 0);
}

#[test]
fn test_custom_settings_drive_phase_lengths() {
    let (clock, _events, mut engine, _task) = engine_with_task();
    let settings = TimerSettings {
        work_duration: 60,
        break_duration: 30,
        long_break_duration: 90,
        cycles_until_long_break: 1,
        ..TimerSettings::default()
    };
    engine.update_settings(settings).unwrap();
    engine.start();
    clock.advance_secs(60);
    let transition = engine.tick().unwrap();
    assert_eq!(transition.to, Phase::LongBreak);
    assert_eq!(engine.remaining_seconds(), 90);
}

#[test]
fn test_state_survives_restart_with_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tomado.db");
    let clock = ManualClock::at_epoch();
    let task = Task::new("Deep work", Priority::Medium);

    {
        let mut engine = PhaseEngine::new(
            clock.clone(),
            Database::open_at(&path).unwrap(),
            EventQueue::new(),
        );
        engine.set_current_task(Some(task.clone()));
        engine.start();
        clock.advance_secs(400);
        engine.enter_background();
    }

    clock.advance_secs(200);
    let events = EventQueue::new();
    let mut engine = PhaseEngine::new(
        clock.clone(),
        Database::open_at(&path).unwrap(),
        events.clone(),
    );
    engine.set_current_task(Some(task.clone()));
    assert!(engine.enter_foreground().is_none());
    assert_eq!(engine.remaining_seconds(), 900);
    assert_eq!(engine.accumulator().accumulated(&task.id), 600);
    assert_eq!(engine.window_elapsed(), 600);

    engine.pause();
    assert_eq!(progress_events(&events), vec![(task.id.clone(), 0.4)]);
}

#[test]
fn test_paused_state_survives_restart() {
    let store = Rc::new(MemoryStore::new());
    let clock = ManualClock::at_epoch();
    {
        let mut engine = PhaseEngine::new(clock.clone(), Rc::clone(&store), EventQueue::new());
        engine.start();
        clock.advance_secs(100);
        engine.pause();
    }
    assert_eq!(store.get_bool(keys::IS_RUNNING), Some(false));
    assert_eq!(store.get_int(keys::REMAINING_SECONDS), Some(1400));

    clock.advance_secs(1000);
    let mut engine = PhaseEngine::new(clock.clone(), Rc::clone(&store), EventQueue::new());
    assert!(!engine.is_running());
    engine.start();
    clock.advance_secs(10);
    engine.tick();
    assert_eq!(engine.remaining_seconds(), 1390);
}

#[test]
fn test_interruption_log_is_persisted() {
    let store = Rc::new(MemoryStore::new());
    let clock = ManualClock::at_epoch();
    {
        let mut engine = PhaseEngine::new(clock.clone(), Rc::clone(&store), EventQueue::new());
        engine.start_interruption("call", None);
        clock.advance_secs(30);
        engine.end_interruption();
        engine.start_interruption("chore", None);
    }

    let engine = PhaseEngine::new(clock.clone(), Rc::clone(&store), EventQueue::new());
    assert_eq!(engine.interruption_records().len(), 1);
    assert!(engine.is_interrupted());
}
