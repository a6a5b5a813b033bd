use std::time::Duration;

use clap::Subcommand;
use serde_json::json;

use super::common::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current phase
    Start,
    /// Pause the current phase
    Pause,
    /// Start if stopped, pause if running
    Toggle,
    /// End the current phase early and start the next one
    Skip,
    /// Stop and rewind the current phase
    Reset,
    /// Stop and return to the first work phase of a new cycle
    ResetCycle,
    /// Print current timer state as JSON
    Status,
    /// Tick once per second in the foreground until Ctrl-C
    Run,
    /// Show or change phase lengths (seconds) and the long-break cycle
    Settings {
        #[arg(long)]
        work: Option<u64>,
        #[arg(long = "break")]
        break_: Option<u64>,
        #[arg(long)]
        long_break: Option<u64>,
        /// Work phases per long break
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Complete the current task and move on to the next one
    CompleteTask,
    /// Postpone the current task and move on to the next one
    SkipTask,
}

pub fn run(action: TimerAction) -> CliResult {
    let mut session = Session::open()?;

    match action {
        TimerAction::Start => session.engine.start(),
        TimerAction::Pause => session.engine.pause(),
        TimerAction::Toggle => session.engine.toggle(),
        TimerAction::Skip => {
            session.engine.skip();
        }
        TimerAction::Reset => session.engine.reset(),
        TimerAction::ResetCycle => session.engine.reset_cycle(),
        TimerAction::Status => {
            session.engine.tick();
        }
        TimerAction::Run => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(run_loop(&mut session))?;
        }
        TimerAction::Settings {
            work,
            break_,
            long_break,
            cycles,
        } => {
            if work.is_none() && break_.is_none() && long_break.is_none() && cycles.is_none() {
                let settings = session.engine.settings().clone();
                session.finish();
                return print_json(&settings);
            }
            let mut settings = session.engine.settings().clone();
            if let Some(v) = work {
                settings.work_duration = v;
            }
            if let Some(v) = break_ {
                settings.break_duration = v;
            }
            if let Some(v) = long_break {
                settings.long_break_duration = v;
            }
            if let Some(v) = cycles {
                settings.cycles_until_long_break = v;
            }
            session.engine.update_settings(settings)?;
        }
        TimerAction::CompleteTask => {
            let id = current_task_id(&session)?;
            session.engine.complete_current_task();
            session.tree.complete(&id);
            session.bind_current_task();
        }
        TimerAction::SkipTask => {
            current_task_id(&session)?;
            session.engine.skip_current_task();
            session.tree.postpone_current();
            session.bind_current_task();
        }
    }

    session.settle();
    let status = session.engine.status();
    let events = session.finish();
    print_json(&json!({ "status": status, "events": events }))
}

fn current_task_id(session: &Session) -> CliResult<String> {
    session
        .engine
        .current_task()
        .map(|t| t.id.clone())
        .ok_or_else(|| "no current task".into())
}

/// Tick once per second, printing each new event as a JSON line.
async fn run_loop(session: &mut Session) -> CliResult {
    session.engine.start();
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut printed = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                session.engine.tick();
                session.settle();
                for event in session.events_since(printed) {
                    println!("{}", serde_json::to_string(event)?);
                }
                printed = session.event_count();
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, saving timer state");
                return Ok(());
            }
        }
    }
}
