use clap::Subcommand;
use serde_json::json;

use super::common::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum InterruptAction {
    /// Begin an interruption; the current task stops accruing work time
    Start {
        /// Interruption type, e.g. chore, meeting, call
        #[arg(long, default_value = "chore")]
        kind: String,
        /// What to do about it afterwards
        #[arg(long)]
        action: Option<String>,
    },
    /// End the active interruption
    End,
    /// End the active interruption, or start a new one
    Toggle {
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        action: Option<String>,
    },
    /// Print the interruption log
    List,
    /// Clear the interruption log
    Clear,
}

pub fn run(action: InterruptAction) -> CliResult {
    let mut session = Session::open()?;

    match action {
        InterruptAction::Start { kind, action } => {
            if !session.engine.start_interruption(kind, action) {
                return Err("an interruption is already active".into());
            }
            print_json(&session.engine.active_interruption())?;
        }
        InterruptAction::End => {
            if !session.engine.is_interrupted() {
                return Err("no active interruption".into());
            }
            // Interruptions shorter than a second leave no record.
            let record = session.engine.end_interruption();
            print_json(&json!({ "record": record }))?;
        }
        InterruptAction::Toggle { kind, action } => {
            let active = session.engine.toggle_interruption(kind, action);
            print_json(&json!({
                "active": active,
                "interruption": session.engine.active_interruption(),
            }))?;
        }
        InterruptAction::List => print_json(session.engine.interruption_records())?,
        InterruptAction::Clear => {
            session.engine.clear_interruption_records();
            print_json(&json!({ "cleared": true }))?;
        }
    }

    session.finish();
    Ok(())
}
