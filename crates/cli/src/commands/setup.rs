//! Setup checklist commands.
//!
//! # Usage
//!
//! ```bash
//! # Probe the database and show progress
//! stockroom setup status
//!
//! # Without a database, mark what you know is done
//! stockroom setup status --offline --done enums --done tables
//!
//! # SQL and instructions for one step
//! stockroom setup sql rls
//! stockroom setup instructions seed
//! ```
//!
//! The tracker lives for one invocation. `--done` marks steps completed
//! before the probes run; a probed step is still re-checked afterwards.

use stockroom_app::db::create_pool;
use stockroom_app::setup::{manual_steps, tracker};
use stockroom_app::{AppConfig, AppError};
use stockroom_core::{SetupSummary, SetupTracker, StepSnapshot, StepStatus};

/// Run the setup probes and print progress.
///
/// # Errors
///
/// Returns `AppError` if no database is configured (without `--offline`),
/// the connection fails or a `--done` id is unknown.
pub async fn status(
    config: &AppConfig,
    offline: bool,
    done: &[String],
    json: bool,
) -> Result<(), AppError> {
    let pool = if offline {
        None
    } else {
        let database_url = config.require_database_url()?;
        tracing::info!("Connecting to database...");
        Some(create_pool(database_url).await?)
    };

    let mut tracker = tracker(pool.as_ref(), &config.db_schema)?;

    for id in done {
        if !tracker.mark_step_completed(id) {
            return Err(unknown_step(id));
        }
    }

    let summary = tracker.check_all_steps().await;

    if json {
        print_json(&tracker, &summary)?;
    } else {
        print_status(&tracker, &summary);
    }
    Ok(())
}

/// Print the SQL for one step.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the step id is unknown.
pub fn sql(id: &str) -> Result<(), AppError> {
    let step = lookup(id)?;
    print_text(step.sql.as_deref().unwrap_or("-- no SQL for this step"));
    Ok(())
}

/// Print the manual instructions for one step.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the step id is unknown.
pub fn instructions(id: &str) -> Result<(), AppError> {
    let step = lookup(id)?;
    print_text(&format!("{}\n\n{}", step.title, step.manual_instructions));
    Ok(())
}

fn lookup(id: &str) -> Result<StepSnapshot, AppError> {
    SetupTracker::new(manual_steps())?
        .step(id)
        .ok_or_else(|| unknown_step(id))
}

fn unknown_step(id: &str) -> AppError {
    AppError::BadRequest(format!("unknown setup step '{id}'"))
}

const fn marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "[x]",
        StepStatus::InProgress => "[~]",
        StepStatus::Failed => "[!]",
        StepStatus::Pending => "[ ]",
    }
}

fn status_line(step: &StepSnapshot) -> String {
    let mut line = format!("{} {:<10} {}", marker(step.status), step.id, step.title);
    if !step.has_probe && step.status != StepStatus::Completed {
        line.push_str(" (manual)");
    }
    if let Some(message) = &step.message {
        line.push_str(" - ");
        line.push_str(message);
    }
    line
}

#[allow(clippy::print_stdout)]
fn print_text(text: &str) {
    println!("{text}");
}

#[allow(clippy::print_stdout)]
fn print_status(tracker: &SetupTracker, summary: &SetupSummary) {
    for step in tracker.steps() {
        println!("{}", status_line(&step));
    }
    println!();
    println!(
        "{}/{} steps completed ({}%)",
        summary.completed_count,
        summary.total_count,
        tracker.progress()
    );
    match &summary.current_step {
        Some(step) if !summary.all_completed => {
            println!("Next: {} (stockroom setup instructions {})", step.title, step.id);
        }
        _ => println!("Setup complete"),
    }
}

#[allow(clippy::print_stdout)]
fn print_json(tracker: &SetupTracker, summary: &SetupSummary) -> Result<(), AppError> {
    let report = serde_json::json!({
        "progress": tracker.progress(),
        "summary": summary,
        "steps": tracker.steps(),
    });
    let text = serde_json::to_string_pretty(&report)?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(lookup("seed").unwrap().id, "seed");
        assert!(matches!(lookup("nope"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_status_line_marks_manual_steps() {
        let step = lookup("seed").unwrap();
        assert_eq!(
            status_line(&step),
            "[ ] seed       Promote the first administrator (manual)"
        );
    }

    #[test]
    fn test_status_line_shows_failure_message() {
        let mut step = lookup("tables").unwrap();
        step.status = StepStatus::Failed;
        step.has_probe = true;
        step.message = Some("precondition not satisfied".to_owned());
        assert_eq!(
            status_line(&step),
            "[!] tables     Create tables - precondition not satisfied"
        );
    }
}
