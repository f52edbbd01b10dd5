//! Driving transfer jobs from the terminal
//!
//! Renders job events, answers conflict prompts and turns Ctrl-C into a
//! cancellation request.

use std::path::Path;

use nav_core::{CancelToken, ConflictDecision, JobHandle, JobReport, JobState, TransferEvent};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar, Prompter};

/// One-line description of a pending transfer
pub(crate) fn plan_summary(
    verb: &str,
    count: usize,
    total_bytes: u64,
    destination: &str,
) -> String {
    format!(
        "{verb} {count} object(s) ({}) to {destination}",
        humansize::format_size(total_bytes, humansize::BINARY)
    )
}

#[derive(Debug, Serialize)]
struct TransferOutput {
    status: &'static str,
    state: JobState,
    transferred_bytes: u64,
    total_bytes: u64,
    completed: usize,
    skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

enum Step {
    Interrupt,
    Event(Option<TransferEvent>),
}

/// Follow a job to its end
pub(crate) async fn drive(
    mut handle: JobHandle,
    total_bytes: u64,
    formatter: &Formatter,
) -> nav_core::Result<JobReport> {
    let bar = ProgressBar::new(formatter.config(), total_bytes);
    let prompter = Prompter::new(formatter.is_json());
    let cancel = handle.cancel_token();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        let step = tokio::select! {
            _ = &mut ctrl_c, if !interrupted => Step::Interrupt,
            event = handle.next_event() => Step::Event(event),
        };

        match step {
            Step::Interrupt => {
                interrupted = true;
                request_cancel(&bar, &cancel);
            }
            Step::Event(None) => break,
            Step::Event(Some(event)) => match event {
                TransferEvent::Progress(progress) => bar.update(&progress),
                TransferEvent::DecisionNeeded { local_path, .. } => {
                    let decision = if interrupted {
                        ConflictDecision::Cancel
                    } else if prompter.is_interactive() {
                        bar.hide();
                        let prompt = prompter.conflict_async(local_path);
                        let answer = prompt_or_interrupt(prompt, &mut ctrl_c).await;
                        bar.show();
                        match answer {
                            Some(decision) => decision,
                            None => {
                                interrupted = true;
                                request_cancel(&bar, &cancel);
                                ConflictDecision::Cancel
                            }
                        }
                    } else {
                        refuse(formatter, &local_path)
                    };
                    // A refused decision means the job has already stopped.
                    let _ = handle.decide(decision);
                }
                TransferEvent::Skipped { local_path, .. } => {
                    if !formatter.is_quiet() && !formatter.is_json() {
                        bar.println(&format!("Skipped existing {}", local_path.display()));
                    }
                }
                TransferEvent::Started { object_count, .. } => {
                    tracing::debug!(object_count, "transfer started");
                }
                TransferEvent::Completed { .. }
                | TransferEvent::Cancelled { .. }
                | TransferEvent::Failed { .. } => {}
            },
        }
    }

    bar.finish_and_clear();
    handle.wait().await
}

fn request_cancel(bar: &ProgressBar, cancel: &CancelToken) {
    tracing::info!("interrupt received, cancelling transfer");
    bar.println("Cancelling...");
    cancel.cancel();
}

/// Wait for a prompt answer, or `None` when `interrupt` resolves first
async fn prompt_or_interrupt<P, I>(prompt: P, interrupt: I) -> Option<ConflictDecision>
where
    P: Future<Output = ConflictDecision>,
    I: Future,
{
    tokio::select! {
        decision = prompt => Some(decision),
        _ = interrupt => None,
    }
}

/// Answer for a collision when nobody can be asked
fn refuse(formatter: &Formatter, local_path: &Path) -> ConflictDecision {
    formatter.error(&format!(
        "{} already exists; pass --overwrite or --skip-existing",
        local_path.display()
    ));
    ConflictDecision::Cancel
}

/// Print the outcome of a job and map it to an exit code
pub(crate) fn finish(report: JobReport, verb: &str, formatter: &Formatter) -> ExitCode {
    let (status, code) = match (&report.state, &report.error) {
        (JobState::Completed, _) => ("success", ExitCode::Success),
        (JobState::Cancelled, _) => ("cancelled", ExitCode::Interrupted),
        (_, Some(error)) => ("error", ExitCode::from_error(error)),
        _ => ("error", ExitCode::GeneralError),
    };

    if formatter.is_json() {
        formatter.json(&TransferOutput {
            status,
            state: report.state,
            transferred_bytes: report.transferred_bytes,
            total_bytes: report.total_bytes,
            completed: report.completed,
            skipped: report.skipped,
            error: report.error.as_ref().map(ToString::to_string),
        });
        return code;
    }

    let moved = humansize::format_size(report.transferred_bytes, humansize::BINARY);
    match report.state {
        JobState::Completed => {
            let mut message = format!("{verb} {} object(s), {moved}", report.completed);
            if report.skipped > 0 {
                message.push_str(&format!(", {} skipped", report.skipped));
            }
            formatter.success(&message);
        }
        JobState::Cancelled => formatter.warning(&format!("Cancelled after {moved}")),
        _ => {
            let message = report
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "transfer failed".to_string());
            formatter.error(&message);
        }
    }
    code
}
