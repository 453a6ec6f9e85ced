use serde::Serialize;

use crate::runner::ProcessHandle;

/// Exit code observed when a wait call races a process the OS has already
/// reaped. Benign on both sides: not a real failure code.
pub const BENIGN_REAP_EXIT: i32 = 127;

/// Final result of one monitored operation. Produced once by the
/// reconciler and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub worker_exit: i32,
    pub display_exit: i32,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    Success,
    Failure { reason: FailureReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The worker exited with a non-benign nonzero code while the display
    /// exited benignly.
    WorkerFailed { code: i32 },
    /// The display exited non-benignly: the user closed the dialog.
    UserCancelled { display_code: i32 },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self.verdict, Verdict::Success)
    }
}

fn is_benign(code: i32) -> bool {
    code == 0 || code == BENIGN_REAP_EXIT
}

/// Pure reconciliation of the two exit codes:
///
/// - display benign, worker benign        -> Success
/// - display benign, worker other        -> Failure(worker failed)
/// - display other, any worker code      -> Failure(user cancelled)
pub fn reconcile_exit_codes(display_exit: i32, worker_exit: i32) -> Verdict {
    if !is_benign(display_exit) {
        return Verdict::Failure {
            reason: FailureReason::UserCancelled {
                display_code: display_exit,
            },
        };
    }
    if is_benign(worker_exit) {
        Verdict::Success
    } else {
        Verdict::Failure {
            reason: FailureReason::WorkerFailed { code: worker_exit },
        }
    }
}

/// Waits on both processes and produces the final outcome.
///
/// The display is waited on first: its exit is the only cancellation
/// signal. On a non-benign display exit the worker is forcefully
/// terminated through its owned handle before its own wait is issued, to
/// bound how long the user waits for cleanup. The worker is never killed
/// speculatively; a benign display exit always lets it finish its wait
/// undisturbed.
pub fn supervise(worker: ProcessHandle, display: ProcessHandle) -> anyhow::Result<Outcome> {
    let display_exit = display.wait()?;

    let mut worker = worker;
    if !is_benign(display_exit) {
        log::info!(
            "display exited with {display_exit}, cancelling worker pid {}",
            worker.id()
        );
        // The wait below must still run even when the kill fails, so the
        // child is reaped and an outcome is always produced.
        if let Err(err) = worker.terminate() {
            log::warn!("failed to terminate worker pid {}: {err}", worker.id());
        }
    }
    let worker_exit = worker.wait()?;

    Ok(Outcome {
        worker_exit,
        display_exit,
        verdict: reconcile_exit_codes(display_exit, worker_exit),
    })
}
