//! Subprocess orchestration for monitored install operations.
//!
//! One operation is a worker process (download tool, dependency installer,
//! runtime bootstrap) whose free-form output is parsed into progress
//! samples and relayed over a private FIFO to a display process rendering
//! the dialog. The display's exit is the cancellation signal; both exits
//! are reconciled into a single [`Outcome`].

mod channel;
mod progress;
mod reconcile;
mod relay;
mod runner;
mod watcher;

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result};
use bottlerun_core::RunLayout;

pub use channel::ProgressChannel;
pub use progress::{apply_line, ProgressSample, TOKEN_MAX_LEN};
pub use reconcile::{
    reconcile_exit_codes, supervise, FailureReason, Outcome, Verdict, BENIGN_REAP_EXIT,
};
pub use relay::{relay_progress, render_status_record, OperationStatus, RelayEnd, STATUS_MARKER};
pub use runner::{spawn_display, spawn_worker, ProcessHandle};
pub use watcher::{await_directory_free, DirectoryWatchPolicy};

/// Errors of the pipeline itself, as opposed to verdicts about the
/// monitored processes. A failed spawn aborts the operation immediately
/// and is distinct from a runtime exit with nonzero status.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to spawn process '{command}'")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting on process '{command}'")]
    WaitFailed {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("progress channel error at {path}")]
    ChannelFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Runs one monitored operation end to end: channel setup, both spawns,
/// relay, reconciliation, teardown. The same skeleton serves downloads,
/// runtime bootstrap waits and dependency-installer runs; only the worker
/// command differs.
///
/// Fatal errors (spawn or channel failures) abort the whole flow; a
/// failing worker or a user cancellation is an `Ok` outcome carrying the
/// failure verdict. No retry logic lives here; any retry policy belongs
/// in a layer above.
pub fn run_monitored_operation(
    worker_cmd: Command,
    display_cmd: Command,
    status: &OperationStatus,
    layout: &RunLayout,
) -> Result<Outcome> {
    let channel = ProgressChannel::create(layout.channel_path())?;
    let (mut writer, reader) = match channel.attach() {
        Ok(endpoints) => endpoints,
        Err(err) => {
            channel.remove();
            return Err(err.into());
        }
    };

    let mut display = match spawn_display(display_cmd, Stdio::from(reader)) {
        Ok(display) => display,
        Err(err) => {
            channel.remove();
            return Err(err.into());
        }
    };

    let mut worker = match spawn_worker(worker_cmd) {
        Ok(worker) => worker,
        Err(err) => {
            channel.teardown(Some(&mut display));
            let _ = display.wait();
            return Err(err.into());
        }
    };

    let mut lines = worker
        .output_lines()
        .context("worker output stream already taken")?;
    let relay_result = relay::relay_progress(&mut lines, &mut writer, status);
    // The writer must close before teardown can begin; dropping it is what
    // delivers EOF to the display process.
    drop(writer);

    let (_, end) = match relay_result {
        Ok(result) => result,
        Err(err) => {
            channel.teardown(Some(&mut display));
            let _ = worker.terminate();
            let _ = worker.wait();
            let _ = display.wait();
            return Err(err);
        }
    };
    log::debug!("relay finished: {end:?}");

    // A completed worker may still emit trailing bookkeeping lines, more
    // than a pipe buffer of them. Closing the read end here would kill it
    // with SIGPIPE; keeping it open unread would wedge it on a full pipe.
    // So the rest of the stream is drained off-thread until EOF while the
    // exits are reconciled.
    let drain = thread::spawn(move || {
        for line in lines {
            if line.is_err() {
                break;
            }
        }
    });

    let outcome = supervise(worker, display)?;
    let _ = drain.join();
    channel.remove();
    log::info!(
        "operation '{}' finished: worker={} display={} success={}",
        status.label,
        outcome.worker_exit,
        outcome.display_exit,
        outcome.is_success()
    );
    Ok(outcome)
}
