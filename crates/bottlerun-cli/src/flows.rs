use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use bottlerun_core::{DisplaySettings, InstallerConfig, RunLayout, WatcherSettings};
use bottlerun_pipeline::{
    apply_line, await_directory_free, reconcile_exit_codes, run_monitored_operation, spawn_worker,
    DirectoryWatchPolicy, OperationStatus, Outcome, ProgressSample,
};

use crate::render::{current_output_style, start_progress};

/// Dot-style progress keeps wget's output line-oriented, which is what
/// the parser expects.
pub(crate) fn build_download_command(url: &str, output: &Path) -> Command {
    let mut command = Command::new("wget");
    command
        .arg("--progress=dot:mega")
        .arg("-O")
        .arg(output)
        .arg(url);
    command
}

pub(crate) fn build_worker_command(argv: &[String]) -> Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("worker command must not be empty"))?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

pub(crate) fn build_display_command(
    settings: &DisplaySettings,
    status: &OperationStatus,
) -> Command {
    let mut command = Command::new(&settings.program);
    command.args(&settings.args);
    command.arg(format!("--title={}", status.label));
    command.arg(format!("--text={}", status.destination));
    command
}

/// Runs one worker through the monitored pipeline, or through the
/// in-terminal fallback when no dialog is wanted.
pub(crate) fn execute_operation(
    config: &InstallerConfig,
    plain: bool,
    worker: Command,
    status: &OperationStatus,
) -> Result<Outcome> {
    if plain {
        return run_plain(worker, status);
    }

    log::debug!(
        "running '{}' behind display program '{}'",
        status.label,
        config.display.program
    );
    let layout = RunLayout::allocate(config.runtime_dir.as_deref())?;
    let display = build_display_command(&config.display, status);
    let outcome = run_monitored_operation(worker, display, status, &layout);
    layout.cleanup();
    outcome
}

/// In-terminal fallback: same worker, same parser, but progress lands in
/// an indicatif bar instead of a display process. With no display there is
/// no cancellation side, so its exit contributes a benign zero.
fn run_plain(worker: Command, status: &OperationStatus) -> Result<Outcome> {
    let mut worker = spawn_worker(worker)?;
    let mut lines = worker
        .output_lines()
        .context("worker output stream already taken")?;

    let mut progress = start_progress(current_output_style(), &status.label);
    let mut sample = ProgressSample::default();
    for line in &mut lines {
        let line = line.context("failed reading worker output")?;
        sample = apply_line(&line, &sample);
        progress.update(&sample);
        if sample.is_complete() {
            break;
        }
    }
    progress.finish();

    // A worker that keeps talking after the completion break must neither
    // be cut off (SIGPIPE) nor left blocking on a full pipe; the rest of
    // the stream is drained off-thread until EOF while it is waited on.
    let drain = std::thread::spawn(move || {
        for line in lines {
            if line.is_err() {
                break;
            }
        }
    });
    let worker_exit = worker.wait()?;
    let _ = drain.join();
    Ok(Outcome {
        worker_exit,
        display_exit: 0,
        verdict: reconcile_exit_codes(0, worker_exit),
    })
}

pub(crate) fn settle_directory(dir: &Path, settings: &WatcherSettings) -> Result<()> {
    let policy = DirectoryWatchPolicy::from(settings);
    await_directory_free(dir, &policy)
}
