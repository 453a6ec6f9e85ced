use anyhow::{anyhow, Context, Result};
use bottlerun_core::InstallerConfig;
use bottlerun_pipeline::{FailureReason, OperationStatus, Outcome, Verdict};

use crate::flows::{
    build_download_command, build_worker_command, execute_operation, settle_directory,
};
use crate::render::{current_output_style, print_outcome, print_status};
use crate::{Cli, Commands};

pub fn run_cli(cli: Cli) -> Result<()> {
    let config = InstallerConfig::load_or_default(cli.config.as_deref())?;
    let style = current_output_style();

    match cli.command {
        Commands::Download { url, output } => {
            let status = OperationStatus::new("Downloading", output.display().to_string());
            let worker = build_download_command(&url, &output);
            let outcome = execute_operation(&config, cli.plain, worker, &status)?;
            report(&outcome, cli.json, style)
        }
        Commands::Run {
            label,
            destination,
            settle_dir,
            command,
        } => {
            let worker = build_worker_command(&command)?;
            let destination = destination.unwrap_or_else(|| command[0].clone());
            let status = OperationStatus::new(label, destination);
            let outcome = execute_operation(&config, cli.plain, worker, &status)?;
            let report_result = report(&outcome, cli.json, style);

            // Settle even after a worker failure: the runtime may still be
            // releasing the directory, and the next step must not race it.
            if let Some(dir) = settle_dir {
                print_status(style, "settle", &format!("waiting for {}", dir.display()));
                settle_directory(&dir, &config.watcher)?;
            }
            report_result
        }
        Commands::AwaitFree { dir } => {
            print_status(style, "settle", &format!("waiting for {}", dir.display()));
            settle_directory(&dir, &config.watcher)
                .with_context(|| format!("failed waiting for {}", dir.display()))?;
            print_status(style, "settle", &format!("{} is free", dir.display()));
            Ok(())
        }
        Commands::Completion { shell } => {
            crate::completion::write_completion_script(shell, &mut std::io::stdout().lock())
        }
    }
}

/// Renders the outcome (human lines or JSON) and turns a failure verdict
/// into the single diagnostic the flow stops with.
fn report(outcome: &Outcome, json: bool, style: crate::render::OutputStyle) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(outcome).context("failed to serialize outcome")?
        );
    } else {
        print_outcome(style, outcome);
    }

    match &outcome.verdict {
        Verdict::Success => Ok(()),
        Verdict::Failure {
            reason: FailureReason::WorkerFailed { code },
        } => Err(anyhow!("worker exited with status {code}")),
        Verdict::Failure {
            reason: FailureReason::UserCancelled { display_code },
        } => Err(anyhow!(
            "operation cancelled by the user (dialog exited with status {display_code})"
        )),
    }
}
