use super::*;

use std::path::Path;

use bottlerun_core::DisplaySettings;
use bottlerun_pipeline::{FailureReason, OperationStatus, Outcome, Verdict};

use crate::flows::{build_display_command, build_download_command, build_worker_command};
use crate::render::outcome_lines;

fn rendered_args(command: &std::process::Command) -> Vec<String> {
    command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn download_command_uses_dot_progress_and_output_path() {
    let command = build_download_command("https://example.test/setup.msi", Path::new("/tmp/setup.msi"));
    assert_eq!(command.get_program(), "wget");
    assert_eq!(
        rendered_args(&command),
        vec![
            "--progress=dot:mega",
            "-O",
            "/tmp/setup.msi",
            "https://example.test/setup.msi"
        ]
    );
}

#[test]
fn worker_command_splits_program_and_args() {
    let command = build_worker_command(&[
        "winetricks".to_string(),
        "-q".to_string(),
        "corefonts".to_string(),
    ])
    .expect("must build command");
    assert_eq!(command.get_program(), "winetricks");
    assert_eq!(rendered_args(&command), vec!["-q", "corefonts"]);
}

#[test]
fn empty_worker_command_is_rejected() {
    let err = build_worker_command(&[]).expect_err("empty argv must be rejected");
    assert!(
        err.to_string().contains("worker command must not be empty"),
        "unexpected error: {err}"
    );
}

#[test]
fn display_command_carries_configured_args_and_labels() {
    let settings = DisplaySettings::default();
    let status = OperationStatus::new("Downloading", "/tmp/setup.msi");
    let command = build_display_command(&settings, &status);

    assert_eq!(command.get_program(), "zenity");
    assert_eq!(
        rendered_args(&command),
        vec![
            "--progress",
            "--auto-close",
            "--title=Downloading",
            "--text=/tmp/setup.msi"
        ]
    );
}

#[test]
fn outcome_lines_name_the_failing_side_and_code() {
    let success = Outcome {
        worker_exit: 0,
        display_exit: 127,
        verdict: Verdict::Success,
    };
    assert_eq!(
        outcome_lines(&success),
        vec!["operation completed (worker=0, dialog=127)"]
    );

    let worker_failed = Outcome {
        worker_exit: 8,
        display_exit: 0,
        verdict: Verdict::Failure {
            reason: FailureReason::WorkerFailed { code: 8 },
        },
    };
    assert_eq!(
        outcome_lines(&worker_failed),
        vec!["worker failed with status 8 (dialog=0)"]
    );

    let cancelled = Outcome {
        worker_exit: 137,
        display_exit: 1,
        verdict: Verdict::Failure {
            reason: FailureReason::UserCancelled { display_code: 1 },
        },
    };
    assert_eq!(
        outcome_lines(&cancelled),
        vec!["cancelled by the user (dialog=1, worker=137)"]
    );
}

#[cfg(unix)]
#[test]
fn plain_mode_drains_trailing_output_after_completion() {
    use bottlerun_core::InstallerConfig;

    use crate::flows::execute_operation;

    // Half a megabyte after the completion token, far past the pipe
    // buffer; the plain-mode loop breaks at 100% but the worker must
    // still be able to flush the rest and exit cleanly.
    let mut worker = std::process::Command::new("sh");
    worker
        .arg("-c")
        .arg("echo 100%; head -c 524288 /dev/zero | tr '\\0' x; exit 0");
    let status = OperationStatus::new("Installing", "prefix");

    let outcome = execute_operation(&InstallerConfig::default(), true, worker, &status)
        .expect("plain run must complete");
    assert_eq!(outcome.worker_exit, 0);
    assert!(outcome.is_success());
}

#[test]
fn outcome_serializes_with_tagged_verdict() {
    let outcome = Outcome {
        worker_exit: 8,
        display_exit: 0,
        verdict: Verdict::Failure {
            reason: FailureReason::WorkerFailed { code: 8 },
        },
    };
    let json = serde_json::to_value(&outcome).expect("must serialize");
    assert_eq!(json["worker_exit"], 8);
    assert_eq!(json["display_exit"], 0);
    assert_eq!(json["verdict"]["result"], "failure");
    assert_eq!(json["verdict"]["reason"]["kind"], "worker_failed");
    assert_eq!(json["verdict"]["reason"]["code"], 8);
}

#[test]
fn cli_parses_download_with_global_flags() {
    use clap::Parser;

    let cli = Cli::try_parse_from([
        "bottlerun",
        "--plain",
        "--json",
        "download",
        "https://example.test/setup.msi",
        "/tmp/setup.msi",
    ])
    .expect("must parse");
    assert!(cli.plain);
    assert!(cli.json);
    assert!(matches!(cli.command, Commands::Download { .. }));
}

#[test]
fn cli_parses_run_with_trailing_worker_command() {
    use clap::Parser;

    let cli = Cli::try_parse_from([
        "bottlerun",
        "run",
        "--label",
        "Installing fonts",
        "--settle-dir",
        "/opt/prefix",
        "--",
        "winetricks",
        "-q",
        "corefonts",
    ])
    .expect("must parse");

    match cli.command {
        Commands::Run {
            label,
            settle_dir,
            command,
            ..
        } => {
            assert_eq!(label, "Installing fonts");
            assert_eq!(settle_dir.as_deref(), Some(Path::new("/opt/prefix")));
            assert_eq!(command, vec!["winetricks", "-q", "corefonts"]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_rejects_run_without_worker_command() {
    use clap::Parser;

    Cli::try_parse_from(["bottlerun", "run"]).expect_err("missing worker command must fail");
}
