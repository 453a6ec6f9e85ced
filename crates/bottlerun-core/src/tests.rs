use super::*;

use std::time::Duration;

#[test]
fn config_defaults_match_original_constants() {
    let config = InstallerConfig::from_toml_str("").expect("must parse empty config");
    assert_eq!(config.display.program, "zenity");
    assert_eq!(config.display.args, vec!["--progress", "--auto-close"]);
    assert_eq!(config.watcher.poll_interval_secs, 7);
    assert_eq!(config.watcher.idle_polls, 3);
    assert!(config.runtime_dir.is_none());
}

#[test]
fn config_overrides_are_honored() {
    let raw = r#"
runtime_dir = "/var/tmp/bottlerun"

[display]
program = "yad"
args = ["--progress"]

[watcher]
poll_interval_secs = 2
idle_polls = 5
"#;
    let config = InstallerConfig::from_toml_str(raw).expect("must parse config");
    assert_eq!(config.display.program, "yad");
    assert_eq!(config.display.args, vec!["--progress"]);
    assert_eq!(config.watcher.poll_interval(), Duration::from_secs(2));
    assert_eq!(config.watcher.idle_polls, 5);
    assert_eq!(
        config.runtime_dir.as_deref(),
        Some(std::path::Path::new("/var/tmp/bottlerun"))
    );
}

#[test]
fn config_rejects_empty_display_program() {
    let raw = "[display]\nprogram = \" \"\n";
    let err = InstallerConfig::from_toml_str(raw).expect_err("blank program must be rejected");
    assert!(
        err.to_string().contains("display program must not be empty"),
        "unexpected error: {err}"
    );
}

#[test]
fn config_rejects_zero_poll_interval() {
    let raw = "[watcher]\npoll_interval_secs = 0\n";
    let err = InstallerConfig::from_toml_str(raw).expect_err("zero interval must be rejected");
    assert!(
        err.to_string().contains("poll interval must be nonzero"),
        "unexpected error: {err}"
    );
}

#[test]
fn config_rejects_zero_idle_polls() {
    let raw = "[watcher]\nidle_polls = 0\n";
    let err = InstallerConfig::from_toml_str(raw).expect_err("zero threshold must be rejected");
    assert!(
        err.to_string().contains("idle poll threshold must be nonzero"),
        "unexpected error: {err}"
    );
}

#[test]
fn run_layout_allocates_private_dir_with_channel_path() {
    let root = tempfile::tempdir().expect("must create tempdir");
    let layout = RunLayout::allocate(Some(root.path())).expect("must allocate run dir");

    assert!(layout.run_dir().is_dir());
    assert!(layout.run_dir().starts_with(root.path()));
    assert_eq!(
        layout.channel_path(),
        layout.run_dir().join("progress.pipe")
    );

    layout.cleanup();
    assert!(!layout.run_dir().exists());
}

#[test]
fn run_layout_allocations_do_not_collide() {
    let root = tempfile::tempdir().expect("must create tempdir");
    let first = RunLayout::allocate(Some(root.path())).expect("must allocate first");
    let second = RunLayout::allocate(Some(root.path())).expect("must allocate second");

    // Same pid and likely the same timestamp second; the sequence suffix
    // must still keep the two runs apart.
    assert_ne!(first.run_dir(), second.run_dir());
    assert!(first.run_dir().is_dir());
    assert!(second.run_dir().is_dir());

    first.cleanup();
    second.cleanup();
}
