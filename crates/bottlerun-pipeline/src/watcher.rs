use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use bottlerun_core::WatcherSettings;

/// Polling policy for directory quiescence. The defaults reproduce the
/// original installer's constants: a 7 second inter-poll delay and 3
/// consecutive empty polls before the directory counts as free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryWatchPolicy {
    pub poll_interval: Duration,
    pub idle_threshold: u32,
}

impl Default for DirectoryWatchPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(7),
            idle_threshold: 3,
        }
    }
}

impl From<&WatcherSettings> for DirectoryWatchPolicy {
    fn from(settings: &WatcherSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            idle_threshold: settings.idle_polls,
        }
    }
}

/// Blocks until no process has held an open handle under `dir` for
/// `idle_threshold` consecutive polls.
///
/// The holder set is recomputed by external inspection on every poll and
/// never cached. A single empty poll is not trusted: a process may be in
/// the middle of opening the directory between polls. There is no overall
/// timeout; a process that holds the directory forever blocks this call
/// forever, which is acceptable for an interactive install.
pub fn await_directory_free(dir: &Path, policy: &DirectoryWatchPolicy) -> Result<()> {
    await_directory_free_with_probes(
        dir,
        policy,
        list_directory_holders,
        wait_for_pid_exit,
        thread::sleep,
    )
}

pub(crate) fn await_directory_free_with_probes<ListHolders, WaitPid, Sleep>(
    dir: &Path,
    policy: &DirectoryWatchPolicy,
    mut list_holders: ListHolders,
    mut wait_pid: WaitPid,
    mut sleep: Sleep,
) -> Result<()>
where
    ListHolders: FnMut(&Path) -> Result<Vec<u32>>,
    WaitPid: FnMut(u32) -> Result<()>,
    Sleep: FnMut(Duration),
{
    let mut idle_polls = 0u32;
    loop {
        let holders = list_holders(dir)?;
        if let Some(&pid) = holders.first() {
            log::debug!(
                "{} process(es) hold {}, waiting on pid {pid}",
                holders.len(),
                dir.display()
            );
            wait_pid(pid)?;
            idle_polls = 0;
        } else {
            idle_polls += 1;
            log::debug!("{} looks free ({idle_polls} idle polls)", dir.display());
            if idle_polls >= policy.idle_threshold {
                return Ok(());
            }
        }
        sleep(policy.poll_interval);
    }
}

/// Pids currently holding open handles under `dir`, via `lsof`. An exit
/// status of 1 means no holders, not a failure.
fn list_directory_holders(dir: &Path) -> Result<Vec<u32>> {
    let output = Command::new("lsof")
        .arg("-t")
        .arg("+D")
        .arg(dir)
        .output()
        .with_context(|| format!("failed to run lsof on {}", dir.display()))?;

    let mut pids = Vec::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if let Ok(pid) = line.trim().parse::<u32>() {
            pids.push(pid);
        }
    }
    Ok(pids)
}

/// Attaches to a process we did not spawn and blocks until it exits,
/// using a signal-0 liveness probe.
#[cfg(unix)]
fn wait_for_pid_exit(pid: u32) -> Result<()> {
    loop {
        let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
        // EPERM still means the process exists; only ESRCH means it is gone.
        let alive = rc == 0
            || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
        if !alive {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(500));
    }
}

#[cfg(not(unix))]
fn wait_for_pid_exit(_pid: u32) -> Result<()> {
    anyhow::bail!("directory watching is supported only on unix hosts")
}
