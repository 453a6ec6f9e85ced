use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Private, per-run scratch directory owned by exactly one operation.
///
/// The progress channel lives here and the whole directory is removed at
/// the end of the run, so two concurrent operations never share state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    run_dir: PathBuf,
}

impl RunLayout {
    /// Allocates a fresh run directory under `root` (the system temp dir
    /// when `None`). The path embeds the pid and a timestamp so repeated
    /// runs of the same operation never collide.
    pub fn allocate(root: Option<&Path>) -> Result<Self> {
        let base = root
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        let run_dir = base.join(format!(
            "bottlerun-{}-{}-{}",
            std::process::id(),
            current_unix_timestamp()?,
            RUN_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed creating run dir: {}", run_dir.display()))?;
        Ok(Self { run_dir })
    }

    pub fn at(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Path of the single progress channel for this run's operation.
    pub fn channel_path(&self) -> PathBuf {
        self.run_dir.join("progress.pipe")
    }

    pub fn cleanup(&self) {
        if let Err(err) = fs::remove_dir_all(&self.run_dir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove run dir {}: {err}",
                    self.run_dir.display()
                );
            }
        }
    }
}

pub(crate) fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs())
}
