use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::runner::ProcessHandle;
use crate::PipelineError;

/// Ephemeral byte conduit between the relay and the display process: a
/// FIFO in the operation's private run directory, with at most one writer
/// and one reader. Exactly one channel exists per in-flight operation.
#[derive(Debug)]
pub struct ProgressChannel {
    path: PathBuf,
}

impl ProgressChannel {
    /// Creates the FIFO before either endpoint attaches.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        mkfifo(&path).map_err(|source| PipelineError::ChannelFailed {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Attaches both endpoints and returns `(writer, reader)`.
    ///
    /// The read end is opened first with O_NONBLOCK so the open cannot
    /// stall waiting for a writer; nothing reads from it before the writer
    /// exists because the descriptor is only ever handed to the display
    /// process, which is spawned afterwards. The write end is opened
    /// write-only so that the reader going away surfaces to the relay as
    /// BrokenPipe instead of silently filling the FIFO. Blocking mode is
    /// restored on the read end before it is passed on.
    pub fn attach(&self) -> Result<(File, File), PipelineError> {
        self.attach_endpoints()
            .map_err(|source| PipelineError::ChannelFailed {
                path: self.path.clone(),
                source,
            })
    }

    #[cfg(unix)]
    fn attach_endpoints(&self) -> io::Result<(File, File)> {
        use std::fs::OpenOptions;
        use std::os::fd::AsRawFd;
        use std::os::unix::fs::OpenOptionsExt;

        let reader = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)?;
        let writer = OpenOptions::new().write(true).open(&self.path)?;

        let flags = unsafe { libc::fcntl(reader.as_raw_fd(), libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let cleared = unsafe {
            libc::fcntl(reader.as_raw_fd(), libc::F_SETFL, flags & !libc::O_NONBLOCK)
        };
        if cleared < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok((writer, reader))
    }

    #[cfg(not(unix))]
    fn attach_endpoints(&self) -> io::Result<(File, File)> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "progress channels are supported only on unix hosts",
        ))
    }

    /// Normal teardown once both processes have been reconciled.
    pub fn remove(&self) {
        remove_path(&self.path);
    }

    /// Forced teardown for error paths: a display process that never saw
    /// EOF would otherwise hold the read end open forever, so it is
    /// terminated before the channel path is removed.
    pub fn teardown(&self, lingering_reader: Option<&mut ProcessHandle>) {
        if let Some(display) = lingering_reader {
            match display.is_running() {
                Ok(true) => {
                    if let Err(err) = display.terminate() {
                        log::warn!(
                            "failed to terminate lingering display pid {}: {err}",
                            display.id()
                        );
                    }
                }
                Ok(false) => {}
                Err(err) => log::warn!("failed to probe lingering display: {err}"),
            }
        }
        remove_path(&self.path);
    }
}

fn remove_path(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            log::warn!("failed to remove progress channel {}: {err}", path.display());
        }
    }
}

#[cfg(unix)]
fn mkfifo(path: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "channel path contains NUL"))?;
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn mkfifo(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "progress channels are supported only on unix hosts",
    ))
}
