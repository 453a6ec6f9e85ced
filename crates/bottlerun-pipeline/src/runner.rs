use std::io::{self, BufRead, BufReader, PipeReader};
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::PipelineError;

/// A spawned external process, owned exclusively by the code that started
/// it. The handle is the only way to terminate or wait on the process; no
/// name-scanning of the process table is ever needed.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    command_line: String,
    output: Option<PipeReader>,
}

/// Spawns `command` without blocking, with stdout and stderr combined into
/// a single stream. Worker tools write progress to either side, so callers
/// always see one interleaved line sequence.
pub fn spawn_worker(mut command: Command) -> Result<ProcessHandle, PipelineError> {
    let command_line = describe_command(&command);
    let (reader, writer) = io::pipe().map_err(|source| PipelineError::SpawnFailed {
        command: command_line.clone(),
        source,
    })?;
    let writer_for_stderr = writer
        .try_clone()
        .map_err(|source| PipelineError::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;
    command
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_for_stderr);

    log::debug!("spawning worker: {command_line}");
    let child = command.spawn().map_err(|source| PipelineError::SpawnFailed {
        command: command_line.clone(),
        source,
    })?;
    // `command` drops here, closing the parent's copies of the write ends;
    // the reader then reaches EOF exactly when the child closes its output.
    Ok(ProcessHandle {
        child,
        command_line,
        output: Some(reader),
    })
}

/// Spawns the display process with the given stdin (the read end of the
/// progress channel). Its output is left on the terminal.
pub fn spawn_display(mut command: Command, stdin: Stdio) -> Result<ProcessHandle, PipelineError> {
    let command_line = describe_command(&command);
    command.stdin(stdin);

    log::debug!("spawning display: {command_line}");
    let child = command.spawn().map_err(|source| PipelineError::SpawnFailed {
        command: command_line.clone(),
        source,
    })?;
    Ok(ProcessHandle {
        child,
        command_line,
        output: None,
    })
}

impl ProcessHandle {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Finite, lazy line stream over the process's combined output. Ends
    /// when the process closes both of its output descriptors. May be
    /// taken at most once.
    pub fn output_lines(&mut self) -> Option<impl Iterator<Item = io::Result<String>>> {
        let reader = self.output.take()?;
        Some(BufReader::new(reader).lines())
    }

    pub fn is_running(&mut self) -> anyhow::Result<bool> {
        Ok(self.child.try_wait()?.is_none())
    }

    /// Forceful termination. Tolerates a child that already exited, so the
    /// cancellation path never fails on the benign race.
    pub fn terminate(&mut self) -> anyhow::Result<()> {
        log::debug!("terminating pid {}: {}", self.id(), self.command_line);
        match self.child.kill() {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Blocking wait for the exit code. Consumes the handle: a process is
    /// waited on exactly once.
    pub fn wait(mut self) -> Result<i32, PipelineError> {
        let status = self
            .child
            .wait()
            .map_err(|source| PipelineError::WaitFailed {
                command: self.command_line.clone(),
                source,
            })?;
        let code = exit_code_of(status);
        log::debug!("pid {} exited with {code}: {}", self.id(), self.command_line);
        Ok(code)
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

pub(crate) fn describe_command(command: &Command) -> String {
    let mut rendered = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}
