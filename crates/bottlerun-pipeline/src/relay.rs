use std::io::{self, Write};

use anyhow::Context;

use crate::progress::{self, ProgressSample};

/// Marker introducing a status record in the display protocol. The
/// dialog program treats bare integer lines as the bar position and
/// marker lines as the status text.
pub const STATUS_MARKER: char = '#';

/// What the user is being shown: the operation's label and where its
/// result lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStatus {
    pub label: String,
    pub destination: String,
}

impl OperationStatus {
    pub fn new(label: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            destination: destination.into(),
        }
    }
}

/// Why the relay stopped forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// The running sample reached 100 percent. The worker keeps emitting
    /// trailing bookkeeping lines after completion, so the relay breaks
    /// out instead of draining the stream.
    Completed,
    /// The reader side of the channel went away: the user closed the
    /// dialog mid-operation.
    DisplayClosed,
    /// The worker closed its output before reporting 100 percent.
    OutputExhausted,
}

/// Consumes the worker's line stream, threads the running sample through
/// the parser, and writes two records per line into the channel: the bare
/// percent value and the formatted status record. Sole writer of the
/// channel for the duration of one operation.
pub fn relay_progress<W: Write>(
    lines: impl Iterator<Item = io::Result<String>>,
    writer: &mut W,
    status: &OperationStatus,
) -> anyhow::Result<(ProgressSample, RelayEnd)> {
    let mut sample = ProgressSample::default();

    for line in lines {
        let line = line.context("failed reading worker output")?;
        sample = progress::apply_line(&line, &sample);

        match write_update(writer, &sample, status) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                log::debug!("display closed the progress channel");
                return Ok((sample, RelayEnd::DisplayClosed));
            }
            Err(err) => {
                return Err(err).context("failed writing to progress channel");
            }
        }

        if sample.is_complete() {
            return Ok((sample, RelayEnd::Completed));
        }
    }

    Ok((sample, RelayEnd::OutputExhausted))
}

fn write_update<W: Write>(
    writer: &mut W,
    sample: &ProgressSample,
    status: &OperationStatus,
) -> io::Result<()> {
    writeln!(writer, "{}", sample.percent.unwrap_or(0))?;
    writeln!(writer, "{}", render_status_record(sample, status))?;
    writer.flush()
}

/// One status record per update. The protocol is line-oriented, so the
/// block's fields are flattened into a single marker line; embedding raw
/// newlines would desync the percent/status alternation at the reader.
pub fn render_status_record(sample: &ProgressSample, status: &OperationStatus) -> String {
    format!(
        "{STATUS_MARKER} {}: {} [{} of {}, {}, eta {}]",
        status.label,
        status.destination,
        field(&sample.current),
        field(&sample.total),
        field(&sample.rate),
        field(&sample.eta),
    )
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("?")
}
