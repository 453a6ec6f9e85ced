use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use bottlerun_pipeline::{FailureReason, Outcome, ProgressSample, Verdict};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stderr().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn print_status(style: OutputStyle, status: &str, message: &str) {
    match style {
        OutputStyle::Plain => eprintln!("{status}: {message}"),
        OutputStyle::Rich => eprintln!("{} {message}", colorize(status_style(), status)),
    }
}

pub(crate) fn print_outcome(style: OutputStyle, outcome: &Outcome) {
    for line in outcome_lines(outcome) {
        print_status(style, verdict_tag(&outcome.verdict), &line);
    }
}

pub(crate) fn outcome_lines(outcome: &Outcome) -> Vec<String> {
    match &outcome.verdict {
        Verdict::Success => vec![format!(
            "operation completed (worker={}, dialog={})",
            outcome.worker_exit, outcome.display_exit
        )],
        Verdict::Failure {
            reason: FailureReason::WorkerFailed { code },
        } => vec![format!(
            "worker failed with status {code} (dialog={})",
            outcome.display_exit
        )],
        Verdict::Failure {
            reason: FailureReason::UserCancelled { display_code },
        } => vec![format!(
            "cancelled by the user (dialog={display_code}, worker={})",
            outcome.worker_exit
        )],
    }
}

fn verdict_tag(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Success => "done",
        Verdict::Failure { .. } => "failed",
    }
}

pub(crate) struct TerminalProgress {
    progress_bar: Option<ProgressBar>,
}

/// In-terminal progress for `--plain` runs. Plain style on a pipe keeps
/// quiet; a tty gets an indicatif bar fed directly from the parsed
/// samples.
pub(crate) fn start_progress(style: OutputStyle, label: &str) -> TerminalProgress {
    let progress_bar = if style == OutputStyle::Rich {
        let progress_bar = ProgressBar::new(100);
        if let Ok(template) = ProgressStyle::with_template(
            "{spinner:.cyan.bold} {msg:<14} [{bar:25.cyan/blue}] {pos:>3}%",
        ) {
            progress_bar.set_style(template.progress_chars("=>-"));
        }
        progress_bar.set_message(label.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        Some(progress_bar)
    } else {
        None
    };
    TerminalProgress { progress_bar }
}

impl TerminalProgress {
    pub(crate) fn update(&mut self, sample: &ProgressSample) {
        let Some(progress_bar) = &self.progress_bar else {
            return;
        };
        if let Some(percent) = sample.percent {
            progress_bar.set_position(u64::from(percent.min(100)));
        }
    }

    pub(crate) fn finish(self) {
        if let Some(progress_bar) = self.progress_bar {
            progress_bar.finish_and_clear();
        }
    }
}

fn status_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
