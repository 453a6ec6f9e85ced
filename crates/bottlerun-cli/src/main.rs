mod completion;
mod dispatch;
mod flows;
mod render;
#[cfg(test)]
mod tests;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "bottlerun")]
#[command(
    about = "Drives long-running install operations with a cancellable progress dialog",
    long_about = None
)]
struct Cli {
    /// Path to a bottlerun config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Render progress in the terminal instead of spawning the dialog program.
    #[arg(long, global = true)]
    plain: bool,
    /// Print the final outcome as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a file through the monitored pipeline.
    Download { url: String, output: PathBuf },
    /// Run an arbitrary worker command through the monitored pipeline.
    Run {
        /// Label shown in the progress dialog.
        #[arg(long, default_value = "Installing")]
        label: String,
        /// Destination shown in the progress dialog; defaults to the
        /// worker program name.
        #[arg(long)]
        destination: Option<String>,
        /// After the worker finishes, block until no process holds open
        /// handles under this directory.
        #[arg(long)]
        settle_dir: Option<PathBuf>,
        /// Worker command line, given after `--`.
        #[arg(required = true, num_args = 1.., last = true)]
        command: Vec<String>,
    },
    /// Block until a directory is free of open handles.
    AwaitFree { dir: PathBuf },
    /// Generate a shell completion script on stdout.
    Completion { shell: Shell },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    dispatch::run_cli(cli)
}
