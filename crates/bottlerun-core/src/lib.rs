mod config;
mod layout;

pub use config::{DisplaySettings, InstallerConfig, WatcherSettings};
pub use layout::RunLayout;

#[cfg(test)]
mod tests;
