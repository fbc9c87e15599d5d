//! Output formatting
//!
//! Run summary lines, error display, and progress indication.

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::run::RunResult;

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";
}

/// Output configuration, derived from CLI flags at startup
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// Debug-level logging requested
    pub verbose: bool,
}

impl OutputConfig {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Base log level: informational, raised to debug by `--verbose`
    pub fn level(self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Install the tracing subscriber for this configuration
    pub fn init_tracing(self) {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(self.level().into()),
            )
            .init();
    }
}

/// Create a spinner for the run in progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Print the per-package outcome lines and the aggregate verdict
pub fn print_summary(result: &RunResult) {
    for outcome in result.outcomes() {
        if outcome.ok() {
            let note = if outcome.skipped { " (already built)" } else { "" };
            println!(
                "{} {:>3}  {}{note}",
                status::SUCCESS,
                outcome.num,
                outcome.package
            );
        } else {
            let reason = outcome.reason.as_deref().unwrap_or("unknown failure");
            println!(
                "{} {:>3}  {}: {reason}",
                status::ERROR,
                outcome.num,
                outcome.package
            );
        }
    }

    if result.success() {
        println!("{} all packages built", status::SUCCESS);
    } else if result.aborted() {
        println!("{} run aborted after failure", status::ERROR);
    } else {
        println!("{} run finished with failures", status::ERROR);
    }
}

/// Display an error to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error:#}", status::ERROR);
}
