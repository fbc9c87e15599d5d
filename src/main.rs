//! pkgstack CLI - ordered package-stack build orchestrator
//!
//! Entry point for the pkgstack command-line application.

use anyhow::Result;
use clap::Parser;

use pkgstack::cli::output::{display_error, OutputConfig};
use pkgstack::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output_config = OutputConfig::new(cli.verbose);
    output_config.init_tracing();

    // Exit status reflects aggregate success.
    match cli.run().await {
        Ok(result) if result.success() => Ok(()),
        Ok(_) => std::process::exit(1),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
