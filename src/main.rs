//! dr-controller entry point
//!
//! Parses the command line, runs the selected site operation and prints
//! errors with their context and a suggestion.

use anyhow::Result;
use clap::Parser;
use dr_controller::cli;
use dr_controller::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
