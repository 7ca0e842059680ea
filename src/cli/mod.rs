//! Command-line interface for dr-controller.
//!
//! Every subcommand maps onto one [`SiteManager`] operation:
//!
//! ```bash
//! dr-controller generate site1 --request site1.json
//! dr-controller failover site1
//! dr-controller failback site1
//! dr-controller cleanup site1
//! dr-controller list --format json
//! dr-controller show site1
//! dr-controller delete site1
//! ```
//!
//! Global flags select the configuration file (`--config`), override the
//! store root (`--store-dir`) and control log verbosity (`--verbose`,
//! `--quiet`). Logs go to stderr; results go to stdout.

mod generate;
mod lifecycle;
mod list;

pub use generate::GenerateCommand;
pub use lifecycle::{DeleteCommand, OperationCommand};
pub use list::{ListCommand, ShowCommand};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::ControllerConfig;
use crate::site::{Operation, SiteManager, SiteProbe};

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(
    name = "dr-controller",
    about = "Disaster recovery site controller for oVirt",
    version,
    long_about = "Generates disaster recovery mappings for oVirt sites and runs the failover, failback and cleanup playbooks against them."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (same as RUST_LOG=debug).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file.
    ///
    /// Defaults to `<config dir>/dr-controller/config.toml` when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store root holding the template and site directories.
    ///
    /// Takes precedence over the configuration file and
    /// `DR_CONTROLLER_STORE_DIR`.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the mapping document for a new site.
    Generate(GenerateCommand),

    /// Run the failover playbook of a site.
    Failover(OperationCommand),

    /// Run the failback playbook of a site.
    Failback(OperationCommand),

    /// Clean the engine with the failover playbook's cleanup tag.
    Cleanup(OperationCommand),

    /// Remove a site directory.
    Delete(DeleteCommand),

    /// List generated sites.
    List(ListCommand),

    /// Print the mapping document of a site.
    Show(ShowCommand),
}

/// Output format for commands that print structured results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Print `value` as JSON or YAML; returns false for [`OutputFormat::Text`]
    /// so the caller renders its own text.
    pub(crate) fn print_structured<T: Serialize>(self, value: &T) -> Result<bool> {
        match self {
            Self::Text => Ok(false),
            Self::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
                Ok(true)
            }
            Self::Yaml => {
                print!("{}", serde_yaml::to_string(value)?);
                Ok(true)
            }
        }
    }
}

impl Cli {
    /// Load the configuration and run the selected subcommand.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();
        let config = self.load_config().await?;
        let manager = SiteManager::new(config);
        self.run(&manager).await
    }

    /// Run the subcommand against an existing manager.
    pub async fn run<P: SiteProbe>(self, manager: &SiteManager<P>) -> Result<()> {
        match self.command {
            Commands::Generate(cmd) => cmd.execute(manager).await,
            Commands::Failover(cmd) => cmd.execute(manager, Operation::Failover).await,
            Commands::Failback(cmd) => cmd.execute(manager, Operation::Failback).await,
            Commands::Cleanup(cmd) => cmd.execute(manager, Operation::Cleanup).await,
            Commands::Delete(cmd) => cmd.execute(manager).await,
            Commands::List(cmd) => cmd.execute(manager).await,
            Commands::Show(cmd) => cmd.execute(manager).await,
        }
    }

    async fn load_config(&self) -> Result<ControllerConfig> {
        let mut config = ControllerConfig::load(self.config.as_deref()).await?;
        if let Some(store_dir) = &self.store_dir {
            config.store_dir.clone_from(store_dir);
        }
        Ok(config)
    }

    /// Filter directive for the stderr subscriber.
    ///
    /// `RUST_LOG` wins over the default level, but not over an explicit
    /// `--verbose` or `--quiet`.
    #[must_use]
    pub fn log_filter(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else if self.quiet {
            "error".to_string()
        } else {
            std::env::var("RUST_LOG")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "info".to_string())
        }
    }

    fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(self.log_filter()))
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .try_init();
    }
}
