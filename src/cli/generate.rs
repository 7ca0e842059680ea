use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use super::OutputFormat;
use crate::constants::STORAGES_HEADER;
use crate::site::{GenerateReport, GenerationRequest, SiteManager, SiteProbe};

/// Generate the mapping document for a new site.
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Site name; letters, digits, `_` and `-`
    pub name: String,

    /// JSON file with the site URLs, credentials and storage domains,
    /// or `-` to read it from stdin
    #[arg(short, long)]
    pub request: PathBuf,

    /// Print the playbook transcript after the summary
    #[arg(long)]
    pub show_output: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl GenerateCommand {
    pub async fn execute<P: SiteProbe>(self, manager: &SiteManager<P>) -> Result<()> {
        let request = read_request(&self.request).await?;
        let report = manager.generate(&self.name, request).await?;

        if self.format.print_structured(&report)? {
            return Ok(());
        }
        print_report(&report, self.show_output);
        Ok(())
    }
}

async fn read_request(path: &Path) -> Result<GenerationRequest> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await.context("Failed to read request from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read request from {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("Failed to parse request {}", path.display()))
}

fn print_report(report: &GenerateReport, show_output: bool) {
    println!(
        "{} site '{}' ({} storage domains mapped)",
        "Generated".green().bold(),
        report.name,
        report.matched
    );
    println!("  {}", report.document.display());

    if !report.messages.is_empty() || !report.warnings.is_empty() {
        println!();
        println!("{}", STORAGES_HEADER.bold());
        for message in &report.messages {
            println!("  {message}");
        }
        for warning in &report.warnings {
            println!("  {} {warning}", "warning:".yellow());
        }
    }

    if show_output {
        println!();
        print!("{}", report.output);
    }
}
