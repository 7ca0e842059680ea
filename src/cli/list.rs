use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::OutputFormat;
use crate::site::{SiteManager, SiteProbe, SiteStatus, SiteSummary};

/// List generated sites.
#[derive(Args, Debug)]
pub struct ListCommand {
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl ListCommand {
    pub async fn execute<P: SiteProbe>(self, manager: &SiteManager<P>) -> Result<()> {
        let sites = manager.list().await?;
        if self.format.print_structured(&sites)? {
            return Ok(());
        }

        if sites.is_empty() {
            println!("No sites found in {}", manager.config().store_dir.display());
            return Ok(());
        }
        for site in &sites {
            println!("{}", format_site(site));
        }
        Ok(())
    }
}

fn format_site(site: &SiteSummary) -> String {
    let modified = site
        .modified
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let name = format!("{:<24}", site.name);
    let status = format!("{:<12}", site.status);
    match site.status {
        SiteStatus::Ready => format!("{} {status} {modified}", name.bold()),
        SiteStatus::Incomplete => format!("{} {} {modified}", name.bold(), "(INCOMPLETE)".yellow()),
    }
}

/// Print the mapping document of a site.
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Site name
    pub name: String,
}

impl ShowCommand {
    pub async fn execute<P: SiteProbe>(self, manager: &SiteManager<P>) -> Result<()> {
        let text = manager.show(&self.name).await?;
        print!("{text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_site() {
        let ready = SiteSummary {
            name: "site1".to_string(),
            status: SiteStatus::Ready,
            modified: None,
        };
        let line = format_site(&ready);
        assert!(line.contains("site1"));
        assert!(line.contains("ready"));
        assert!(line.ends_with(" -"));

        let incomplete = SiteSummary {
            name: "site2".to_string(),
            status: SiteStatus::Incomplete,
            modified: None,
        };
        assert!(format_site(&incomplete).contains("(INCOMPLETE)"));
    }
}
