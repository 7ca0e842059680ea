use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::site::{Operation, SiteManager, SiteProbe};

/// Arguments shared by `failover`, `failback` and `cleanup`.
#[derive(Args, Debug)]
pub struct OperationCommand {
    /// Site name
    pub name: String,

    /// Do not print the playbook transcript
    #[arg(long)]
    pub no_output: bool,
}

impl OperationCommand {
    pub async fn execute<P: SiteProbe>(self, manager: &SiteManager<P>, operation: Operation) -> Result<()> {
        let output = match operation {
            Operation::Failover => manager.failover(&self.name).await?,
            Operation::Failback => manager.failback(&self.name).await?,
            Operation::Cleanup => manager.cleanup(&self.name).await?,
        };

        if !self.no_output {
            print!("{output}");
        }
        println!("{} {operation} of site '{}'", "Completed".green().bold(), self.name);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Site name
    pub name: String,
}

impl DeleteCommand {
    pub async fn execute<P: SiteProbe>(self, manager: &SiteManager<P>) -> Result<()> {
        manager.delete(&self.name).await?;
        println!("{} site '{}'", "Deleted".green().bold(), self.name);
        Ok(())
    }
}
