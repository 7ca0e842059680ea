//! Site lifecycle.
//!
//! A site is one directory under the store root, named after the site:
//!
//! ```text
//! <store>/
//! ├── template/                 staged into every new site
//! ├── site1/
//! │   ├── primary.ca, secondary.ca
//! │   ├── ovirt_passwords.yml   mode 0600
//! │   ├── dr_generate.yml, dr_failover.yml, dr_failback.yml
//! │   ├── disaster_recovery_vars.yml.tpl   raw playbook output
//! │   ├── disaster_recovery_vars.yml       final mapping
//! │   └── generate.log, failover.log, ...
//! └── site1.lock                sidecar lock
//! ```
//!
//! [`SiteManager`] runs every mutating operation under both locks from
//! [`lock`], on a spawned task whose completion the caller awaits. A panic
//! inside the task surfaces as [`DrError::TaskFailed`] and releases the
//! locks. Nothing is rolled back on failure: a failed generate leaves the
//! staged directory for inspection until it is deleted.

mod failback;
mod generate;
pub mod lock;
mod names;
pub mod playbook;
pub mod probe;
mod request;

pub use failback::derive_failback;
pub use generate::{GenerateReport, render_site_document};
pub use lock::{OperationGuard, ProcessLock, SiteLock};
pub use names::validate_name;
pub use playbook::{PlaybookCommand, PlaybookOutput};
pub use probe::{HttpSiteProbe, SiteProbe, ca_url};
pub use request::GenerationRequest;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::constants::TEMPLATE_NAME;
use crate::core::{DrError, Result};
use crate::utils;

/// Playbook-driven operations on a generated site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Failover,
    Failback,
    Cleanup,
}

impl Operation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Failover => "failover",
            Self::Failback => "failback",
            Self::Cleanup => "cleanup",
        }
    }

    /// Playbook file and tag for this operation. Cleanup runs the failover
    /// playbook with its own tag.
    fn playbook<'a>(&self, config: &'a ControllerConfig) -> (&'a str, &'a str) {
        match self {
            Self::Failover => (&config.playbooks.failover, &config.tags.failover),
            Self::Failback => (&config.playbooks.failback, &config.tags.failback),
            Self::Cleanup => (&config.playbooks.failover, &config.tags.cleanup),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    /// The final mapping document exists
    Ready,
    /// Generate was started but did not complete
    Incomplete,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.pad("ready"),
            Self::Incomplete => f.pad("incomplete"),
        }
    }
}

/// One entry of [`SiteManager::list`].
#[derive(Debug, Clone, Serialize)]
pub struct SiteSummary {
    pub name: String,
    pub status: SiteStatus,
    /// Modification time of the site directory
    pub modified: Option<DateTime<Local>>,
}

/// Generation and lifecycle orchestrator for the sites under one store root.
///
/// Cloning shares the process-wide lock, so all clones exclude each other.
#[derive(Debug)]
pub struct SiteManager<P = HttpSiteProbe> {
    config: Arc<ControllerConfig>,
    probe: Arc<P>,
    process_lock: ProcessLock,
}

impl<P> Clone for SiteManager<P> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            probe: Arc::clone(&self.probe),
            process_lock: self.process_lock.clone(),
        }
    }
}

impl SiteManager<HttpSiteProbe> {
    /// Manager checking engines over HTTP with the configured timeout.
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        let probe = HttpSiteProbe::new(config.http_timeout(), config.generate.insecure);
        Self::with_probe(config, probe)
    }
}

impl<P: SiteProbe> SiteManager<P> {
    pub fn with_probe(config: ControllerConfig, probe: P) -> Self {
        Self {
            config: Arc::new(config),
            probe: Arc::new(probe),
            process_lock: ProcessLock::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[must_use]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    #[must_use]
    pub const fn process_lock(&self) -> &ProcessLock {
        &self.process_lock
    }

    /// Generate the mapping for a new site.
    ///
    /// Name, request and existence are checked before any lock is taken.
    pub async fn generate(&self, name: &str, request: GenerationRequest) -> Result<GenerateReport> {
        validate_name(name)?;
        request.validate()?;
        if self.site_exists(name).await? {
            return Err(DrError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let guard = self.lock(name).await?;
        info!(target: "site", site = %name, "generating site");
        let job = generate::run(
            Arc::clone(&self.config),
            Arc::clone(&self.probe),
            name.to_string(),
            request,
            guard,
        );
        dispatch("generate", job).await
    }

    /// Run the failover playbook; returns its transcript.
    pub async fn failover(&self, name: &str) -> Result<String> {
        self.run_operation(name, Operation::Failover).await
    }

    pub async fn failback(&self, name: &str) -> Result<String> {
        self.run_operation(name, Operation::Failback).await
    }

    /// Run the failover playbook with the cleanup tag.
    pub async fn cleanup(&self, name: &str) -> Result<String> {
        self.run_operation(name, Operation::Cleanup).await
    }

    /// Remove a site directory.
    pub async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let guard = self.lock(name).await?;
        let site_dir = self.config.site_dir(name);
        let site = name.to_string();
        dispatch("delete", async move {
            let _guard = guard;
            blocking("delete site", move || utils::remove_dir_all(&site_dir)).await?;
            info!(target: "site", site = %site, "site deleted");
            Ok(())
        })
        .await
    }

    /// Every site directory under the store root except the template.
    ///
    /// Takes no locks; a site being generated shows as incomplete.
    pub async fn list(&self) -> Result<Vec<SiteSummary>> {
        let store = &self.config.store_dir;
        let mut entries = match tokio::fs::read_dir(store).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DrError::fs("list sites", store, &e)),
        };

        let mut sites = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| DrError::fs("list sites", store, &e))? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if !metadata.is_dir() || name == TEMPLATE_NAME {
                continue;
            }
            let document = entry.path().join(&self.config.files.vars);
            let status = if tokio::fs::try_exists(&document).await.unwrap_or(false) {
                SiteStatus::Ready
            } else {
                SiteStatus::Incomplete
            };
            sites.push(SiteSummary {
                name,
                status,
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
            });
        }
        sites.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sites)
    }

    /// Text of the final mapping document of a site.
    pub async fn show(&self, name: &str) -> Result<String> {
        validate_name(name)?;
        let path = self.config.site_dir(name).join(&self.config.files.vars);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DrError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(DrError::fs("read mapping document", &path, &e)),
        }
    }

    async fn site_exists(&self, name: &str) -> Result<bool> {
        let site_dir = self.config.site_dir(name);
        tokio::fs::try_exists(&site_dir)
            .await
            .map_err(|e| DrError::fs("check site directory", &site_dir, &e))
    }

    async fn lock(&self, name: &str) -> Result<OperationGuard> {
        let guard = OperationGuard::acquire(&self.process_lock, &self.config.store_dir, name).await?;
        debug!(target: "site", site = %name, "locks acquired");
        Ok(guard)
    }

    async fn run_operation(&self, name: &str, operation: Operation) -> Result<String> {
        validate_name(name)?;
        if !self.site_exists(name).await? {
            return Err(DrError::NotFound {
                name: name.to_string(),
            });
        }

        let guard = self.lock(name).await?;
        let site_dir = self.config.site_dir(name);
        let (playbook, tag) = operation.playbook(&self.config);
        let command = PlaybookCommand::new(self.config.binary.clone(), site_dir.join(playbook), tag)
            .verbosity(self.config.verbosity.clone())
            .current_dir(&site_dir)
            .log_file(site_dir.join(format!("{operation}.log")))
            .with_timeout(self.config.playbook_timeout());

        info!(target: "site", site = %name, %operation, "running playbook");
        dispatch(operation.as_str(), async move {
            let _guard = guard;
            command.execute().await.map(|out| out.output)
        })
        .await
    }
}

/// Run `job` on its own task and wait for it.
async fn dispatch<T, F>(operation: &str, job: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(job).await.map_err(|e| DrError::TaskFailed {
        operation: operation.to_string(),
        reason: e.to_string(),
    })?
}

/// Run blocking filesystem work off the async workers.
async fn blocking<T, F>(operation: &str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| DrError::TaskFailed {
        operation: operation.to_string(),
        reason: e.to_string(),
    })?
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| DrError::fs("read", path, &e))
}
