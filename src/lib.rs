//! dr-controller - disaster recovery site controller for oVirt
//!
//! Prepares and drives disaster recovery between a primary and a secondary
//! oVirt engine. For each named site the controller stages a playbook
//! template, has the generate playbook describe the primary site, remaps the
//! described storage domains onto their secondary locations and writes the
//! final mapping document consumed by the failover, failback and cleanup
//! playbooks.
//!
//! # Architecture Overview
//!
//! - [`document`] - line-oriented model of the indentation-structured mapping
//!   documents, with path-addressed rewrites that preserve comments and
//!   layout
//! - [`storage`] - storage domain descriptors and the remap engine that
//!   matches them against the `dr_import_storages` list
//! - [`site`] - [`SiteManager`](site::SiteManager), which generates sites and
//!   runs their playbooks under a process-wide lock and a per-site file lock
//! - [`config`] - store root, runner binary, timeouts and playbook registry
//! - [`core`] - error taxonomy and user-facing error context
//! - [`cli`] - command-line front end
//!
//! # Example
//!
//! ```rust,no_run
//! use dr_controller::config::ControllerConfig;
//! use dr_controller::site::{GenerationRequest, SiteManager};
//!
//! # async fn example(request: GenerationRequest) -> anyhow::Result<()> {
//! let config = ControllerConfig::load(None).await?;
//! let manager = SiteManager::new(config);
//!
//! let report = manager.generate("site1", request).await?;
//! println!("{} storage domains mapped", report.matched);
//!
//! let transcript = manager.failover("site1").await?;
//! print!("{transcript}");
//! # Ok(())
//! # }
//! ```
//!
//! # Site Store
//!
//! ```text
//! /var/lib/dr-controller/ovirt/
//! ├── template/          playbooks copied into every new site
//! ├── site1/             one directory per generated site
//! └── site1.lock         sidecar lock held during operations
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod document;
pub mod site;
pub mod storage;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
