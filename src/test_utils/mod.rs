//! Test utilities for the DR controller
//!
//! Helpers shared by unit tests and the integration suite:
//!
//! - [`init_test_logging`] installs a test-writer subscriber once
//! - [`StaticProbe`] stands in for the engines during generate
//! - [`fake_runner`] and [`stage_template`] provide a playbook runner and a
//!   site template without Ansible installed (unix only)
//!
//! # Example
//!
//! ```rust,no_run
//! use dr_controller::config::ControllerConfig;
//! use dr_controller::site::SiteManager;
//! use dr_controller::test_utils::{StaticProbe, fake_runner, stage_template, fixtures};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = tempfile::TempDir::new()?;
//! stage_template(store.path(), fixtures::GENERATED_VARS);
//! let mut config = ControllerConfig::with_store_dir(store.path());
//! config.binary = fake_runner().display().to_string();
//! let manager = SiteManager::with_probe(config, StaticProbe::new());
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::{DrError, Result};
use crate::site::{GenerationRequest, SiteProbe};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` when set, otherwise stays
/// silent. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=site=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// [`SiteProbe`] that writes a fixed CA and accepts every login except
/// those to a denied URL. Calls are recorded in order.
#[derive(Debug, Default)]
pub struct StaticProbe {
    deny: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject logins to `url`.
    pub fn denying(url: impl Into<String>) -> Self {
        Self {
            deny: Some(url.into()),
            ..Self::default()
        }
    }

    /// Recorded calls, e.g. `ca https://...` and `access https://... admin`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl SiteProbe for StaticProbe {
    async fn fetch_ca(&self, site_url: &str, dest: &Path) -> Result<()> {
        self.record(format!("ca {site_url}"));
        tokio::fs::write(dest, fixtures::CA_PEM).await.map_err(|e| DrError::fs("write CA certificate", dest, &e))
    }

    async fn check_access(&self, site_url: &str, username: &str, _password: &str, ca_file: &Path) -> Result<()> {
        self.record(format!("access {site_url} {username}"));
        if !ca_file.exists() {
            return Err(DrError::Connectivity {
                url: site_url.to_string(),
                reason: "CA file missing".to_string(),
            });
        }
        if self.deny.as_deref() == Some(site_url) {
            return Err(DrError::Connectivity {
                url: site_url.to_string(),
                reason: "HTTP 401 Unauthorized".to_string(),
            });
        }
        Ok(())
    }
}

/// A complete, valid generate request matching the NFS storage of
/// [`fixtures::GENERATED_VARS`].
pub fn sample_request() -> GenerationRequest {
    serde_json::from_value(serde_json::json!({
        "site_primary_url": "https://manager1.example.com/ovirt-engine/api",
        "site_primary_username": "admin@internal",
        "site_primary_password": "primary-secret",
        "site_secondary_url": "https://manager2.example.com/ovirt-engine/api",
        "site_secondary_username": "admin@internal",
        "site_secondary_password": "secondary-secret",
        "storage_domains": [{
            "primary_type": "nfs", "primary_addr": "10.1.1.2", "primary_path": "/nfs_dom_dr/",
            "secondary_type": "nfs", "secondary_addr": "10.1.1.3", "secondary_path": "/nfs_dom_dr2/"
        }]
    }))
    .unwrap_or_default()
}

/// Body of the fake runner.
///
/// Called as `<runner> <playbook> -t <tag> [-e k=v ...] -vvvvv`, it prints
/// one `PLAYBOOK <file> <args>` line, exports the tag as `DR_TAG` and every
/// extra var as `DR_VAR_<key>`, then sources `<playbook>.sh` when present.
/// Behavior scripts are sourced rather than executed, so tests never exec a
/// file they just wrote.
const RUNNER: &str = r#"#!/bin/sh
playbook="$1"
shift
echo "PLAYBOOK $(basename "$playbook") $*"
prev=""
for arg in "$@"; do
  if [ "$prev" = "-t" ]; then
    DR_TAG="$arg"
  elif [ "$prev" = "-e" ]; then
    export "DR_VAR_${arg%%=*}=${arg#*=}"
  fi
  prev="$arg"
done
export DR_TAG
if [ -f "$playbook.sh" ]; then
  . "$playbook.sh"
fi
"#;

/// Path of the fake playbook runner, written once per test process.
#[cfg(unix)]
pub fn fake_runner() -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    use std::sync::OnceLock;

    static RUNNER_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
    let dir = RUNNER_DIR.get_or_init(|| {
        let dir = tempfile::TempDir::new().expect("create runner dir");
        let path = dir.path().join("fake-ansible-playbook");
        std::fs::write(&path, RUNNER).expect("write runner");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod runner");
        dir
    });
    dir.path().join("fake-ansible-playbook")
}

/// Write a playbook file and the shell snippet the fake runner sources for
/// it.
pub fn write_playbook(dir: &Path, name: &str, content: &str, behavior: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write playbook");
    std::fs::write(dir.join(format!("{name}.sh")), behavior).expect("write playbook behavior");
    path
}

/// Create `<store>/template` whose generate playbook writes `mapping` to the
/// requested `var_file`, and whose failover/failback playbooks print their
/// tag.
pub fn stage_template(store: &Path, mapping: &str) -> PathBuf {
    let template = store.join(crate::constants::TEMPLATE_NAME);
    std::fs::create_dir_all(&template).expect("create template");
    std::fs::write(template.join("mapping.fixture"), mapping).expect("write mapping fixture");
    write_playbook(
        &template,
        "dr_generate.yml",
        fixtures::GENERATE_PLAYBOOK,
        "cp mapping.fixture \"$DR_VAR_var_file\"\necho \"generated $DR_VAR_var_file\"\n",
    );
    write_playbook(&template, "dr_failover.yml", fixtures::FAILOVER_PLAYBOOK, "echo \"ran $DR_TAG\"\n");
    std::fs::write(template.join("dr_failback.yml.sh"), "echo \"ran $DR_TAG\"\n").expect("write failback behavior");
    template
}

/// Replace the behavior of a playbook already staged in `dir`.
pub fn set_behavior(dir: &Path, playbook: &str, behavior: &str) {
    std::fs::write(dir.join(format!("{playbook}.sh")), behavior).expect("write playbook behavior");
}
