//! Controller configuration.
//!
//! Settings are read from a TOML file (by default
//! `<config dir>/dr-controller/config.toml`), with every field optional:
//!
//! ```toml
//! store_dir = "/var/lib/dr-controller/ovirt"
//! binary = "ansible-playbook"
//! playbook_timeout_secs = 600
//!
//! [tags]
//! failover = "fail_over"
//!
//! [generate]
//! overrides = ["dr_lun_mappings=~"]
//! ```
//!
//! After the file, `DR_CONTROLLER_STORE_DIR` and `DR_CONTROLLER_BINARY`
//! override the corresponding fields. The resulting [`ControllerConfig`] is
//! passed into [`SiteManager`](crate::site::SiteManager) explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    DEFAULT_BINARY, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PLAYBOOK_TIMEOUT_SECS, DEFAULT_VERBOSITY,
    ENV_BINARY, ENV_STORE_DIR, TEMPLATE_NAME,
};
use crate::core::DrError;
use crate::document::Directive;

/// Playbook file names inside a site directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookNames {
    pub generate: String,
    pub failover: String,
    pub failback: String,
}

impl Default for PlaybookNames {
    fn default() -> Self {
        Self {
            generate: "dr_generate.yml".to_string(),
            failover: "dr_failover.yml".to_string(),
            failback: "dr_failback.yml".to_string(),
        }
    }
}

/// Tags passed to the playbook runner with `-t`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookTags {
    pub generate: String,
    pub failover: String,
    pub failback: String,
    pub cleanup: String,
}

impl Default for PlaybookTags {
    fn default() -> Self {
        Self {
            generate: "generate_mapping".to_string(),
            failover: "fail_over".to_string(),
            failback: "fail_back".to_string(),
            cleanup: "clean_engine".to_string(),
        }
    }
}

/// File names inside a site directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteFiles {
    /// Final mapping document
    pub vars: String,
    /// Mapping written by the generate playbook
    pub raw_vars: String,
    /// Credentials file, mode 0600
    pub passwords: String,
    pub primary_ca: String,
    pub secondary_ca: String,
}

impl Default for SiteFiles {
    fn default() -> Self {
        Self {
            vars: "disaster_recovery_vars.yml".to_string(),
            raw_vars: "disaster_recovery_vars.yml.tpl".to_string(),
            passwords: "ovirt_passwords.yml".to_string(),
            primary_ca: "primary.ca".to_string(),
            secondary_ca: "secondary.ca".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateSettings {
    /// `path=value` rewrites applied to every generated document
    pub overrides: Vec<String>,
    /// Accept invalid TLS certificates when checking site credentials
    pub insecure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Root holding the template and one directory per site
    pub store_dir: PathBuf,
    /// Playbook runner, a name looked up in `PATH` or an absolute path
    pub binary: String,
    /// Verbosity flag appended to every playbook run
    pub verbosity: String,
    pub playbook_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub playbooks: PlaybookNames,
    pub tags: PlaybookTags,
    pub files: SiteFiles,
    pub generate: GenerateSettings,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            binary: DEFAULT_BINARY.to_string(),
            verbosity: DEFAULT_VERBOSITY.to_string(),
            playbook_timeout_secs: DEFAULT_PLAYBOOK_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            playbooks: PlaybookNames::default(),
            tags: PlaybookTags::default(),
            files: SiteFiles::default(),
            generate: GenerateSettings::default(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("/var/lib/dr-controller/ovirt")
}

impl ControllerConfig {
    /// Config with the given store root and defaults elsewhere.
    #[must_use]
    pub fn with_store_dir(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            ..Self::default()
        }
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// `None`. A missing default file yields the defaults; a missing explicit
    /// file is an error. Environment overrides are applied last.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path).await?,
            None => match Self::default_path() {
                Ok(path) if path.exists() => Self::load_from(&path).await?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.store_dir = expand_path(&config.store_dir);
        Ok(config)
    }

    /// `<config dir>/dr-controller/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?;
        Ok(dir.join("dr-controller").join("config.toml"))
    }

    /// Apply `DR_CONTROLLER_STORE_DIR` and `DR_CONTROLLER_BINARY`.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_STORE_DIR)
            && !dir.trim().is_empty()
        {
            self.store_dir = expand_path(Path::new(dir.trim()));
        }
        if let Ok(binary) = std::env::var(ENV_BINARY)
            && !binary.trim().is_empty()
        {
            self.binary = binary.trim().to_string();
        }
    }

    /// Reject settings that would only fail later, mid-operation.
    pub fn validate(&self) -> Result<(), DrError> {
        let mut problems = Vec::new();
        if self.binary.trim().is_empty() {
            problems.push("binary is empty".to_string());
        }
        if self.playbook_timeout_secs == 0 {
            problems.push("playbook_timeout_secs must be positive".to_string());
        }
        if self.http_timeout_secs == 0 {
            problems.push("http_timeout_secs must be positive".to_string());
        }
        for text in &self.generate.overrides {
            if Directive::parse(text).is_none() {
                problems.push(format!("generate.overrides entry '{text}' is not path=value"));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DrError::Config {
                message: problems.join(", "),
            })
        }
    }

    #[must_use]
    pub fn site_dir(&self, name: &str) -> PathBuf {
        self.store_dir.join(name)
    }

    #[must_use]
    pub fn template_dir(&self) -> PathBuf {
        self.store_dir.join(TEMPLATE_NAME)
    }

    #[must_use]
    pub const fn playbook_timeout(&self) -> Duration {
        Duration::from_secs(self.playbook_timeout_secs)
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Parsed operator overrides; entries rejected by `validate` are skipped.
    #[must_use]
    pub fn overrides(&self) -> Vec<Directive> {
        self.generate.overrides.iter().filter_map(|text| Directive::parse(text)).collect()
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match shellexpand::full(&text) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}
