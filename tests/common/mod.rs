//! Shared helpers for the integration suite.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use dr_controller::config::ControllerConfig;
use dr_controller::site::SiteManager;
use dr_controller::test_utils::{StaticProbe, fake_runner, fixtures, init_test_logging, stage_template};

/// A scratch store root with a staged template and the fake playbook runner.
pub struct TestStore {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    root: PathBuf,
    store_dir: PathBuf,
}

impl TestStore {
    /// Store whose generate playbook emits [`fixtures::GENERATED_VARS`].
    pub fn new() -> Result<Self> {
        Self::with_mapping(fixtures::GENERATED_VARS)
    }

    pub fn with_mapping(mapping: &str) -> Result<Self> {
        init_test_logging(None);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        let store_dir = root.join("store");
        std::fs::create_dir_all(&store_dir)?;
        stage_template(&store_dir, mapping);

        Ok(Self {
            _temp_dir: temp_dir,
            root,
            store_dir,
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_dir
    }

    pub fn site_path(&self, name: &str) -> PathBuf {
        self.store_dir.join(name)
    }

    pub fn template_path(&self) -> PathBuf {
        self.store_dir.join("template")
    }

    /// Configuration pointing at this store and the fake runner.
    pub fn config(&self) -> ControllerConfig {
        let mut config = ControllerConfig::with_store_dir(&self.store_dir);
        config.binary = fake_runner().display().to_string();
        config
    }

    pub fn manager(&self) -> SiteManager<StaticProbe> {
        SiteManager::with_probe(self.config(), StaticProbe::new())
    }

    pub fn manager_with(&self, config: ControllerConfig, probe: StaticProbe) -> SiteManager<StaticProbe> {
        SiteManager::with_probe(config, probe)
    }

    /// Write a configuration file for the binary and return its path.
    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        let path = self.root.join("config.toml");
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(path)
    }

    /// Create a site directory directly, as a completed generate leaves it.
    pub fn create_site(&self, name: &str, document: Option<&str>) -> Result<PathBuf> {
        let site = self.site_path(name);
        dr_controller::utils::copy_dir(&self.template_path(), &site)?;
        if let Some(document) = document {
            std::fs::write(site.join("disaster_recovery_vars.yml"), document)?;
        }
        Ok(site)
    }

    /// Run the dr-controller binary against this store.
    pub fn run_dr_controller(&self, args: &[&str]) -> Result<CommandOutput> {
        let config = self.write_config("")?;
        let output = Command::new(env!("CARGO_BIN_EXE_dr-controller"))
            .arg("--config")
            .arg(&config)
            .arg("--store-dir")
            .arg(&self.store_dir)
            .args(args)
            .env("DR_CONTROLLER_BINARY", fake_runner())
            .env_remove("DR_CONTROLLER_STORE_DIR")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .output()
            .context("Failed to run dr-controller")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Command output helper
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Assert the command succeeded
    pub fn assert_success(&self) -> &Self {
        assert!(self.success, "Command failed with code {:?}\nStderr: {}", self.code, self.stderr);
        self
    }

    /// Assert stdout contains the given text
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}

/// File assertion helpers
pub struct FileAssert;

impl FileAssert {
    /// Assert a file exists
    pub fn exists(path: impl AsRef<Path>) {
        let path = path.as_ref();
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert a file does not exist
    pub fn not_exists(path: impl AsRef<Path>) {
        let path = path.as_ref();
        assert!(!path.exists(), "Expected file to not exist: {}", path.display());
    }

    /// Assert a file contains `expected`
    pub fn contains(path: impl AsRef<Path>, expected: &str) {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
        assert!(
            content.contains(expected),
            "Expected {} to contain '{}'\nActual content: {}",
            path.display(),
            expected,
            content
        );
    }

    /// Assert a file does not contain `unexpected`
    pub fn lacks(path: impl AsRef<Path>, unexpected: &str) {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
        assert!(!content.contains(unexpected), "Expected {} not to contain '{}'", path.display(), unexpected);
    }
}
