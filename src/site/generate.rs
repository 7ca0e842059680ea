//! The generate pipeline.
//!
//! Stage the template into the site directory, fetch both CA certificates,
//! check credentials against both engines, write the password file, run the
//! generate playbook and turn its raw mapping into the final document.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::failback::derive_failback;
use super::lock::OperationGuard;
use super::playbook::PlaybookCommand;
use super::probe::SiteProbe;
use super::request::GenerationRequest;
use super::{blocking, read_text};
use crate::config::ControllerConfig;
use crate::constants::STORAGES_HEADER;
use crate::core::{DrError, Result};
use crate::document::{Directive, Document};
use crate::storage::{RemapReport, RemapWarning, remap_document};
use crate::utils;

pub const SECONDARY_URL: &str = "dr_sites_secondary_url";
pub const SECONDARY_USERNAME: &str = "dr_sites_secondary_username";
pub const SECONDARY_CA_FILE: &str = "dr_sites_secondary_ca_file";

const GENERATE_LOG: &str = "generate.log";

/// Outcome of a successful generate.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub name: String,
    /// Final mapping document
    pub document: PathBuf,
    pub matched: usize,
    pub messages: Vec<String>,
    pub warnings: Vec<RemapWarning>,
    /// Flat fields of each kept storage entry
    pub storages: Vec<std::collections::BTreeMap<String, String>>,
    /// Playbook transcript, preceded by the remap messages and warnings
    pub output: String,
}

/// Turn the raw playbook mapping into the final document text.
///
/// Storage entries are remapped, the secondary site fields are filled from
/// the request, operator overrides are applied and every remaining example
/// value is enabled.
pub fn render_site_document(
    raw: &str,
    source: &Path,
    request: &GenerationRequest,
    secondary_ca: &Path,
    overrides: &[Directive],
) -> Result<(String, RemapReport)> {
    let mut doc = Document::parse(raw).map_err(|source_err| DrError::Parse {
        path: source.display().to_string(),
        source: source_err,
    })?;

    let report = remap_document(&mut doc, request.storage_domains.clone())?;

    let site = [
        Directive::set(SECONDARY_URL, request.secondary_url.clone()),
        Directive::set(SECONDARY_USERNAME, request.secondary_username.clone()),
        Directive::set(SECONDARY_CA_FILE, secondary_ca.display().to_string()),
    ];
    doc.rewrite(&site);
    let changed = doc.rewrite(overrides);
    let activated = doc.activate_examples();
    debug!(target: "site::generate", changed, activated, "document rewritten");

    Ok((doc.render(), report))
}

/// Prefix the playbook transcript with the remap block.
fn with_storage_block(report: &RemapReport, output: &str) -> String {
    let block = report.transcript();
    if block.is_empty() {
        return output.to_string();
    }
    format!("{STORAGES_HEADER}\n{block}\n\n{output}")
}

pub(super) async fn run<P: SiteProbe>(
    config: Arc<ControllerConfig>,
    probe: Arc<P>,
    name: String,
    request: GenerationRequest,
    guard: OperationGuard,
) -> Result<GenerateReport> {
    let _guard = guard;
    let site_dir = config.site_dir(&name);
    let template = config.template_dir();

    let exists = tokio::fs::try_exists(&site_dir)
        .await
        .map_err(|e| DrError::fs("check site directory", &site_dir, &e))?;
    if exists {
        return Err(DrError::AlreadyExists {
            name,
        });
    }
    if !tokio::fs::metadata(&template).await.is_ok_and(|m| m.is_dir()) {
        return Err(DrError::TemplateMissing {
            path: template.display().to_string(),
        });
    }

    {
        let (src, dst) = (template.clone(), site_dir.clone());
        blocking("copy template", move || utils::copy_dir(&src, &dst)).await?;
    }
    debug!(target: "site::generate", site = %name, "template staged");

    let primary_ca = site_dir.join(&config.files.primary_ca);
    let secondary_ca = site_dir.join(&config.files.secondary_ca);
    probe.fetch_ca(&request.primary_url, &primary_ca).await?;
    probe
        .check_access(&request.primary_url, &request.primary_username, &request.primary_password, &primary_ca)
        .await?;
    probe.fetch_ca(&request.secondary_url, &secondary_ca).await?;
    probe
        .check_access(&request.secondary_url, &request.secondary_username, &request.secondary_password, &secondary_ca)
        .await?;
    debug!(target: "site::generate", site = %name, "both engines reachable");

    {
        let path = site_dir.join(&config.files.passwords);
        let content = request.password_file();
        blocking("write password file", move || utils::write_private(&path, content.as_bytes())).await?;
    }

    let raw_vars = site_dir.join(&config.files.raw_vars);
    let playbook = PlaybookCommand::new(config.binary.clone(), site_dir.join(&config.playbooks.generate), config.tags.generate.clone())
        .extra_var("site", request.primary_url.clone())
        .extra_var("username", request.primary_username.clone())
        .extra_var("password", request.primary_password.clone())
        .extra_var("ca", primary_ca.display().to_string())
        .extra_var("var_file", raw_vars.display().to_string())
        .verbosity(config.verbosity.clone())
        .current_dir(&site_dir)
        .log_file(site_dir.join(GENERATE_LOG))
        .with_timeout(config.playbook_timeout())
        .secrets(request.secrets());
    let output = playbook.execute().await?.output;

    let finish = async {
        let produced = tokio::fs::try_exists(&raw_vars)
            .await
            .map_err(|e| DrError::fs("check generated mapping", &raw_vars, &e))?;
        if !produced {
            return Err(DrError::MissingOutput {
                path: raw_vars.display().to_string(),
            });
        }

        let failover = read_text(&site_dir.join(&config.playbooks.failover)).await?;
        let failback_path = site_dir.join(&config.playbooks.failback);
        let failback = derive_failback(&failover);
        blocking("write failback playbook", move || utils::atomic_write(&failback_path, failback.as_bytes()))
            .await?;

        let raw = read_text(&raw_vars).await?;
        let (document, report) =
            render_site_document(&raw, &raw_vars, &request, &secondary_ca, &config.overrides())?;

        let document_path = site_dir.join(&config.files.vars);
        let target = document_path.clone();
        blocking("write mapping document", move || utils::atomic_write(&target, document.as_bytes())).await?;
        Ok((document_path, report))
    };

    let (document, report) = finish.await.map_err(|source| DrError::GenerateFailed {
        output: output.clone(),
        source: Box::new(source),
    })?;

    info!(target: "site::generate", site = %name, matched = report.matched, warnings = report.warnings.len(), "site generated");
    Ok(GenerateReport {
        name,
        document,
        matched: report.matched,
        output: with_storage_block(&report, &output),
        messages: report.messages,
        warnings: report.warnings,
        storages: report.storages,
    })
}
