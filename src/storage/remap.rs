use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use super::entry::StorageEntry;
use super::{StorageDescriptor, StorageKind, dedup_descriptors};
use crate::document::{Document, Node};

/// Root key of the storage list in the mapping document.
pub const STORAGES_KEY: &str = "dr_import_storages";

/// Non-fatal remap outcome reported next to a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemapWarning {
    /// No document entry consumed this descriptor
    UnusedDescriptor {
        locator: String,
    },
    /// No descriptor matched this entry; it was dropped
    UnmatchedEntry {
        name: String,
        storage_type: String,
    },
    /// The entry is malformed for its type; it was dropped
    InvalidEntry {
        name: String,
        reason: String,
    },
}

impl fmt::Display for RemapWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnusedDescriptor {
                locator,
            } => write!(f, "storage map {locator} not used"),
            Self::UnmatchedEntry {
                name,
                storage_type,
            } => write!(f, "storage map for {name} ({storage_type}) not found"),
            Self::InvalidEntry {
                reason,
                ..
            } => f.write_str(reason),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum RemapError {
    /// No entry survived remapping
    #[error("dr_import_storages remap result empty")]
    EmptyResult {
        /// Warnings collected while trying
        warnings: Vec<RemapWarning>,
    },
}

/// Result of a successful remap.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemapReport {
    pub matched: usize,
    /// One line per remapped entry
    pub messages: Vec<String>,
    pub warnings: Vec<RemapWarning>,
    /// Scalar fields of each kept entry after remapping
    pub storages: Vec<BTreeMap<String, String>>,
}

impl RemapReport {
    /// Messages followed by warnings, one per line.
    #[must_use]
    pub fn transcript(&self) -> String {
        let mut lines: Vec<String> = self.messages.clone();
        lines.extend(self.warnings.iter().map(ToString::to_string));
        lines.join("\n")
    }
}

/// De-duplicate `descriptors` and remap the storage list of `doc`.
pub fn remap_document(
    doc: &mut Document,
    descriptors: Vec<StorageDescriptor>,
) -> Result<RemapReport, RemapError> {
    let mut descriptors = dedup_descriptors(descriptors);
    match doc.get_mut(STORAGES_KEY) {
        Some(list) => remap_entries(list, &mut descriptors),
        None => Err(RemapError::EmptyResult {
            warnings: unused(&descriptors),
        }),
    }
}

/// Match every entry of the `dr_import_storages` list against
/// `descriptors`.
///
/// Matched entries get their secondary fields written; every other entry is
/// marked deleted. Descriptors are flagged `matched` as they are consumed.
pub fn remap_entries(
    list: &mut Node,
    descriptors: &mut [StorageDescriptor],
) -> Result<RemapReport, RemapError> {
    let mut report = RemapReport::default();

    for node in list.elements_mut() {
        if node.deleted {
            continue;
        }
        let entry = StorageEntry::from_node(node);

        let kind = match entry.kind.parse::<StorageKind>() {
            Ok(kind) => kind,
            Err(reason) => {
                report.warnings.push(RemapWarning::InvalidEntry {
                    name: entry.name().to_string(),
                    reason: format!("storage for {}: {reason}", entry.name()),
                });
                node.deleted = true;
                continue;
            }
        };

        let problems = entry.problems(kind);
        if !problems.is_empty() {
            report.warnings.extend(problems.into_iter().map(|reason| RemapWarning::InvalidEntry {
                name: entry.name().to_string(),
                reason,
            }));
            node.deleted = true;
            continue;
        }

        let found = descriptors
            .iter_mut()
            .find_map(|descriptor| entry.remap_with(kind, descriptor).map(|mapped| (descriptor, mapped)));

        let Some((descriptor, mapped)) = found else {
            report.warnings.push(RemapWarning::UnmatchedEntry {
                name: entry.name().to_string(),
                storage_type: kind.to_string(),
            });
            node.deleted = true;
            continue;
        };

        descriptor.matched = true;
        mapped.write_to(kind, node);
        let message = format!(
            "storage {} remapped with name {} as {}",
            mapped.primary_name,
            mapped.secondary_name,
            mapped.locator(kind)
        );
        debug!(target: "storage::remap", "{message}");
        report.messages.push(message);
        report.storages.push(summary(node));
        report.matched += 1;
    }

    report.warnings.extend(unused(descriptors));
    for warning in &report.warnings {
        warn!(target: "storage::remap", "{warning}");
    }

    if report.matched == 0 {
        return Err(RemapError::EmptyResult {
            warnings: report.warnings,
        });
    }
    Ok(report)
}

fn unused(descriptors: &[StorageDescriptor]) -> Vec<RemapWarning> {
    descriptors
        .iter()
        .filter(|d| !d.matched)
        .map(|d| RemapWarning::UnusedDescriptor {
            locator: d.locator(),
        })
        .collect()
}

fn summary(node: &Node) -> BTreeMap<String, String> {
    node.elements()
        .filter(|n| !n.deleted)
        .filter_map(|n| n.as_scalar().map(|v| (n.key.clone(), v.to_string())))
        .collect()
}
