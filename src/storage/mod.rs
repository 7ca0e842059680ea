//! Storage domain remapping.
//!
//! The generate playbook lists every storage domain of the primary site under
//! `dr_import_storages`, with the secondary-site fields left as commented
//! examples. The caller supplies [`StorageDescriptor`]s that say where each
//! storage lives on the secondary site; [`remap_document`] matches the two and
//! fills in the secondary fields, dropping every entry that has no descriptor.
//!
//! Matching rules by kind:
//!
//! | kind    | match on                                          |
//! |---------|---------------------------------------------------|
//! | `nfs`   | address and export path (trailing `/` ignored)    |
//! | `fcp`   | storage domain id                                 |
//! | `iscsi` | storage domain id, address, port, shared targets  |

mod entry;
mod remap;

pub use entry::{StorageEntry, format_targets, parse_targets};
pub use remap::{RemapError, RemapReport, RemapWarning, remap_document, remap_entries};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Storage domain transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Nfs,
    Fcp,
    Iscsi,
}

impl StorageKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nfs => "nfs",
            Self::Fcp => "fcp",
            Self::Iscsi => "iscsi",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nfs" => Ok(Self::Nfs),
            "fcp" => Ok(Self::Fcp),
            "iscsi" => Ok(Self::Iscsi),
            other => Err(format!("unsupported storage type '{other}'")),
        }
    }
}

/// Caller-supplied mapping of one primary storage to its secondary location.
///
/// Field names follow the JSON accepted by the generate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    #[serde(rename = "primary_type")]
    pub kind: StorageKind,
    /// When present, must equal `primary_type`
    #[serde(rename = "secondary_type", default, skip_serializing_if = "Option::is_none")]
    pub secondary_kind: Option<StorageKind>,

    /// Restricts the match to the entry with this primary name
    #[serde(default)]
    pub primary_name: String,
    #[serde(default)]
    pub primary_dc: String,
    #[serde(default)]
    pub primary_id: String,
    #[serde(default)]
    pub primary_addr: String,
    #[serde(default)]
    pub primary_path: String,
    #[serde(default)]
    pub primary_port: String,

    #[serde(default)]
    pub secondary_name: String,
    #[serde(default)]
    pub secondary_dc: String,
    #[serde(default)]
    pub secondary_id: String,
    #[serde(default)]
    pub secondary_addr: String,
    #[serde(default)]
    pub secondary_path: String,
    #[serde(default)]
    pub secondary_port: String,

    /// iSCSI targets, primary target name to secondary target name
    #[serde(default)]
    pub targets: BTreeMap<String, String>,

    /// Set once a document entry consumed this descriptor
    #[serde(skip)]
    pub matched: bool,
}

impl StorageDescriptor {
    /// Normalize paths so equivalent descriptors compare equal.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.kind == StorageKind::Nfs {
            self.primary_path = trim_export(&self.primary_path).to_string();
            self.secondary_path = trim_export(&self.secondary_path).to_string();
        }
        self
    }

    /// Identity used for de-duplication.
    fn identity(&self) -> (StorageKind, &str, &str, &str, &str) {
        (self.kind, &self.primary_id, &self.primary_addr, &self.primary_path, &self.primary_port)
    }

    /// Primary-side locator used in warnings: `nfs://addr:path`, `fcp://id`
    /// or `iscsi://addr:port/id`.
    #[must_use]
    pub fn locator(&self) -> String {
        match self.kind {
            StorageKind::Nfs => format!("nfs://{}:{}", self.primary_addr, self.primary_path),
            StorageKind::Fcp => format!("fcp://{}", self.primary_id),
            StorageKind::Iscsi => {
                format!("iscsi://{}:{}/{}", self.primary_addr, self.primary_port, self.primary_id)
            }
        }
    }

    /// Problems that make the descriptor unusable, prefixed with its position.
    #[must_use]
    pub fn problems(&self, position: usize) -> Vec<String> {
        let mut problems = Vec::new();
        let mut require = |value: &str, field: &str| {
            if value.trim().is_empty() {
                problems.push(format!("storage_domains[{position}].{field} is empty"));
            }
        };
        match self.kind {
            StorageKind::Nfs => {
                require(&self.primary_addr, "primary_addr");
                require(&self.primary_path, "primary_path");
            }
            StorageKind::Fcp => require(&self.primary_id, "primary_id"),
            StorageKind::Iscsi => {
                require(&self.primary_id, "primary_id");
                require(&self.primary_addr, "primary_addr");
                require(&self.primary_port, "primary_port");
            }
        }
        if self.kind == StorageKind::Iscsi && self.targets.is_empty() {
            problems.push(format!("storage_domains[{position}].targets is empty"));
        }
        if let Some(secondary) = self.secondary_kind
            && secondary != self.kind
        {
            problems.push(format!(
                "storage_domains[{position}].secondary_type {secondary} differs from primary_type {}",
                self.kind
            ));
        }
        problems
    }
}

/// Strip trailing `/` from an NFS export path, keeping a lone `/`.
#[must_use]
pub fn trim_export(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') { "/" } else { trimmed }
}

/// Normalize and de-duplicate descriptors, keeping first occurrences in
/// order. Duplicate iSCSI descriptors contribute their targets to the first;
/// other duplicates are dropped.
#[must_use]
pub fn dedup_descriptors(descriptors: Vec<StorageDescriptor>) -> Vec<StorageDescriptor> {
    let mut unique: Vec<StorageDescriptor> = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors.into_iter().map(StorageDescriptor::normalized) {
        if let Some(existing) = unique.iter_mut().find(|d| d.identity() == descriptor.identity()) {
            if existing.kind != StorageKind::Iscsi {
                continue;
            }
            for (primary, secondary) in descriptor.targets {
                existing.targets.entry(primary).or_insert(secondary);
            }
            continue;
        }
        unique.push(descriptor);
    }
    unique
}
