//! Flat view of one `dr_import_storages` entry.

use super::{StorageDescriptor, StorageKind, trim_export};
use crate::document::{Node, NodeKind};

pub const DOMAIN_TYPE: &str = "dr_domain_type";
pub const DOMAIN_ID: &str = "dr_domain_id";
pub const PRIMARY_NAME: &str = "dr_primary_name";
pub const PRIMARY_DC: &str = "dr_primary_dc_name";
pub const PRIMARY_ADDRESS: &str = "dr_primary_address";
pub const PRIMARY_PATH: &str = "dr_primary_path";
pub const PRIMARY_PORT: &str = "dr_primary_port";
pub const PRIMARY_TARGET: &str = "dr_primary_target";
pub const SECONDARY_NAME: &str = "dr_secondary_name";
pub const SECONDARY_DC: &str = "dr_secondary_dc_name";
pub const SECONDARY_ADDRESS: &str = "dr_secondary_address";
pub const SECONDARY_PATH: &str = "dr_secondary_path";
pub const SECONDARY_PORT: &str = "dr_secondary_port";
pub const SECONDARY_TARGET: &str = "dr_secondary_target";

/// Fields of a storage entry that take part in remapping.
///
/// Secondary fields start out as the commented examples the generator wrote,
/// which are copies of the primary values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageEntry {
    /// Raw `dr_domain_type` text
    pub kind: String,
    pub domain_id: String,
    pub primary_name: String,
    pub primary_dc: String,
    pub primary_addr: String,
    pub primary_path: String,
    pub primary_port: String,
    pub primary_targets: Vec<String>,
    pub secondary_name: String,
    pub secondary_dc: String,
    pub secondary_addr: String,
    pub secondary_path: String,
    pub secondary_port: String,
    pub secondary_targets: Vec<String>,
}

impl StorageEntry {
    /// Read the entry fields from a list item of `dr_import_storages`.
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        let text = |key: &str| node.scalar(key).unwrap_or_default().trim().to_string();
        let targets = |key: &str| -> Vec<String> {
            match node.get(key) {
                Some(n) if n.kind() == NodeKind::List => {
                    n.elements().filter_map(Node::as_scalar).map(unquote).collect()
                }
                Some(n) => n.as_scalar().map(parse_targets).unwrap_or_default(),
                None => Vec::new(),
            }
        };

        Self {
            kind: text(DOMAIN_TYPE),
            domain_id: text(DOMAIN_ID),
            primary_name: text(PRIMARY_NAME),
            primary_dc: text(PRIMARY_DC),
            primary_addr: text(PRIMARY_ADDRESS),
            primary_path: text(PRIMARY_PATH),
            primary_port: text(PRIMARY_PORT),
            primary_targets: targets(PRIMARY_TARGET),
            secondary_name: text(SECONDARY_NAME),
            secondary_dc: text(SECONDARY_DC),
            secondary_addr: text(SECONDARY_ADDRESS),
            secondary_path: text(SECONDARY_PATH),
            secondary_port: text(SECONDARY_PORT),
            secondary_targets: targets(SECONDARY_TARGET),
        }
    }

    /// Display name used in messages.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.primary_name.is_empty() { "<unnamed>" } else { &self.primary_name }
    }

    /// Problems that make this entry unusable for remapping.
    #[must_use]
    pub fn problems(&self, kind: StorageKind) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check = |present: bool, required: bool, what: &str| {
            if required && !present {
                problems.push(format!("storage for {} without {what}", self.name()));
            } else if !required && present {
                problems.push(format!("storage for {} can't contain {what}", self.name()));
            }
        };

        let has_id = !self.domain_id.is_empty();
        let has_addr = !self.primary_addr.is_empty();
        let has_path = !self.primary_path.is_empty();
        let has_port = !self.primary_port.is_empty();
        match kind {
            StorageKind::Nfs => {
                check(has_addr, true, "primary address");
                check(has_path, true, "primary path");
                check(has_id, false, "primary id");
                check(has_port, false, "primary port");
            }
            StorageKind::Fcp => {
                check(has_id, true, "primary id");
                check(has_addr, false, "primary address");
                check(has_path, false, "primary path");
                check(has_port, false, "primary port");
            }
            StorageKind::Iscsi => {
                check(has_id, true, "primary id");
                check(has_addr, true, "primary address");
                check(has_port, true, "primary port");
                check(has_path, false, "primary path");
            }
        }
        problems
    }

    /// Try to match `descriptor`; on success return the entry with its
    /// secondary fields filled in.
    #[must_use]
    pub fn remap_with(&self, kind: StorageKind, descriptor: &StorageDescriptor) -> Option<Self> {
        if descriptor.kind != kind {
            return None;
        }
        if !descriptor.primary_name.is_empty() && descriptor.primary_name != self.primary_name {
            return None;
        }

        let mut mapped = self.clone();
        match kind {
            StorageKind::Nfs => {
                if descriptor.primary_addr != self.primary_addr
                    || trim_export(&descriptor.primary_path) != trim_export(&self.primary_path)
                {
                    return None;
                }
                mapped.primary_path = trim_export(&self.primary_path).to_string();
                if !descriptor.secondary_addr.is_empty() {
                    mapped.secondary_addr.clone_from(&descriptor.secondary_addr);
                }
                let secondary_path = if descriptor.secondary_path.is_empty() {
                    &self.secondary_path
                } else {
                    &descriptor.secondary_path
                };
                mapped.secondary_path = trim_export(secondary_path).to_string();
            }
            StorageKind::Fcp => {
                if descriptor.primary_id != self.domain_id {
                    return None;
                }
                if !descriptor.secondary_id.is_empty() && descriptor.secondary_id != descriptor.primary_id {
                    return None;
                }
            }
            StorageKind::Iscsi => {
                if descriptor.primary_id != self.domain_id
                    || descriptor.primary_addr != self.primary_addr
                    || descriptor.primary_port != self.primary_port
                {
                    return None;
                }
                let (kept, secondary): (Vec<String>, Vec<String>) = self
                    .primary_targets
                    .iter()
                    .filter_map(|t| descriptor.targets.get(t).map(|s| (t.clone(), s.clone())))
                    .unzip();
                if kept.is_empty() {
                    return None;
                }
                mapped.primary_targets = kept;
                mapped.secondary_targets = secondary;
                if !descriptor.secondary_addr.is_empty() {
                    mapped.secondary_addr.clone_from(&descriptor.secondary_addr);
                }
                if !descriptor.secondary_port.is_empty() {
                    mapped.secondary_port.clone_from(&descriptor.secondary_port);
                }
            }
        }

        if !descriptor.secondary_name.is_empty() {
            mapped.secondary_name.clone_from(&descriptor.secondary_name);
        } else if !descriptor.primary_name.is_empty() {
            mapped.secondary_name.clone_from(&descriptor.primary_name);
        }
        if !descriptor.secondary_dc.is_empty() {
            mapped.secondary_dc.clone_from(&descriptor.secondary_dc);
        } else if !descriptor.primary_dc.is_empty() {
            mapped.secondary_dc.clone_from(&self.primary_dc);
        }

        Some(mapped)
    }

    /// Secondary-site location, e.g. `nfs://10.1.1.2:/export`.
    #[must_use]
    pub fn locator(&self, kind: StorageKind) -> String {
        match kind {
            StorageKind::Nfs => format!("nfs://{}:{}", self.secondary_addr, self.secondary_path),
            StorageKind::Fcp => format!("fcp://{}", self.domain_id),
            StorageKind::Iscsi => format!(
                "iscsi://{}:{}:{}",
                self.secondary_addr,
                self.secondary_port,
                self.secondary_targets.join(",")
            ),
        }
    }

    /// Write the remapped fields into the entry node, activating the
    /// commented examples they replace.
    pub fn write_to(&self, kind: StorageKind, node: &mut Node) {
        let mut fields: Vec<(&str, String)> = vec![
            (SECONDARY_NAME, self.secondary_name.clone()),
            (SECONDARY_DC, self.secondary_dc.clone()),
        ];
        match kind {
            StorageKind::Nfs => fields.extend([
                (PRIMARY_PATH, self.primary_path.clone()),
                (SECONDARY_ADDRESS, self.secondary_addr.clone()),
                (SECONDARY_PATH, self.secondary_path.clone()),
            ]),
            StorageKind::Fcp => {}
            StorageKind::Iscsi => fields.extend([
                (PRIMARY_TARGET, format_targets(&self.primary_targets)),
                (SECONDARY_ADDRESS, self.secondary_addr.clone()),
                (SECONDARY_PORT, self.secondary_port.clone()),
                (SECONDARY_TARGET, format_targets(&self.secondary_targets)),
            ]),
        }

        for (key, value) in fields {
            if !value.is_empty() {
                node.set(key, value);
            }
        }
    }
}

fn unquote(text: &str) -> String {
    text.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// Parse an inline target list: `["a", "b"]`, `[a, b]` or a single name.
#[must_use]
pub fn parse_targets(text: &str) -> Vec<String> {
    let text = text.trim();
    let inner = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')).unwrap_or(text);
    inner.split(',').map(unquote).filter(|t| !t.is_empty()).collect()
}

/// Render targets in the inline form the playbooks expect.
#[must_use]
pub fn format_targets(targets: &[String]) -> String {
    if targets.is_empty() {
        return "[]".to_string();
    }
    format!("[\"{}\"]", targets.join("\", \""))
}
