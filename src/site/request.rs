//! The generate request: engine credentials for both sites plus storage
//! domain mappings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{DrError, Result};
use crate::storage::StorageDescriptor;

const SECURE_SCHEME: &str = "https://";

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(rename = "site_primary_url", default)]
    pub primary_url: String,
    #[serde(rename = "site_primary_username", default)]
    pub primary_username: String,
    #[serde(rename = "site_primary_password", default)]
    pub primary_password: String,
    #[serde(rename = "site_secondary_url", default)]
    pub secondary_url: String,
    #[serde(rename = "site_secondary_username", default)]
    pub secondary_username: String,
    #[serde(rename = "site_secondary_password", default)]
    pub secondary_password: String,
    #[serde(default)]
    pub storage_domains: Vec<StorageDescriptor>,
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("primary_url", &self.primary_url)
            .field("primary_username", &self.primary_username)
            .field("primary_password", &"<redacted>")
            .field("secondary_url", &self.secondary_url)
            .field("secondary_username", &self.secondary_username)
            .field("secondary_password", &"<redacted>")
            .field("storage_domains", &self.storage_domains)
            .finish()
    }
}

impl GenerationRequest {
    /// Collect every violated field, failing with all of them at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for (field, url) in [("site_primary_url", &self.primary_url), ("site_secondary_url", &self.secondary_url)] {
            if url.trim().is_empty() {
                problems.push(format!("{field} is empty"));
            } else if !url.starts_with(SECURE_SCHEME) {
                problems.push(format!("{field} is invalid"));
            }
        }
        for (field, value) in [
            ("site_primary_username", &self.primary_username),
            ("site_primary_password", &self.primary_password),
            ("site_secondary_username", &self.secondary_username),
            ("site_secondary_password", &self.secondary_password),
        ] {
            if value.is_empty() {
                problems.push(format!("{field} is empty"));
            }
        }
        for (position, descriptor) in self.storage_domains.iter().enumerate() {
            problems.extend(descriptor.problems(position));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DrError::Validation {
                problems,
            })
        }
    }

    /// Secrets that must never reach logs.
    pub(crate) fn secrets(&self) -> Vec<String> {
        [&self.primary_password, &self.secondary_password]
            .into_iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect()
    }

    /// Body of the password file read by the playbooks.
    pub(crate) fn password_file(&self) -> String {
        format!(
            "dr_sites_primary_password: {}\ndr_sites_secondary_password: {}\n",
            self.primary_password, self.secondary_password
        )
    }
}
