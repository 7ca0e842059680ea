//! Generate requests used across the integration suite.

#![allow(dead_code)]

use dr_controller::site::GenerationRequest;
use serde_json::{Value, json};

pub const PRIMARY_URL: &str = "https://manager1.example.com/ovirt-engine/api";
pub const SECONDARY_URL: &str = "https://manager2.example.com/ovirt-engine/api";
pub const PRIMARY_PASSWORD: &str = "primary-secret";
pub const SECONDARY_PASSWORD: &str = "secondary-secret";

/// Builder for generate requests, starting from valid credentials and no
/// storage domains.
pub struct RequestFixture {
    value: Value,
}

impl RequestFixture {
    pub fn new() -> Self {
        Self {
            value: json!({
                "site_primary_url": PRIMARY_URL,
                "site_primary_username": "admin@internal",
                "site_primary_password": PRIMARY_PASSWORD,
                "site_secondary_url": SECONDARY_URL,
                "site_secondary_username": "admin@internal",
                "site_secondary_password": SECONDARY_PASSWORD,
                "storage_domains": []
            }),
        }
    }

    pub fn storage(mut self, descriptor: Value) -> Self {
        if let Some(list) = self.value["storage_domains"].as_array_mut() {
            list.push(descriptor);
        }
        self
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.value[key] = Value::String(value.to_string());
        self
    }

    pub fn build(self) -> GenerationRequest {
        serde_json::from_value(self.value).expect("valid request fixture")
    }

    pub fn json(&self) -> String {
        self.value.to_string()
    }
}

/// NFS domain of the generated mapping, moved to 10.1.1.3.
pub fn nfs_storage() -> Value {
    json!({
        "primary_type": "nfs", "primary_addr": "10.1.1.2", "primary_path": "/nfs_dom_dr/",
        "secondary_type": "nfs", "secondary_addr": "10.1.1.3", "secondary_path": "/nfs_dom_dr2/"
    })
}

pub fn fcp_storage() -> Value {
    json!({
        "primary_type": "fcp", "primary_id": "2b8d8c8a-5f0e-4f6b-9a53-3d7c0f1e2a44",
        "secondary_type": "fcp", "secondary_name": "fcp_dom_dr", "secondary_dc": "DR"
    })
}

/// iSCSI domain with only its first target mapped.
pub fn iscsi_storage() -> Value {
    json!({
        "primary_type": "iscsi", "primary_id": "6e1c4cc1-2a8e-4b3e-9c3c-7e2b4b9d8f10",
        "primary_addr": "10.1.1.5", "primary_port": "3260",
        "secondary_addr": "10.2.1.5", "secondary_port": "3260",
        "targets": {"iqn.2006-01.com.openfiler:olvm-data1": "iqn.2006-02.com.openfiler:olvm-data1-dr"}
    })
}
