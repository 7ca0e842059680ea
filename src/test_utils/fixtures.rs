//! Sample documents in the shape the oVirt DR playbooks produce.

/// Mapping file as written by the generate playbook for a site with one
/// storage domain of each kind.
pub const GENERATED_VARS: &str = r#"---
dr_sites_primary_url: https://manager1.example.com/ovirt-engine/api
dr_sites_primary_username: admin@internal
dr_sites_primary_ca_file: /var/lib/dr-controller/ovirt/site1/primary.ca

# Please fill in the following properties for the secondary site:
dr_sites_secondary_url: # https://manager1.example.com/ovirt-engine/api
dr_sites_secondary_username: # admin@internal
dr_sites_secondary_ca_file: # /var/lib/dr-controller/ovirt/site1/primary.ca

dr_import_storages:
- dr_domain_type: nfs
  dr_wipe_after_delete: False
  dr_backup: False
  dr_critical_space_action_blocker: 5
  dr_storage_domain_type: data
  dr_warning_low_space: 10
  dr_primary_name: nfs_dom
  dr_primary_master_domain: True
  dr_primary_dc_name: Default
  dr_discard_after_delete: False
  dr_primary_path: /nfs_dom_dr
  dr_primary_address: 10.1.1.2
  # Fill in the empty properties related to the secondary site
  dr_secondary_name: # nfs_dom
  dr_secondary_master_domain: # True
  dr_secondary_dc_name: # Default
  dr_secondary_path: # /nfs_dom_dr
  dr_secondary_address: # 10.1.1.2
- dr_domain_type: fcp
  dr_wipe_after_delete: False
  dr_backup: False
  dr_critical_space_action_blocker: 5
  dr_storage_domain_type: data
  dr_warning_low_space: 10
  dr_primary_name: fcp_dom
  dr_primary_master_domain: False
  dr_primary_dc_name: Default
  dr_discard_after_delete: False
  dr_domain_id: 2b8d8c8a-5f0e-4f6b-9a53-3d7c0f1e2a44
  # Fill in the empty properties related to the secondary site
  dr_secondary_name: # fcp_dom
  dr_secondary_master_domain: # False
  dr_secondary_dc_name: # Default
- dr_domain_type: iscsi
  dr_wipe_after_delete: False
  dr_backup: False
  dr_critical_space_action_blocker: 5
  dr_storage_domain_type: data
  dr_warning_low_space: 10
  dr_primary_name: iscsi_dom
  dr_primary_master_domain: False
  dr_primary_dc_name: Default
  dr_discard_after_delete: False
  dr_domain_id: 6e1c4cc1-2a8e-4b3e-9c3c-7e2b4b9d8f10
  dr_primary_address: 10.1.1.5
  dr_primary_port: 3260
  dr_primary_target: ["iqn.2006-01.com.openfiler:olvm-data1", "iqn.2006-01.com.openfiler:olvm-data2"]
  # Fill in the empty properties related to the secondary site
  dr_secondary_name: # iscsi_dom
  dr_secondary_master_domain: # False
  dr_secondary_dc_name: # Default
  dr_secondary_address: # 10.1.1.5
  dr_secondary_port: # 3260
  # target example: ["target1","target2","target3"]
  dr_secondary_target: # ["iqn.2006-01.com.openfiler:olvm-data1", "iqn.2006-01.com.openfiler:olvm-data2"]

# Mapping for cluster
dr_cluster_mappings:
- primary_name: Default
  # Fill the correlated cluster name in the secondary site for cluster 'Default'
  secondary_name: # Default

# Mapping for affinity group
dr_affinity_group_mappings:
- primary_name: ag1
  secondary_name: # ag1

# Mapping for domain
dr_domain_mappings:
- primary_name: internal-authz
  # Fill in the correlated domain in the secondary site for domain 'internal-authz'
  secondary_name: # internal-authz

# Mapping for role
dr_role_mappings:
- primary_name: UserRole
  # Fill the correlated role name in the secondary site for role 'UserRole'
  secondary_name: # UserRole

# Mapping for network
dr_network_mappings:
- primary_network_name: ovirtmgmt
  # Data Center name is relevant when multiple vnic profiles are maintained.
  # please uncomment it in case you have more than one DC.
  # primary_network_dc: Default
  primary_profile_name: ovirtmgmt
  primary_profile_id: 0000000a-000a-000a-000a-000000000398
  # Fill in the correlated vnic profile properties in the secondary site for profile 'ovirtmgmt'
  secondary_network_name: # ovirtmgmt
  # Data Center name is relevant when multiple vnic profiles are maintained.
  # please uncomment it in case you have more than one DC.
  # secondary_network_dc: Default
  secondary_profile_name: # ovirtmgmt
  secondary_profile_id: # 0000000a-000a-000a-000a-000000000398

# Mapping for direct LUN disks
dr_lun_mappings:
- logical_unit_alias: lun_disk1
  logical_unit_description: direct lun
  wipe_after_delete: False
  shareable: False
  logical_unit_id: 36001405a8f1e5c1b4a1c4e7bd0e8e0a3
  storage_type: iscsi
  logical_unit_address: 10.1.1.5
  logical_unit_port: 3260
  logical_unit_target: iqn.2006-01.com.openfiler:olvm-lun
  # Fill in the following properties of the external LUN disk in the secondary site
  remote_logical_unit_id: # 36001405a8f1e5c1b4a1c4e7bd0e8e0a3
  remote_storage_type: # iscsi
  remote_logical_unit_address: # 10.1.1.5
  remote_logical_unit_port: # 3260
  remote_logical_unit_target: # iqn.2006-01.com.openfiler:olvm-lun
"#;

/// Failover playbook shipped in the site template.
pub const FAILOVER_PLAYBOOK: &str = r#"---
- name: oVirt Failover
  hosts: localhost
  connection: local
  vars:
     dr_target_host: secondary
     dr_source_map: primary
  vars_files:
     - disaster_recovery_vars.yml
     - ovirt_passwords.yml
  roles:
     - disaster_recovery
  collections:
     - ovirt.ovirt
"#;

/// Generate playbook shipped in the site template.
pub const GENERATE_PLAYBOOK: &str = r#"---
- name: Generate mapping
  hosts: localhost
  connection: local
  vars:
     site: "{{ site }}"
     username: "{{ username }}"
     password: "{{ password }}"
     ca: "{{ ca }}"
     var_file: "{{ var_file }}"
  roles:
     - disaster_recovery
  collections:
     - ovirt.ovirt
"#;

/// A CA certificate body; only its bytes matter.
pub const CA_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIBdummy\n-----END CERTIFICATE-----\n";
