//! End-to-end generate runs against a staged template and the fake runner.

use dr_controller::core::DrError;
use dr_controller::storage::RemapWarning;
use dr_controller::test_utils::{StaticProbe, set_behavior};
use std::os::unix::fs::PermissionsExt;

use crate::common::{FileAssert, TestStore};
use crate::fixtures::{
    PRIMARY_PASSWORD, PRIMARY_URL, RequestFixture, SECONDARY_PASSWORD, SECONDARY_URL, fcp_storage, iscsi_storage,
    nfs_storage,
};

/// Test a complete generate with one storage domain of each kind
#[tokio::test]
async fn test_generate_writes_site() {
    let store = TestStore::new().unwrap();
    let manager = store.manager();
    let request = RequestFixture::new().storage(nfs_storage()).storage(fcp_storage()).storage(iscsi_storage()).build();

    let report = manager.generate("site1", request).await.unwrap();
    let site = store.site_path("site1");

    assert_eq!(report.name, "site1");
    assert_eq!(report.matched, 3);
    assert_eq!(report.document, site.join("disaster_recovery_vars.yml"));
    assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
    assert!(report.output.starts_with("STORAGES MESSAGES AND WARNINGS:\n"));
    assert!(report.output.contains("PLAYBOOK dr_generate.yml -t generate_mapping"));

    let document = site.join("disaster_recovery_vars.yml");
    FileAssert::contains(&document, &format!("dr_sites_secondary_url: {SECONDARY_URL}\n"));
    FileAssert::contains(&document, "dr_sites_secondary_username: admin@internal\n");
    FileAssert::contains(&document, &format!("dr_sites_secondary_ca_file: {}\n", site.join("secondary.ca").display()));
    FileAssert::contains(&document, "  dr_secondary_address: 10.1.1.3\n");
    FileAssert::contains(&document, "  dr_secondary_path: /nfs_dom_dr2\n");
    FileAssert::contains(&document, "  dr_secondary_name: fcp_dom_dr\n");
    FileAssert::contains(&document, "  dr_secondary_dc_name: DR\n");
    FileAssert::contains(&document, "  dr_primary_target: [\"iqn.2006-01.com.openfiler:olvm-data1\"]\n");
    FileAssert::contains(&document, "  dr_secondary_target: [\"iqn.2006-02.com.openfiler:olvm-data1-dr\"]\n");
    FileAssert::lacks(&document, "olvm-data2");
    FileAssert::contains(&document, "# Mapping for cluster\n");

    FileAssert::exists(site.join("primary.ca"));
    FileAssert::exists(site.join("secondary.ca"));
    FileAssert::exists(site.join("disaster_recovery_vars.yml.tpl"));
    FileAssert::exists(site.join("generate.log"));
    FileAssert::not_exists(store.template_path().join("disaster_recovery_vars.yml"));
}

/// Test the credentials file and that passwords never reach the transcript
#[tokio::test]
async fn test_generate_protects_passwords() {
    let store = TestStore::new().unwrap();
    let report = store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap();
    let site = store.site_path("site1");

    let passwords = site.join("ovirt_passwords.yml");
    let mode = std::fs::metadata(&passwords).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(
        std::fs::read_to_string(&passwords).unwrap(),
        format!("dr_sites_primary_password: {PRIMARY_PASSWORD}\ndr_sites_secondary_password: {SECONDARY_PASSWORD}\n")
    );

    assert!(report.output.contains("password=********"));
    assert!(!report.output.contains(PRIMARY_PASSWORD));
    FileAssert::lacks(site.join("generate.log"), PRIMARY_PASSWORD);
    FileAssert::lacks(site.join("disaster_recovery_vars.yml"), PRIMARY_PASSWORD);
}

/// Test that the failback playbook is derived from the failover playbook
#[tokio::test]
async fn test_generate_derives_failback() {
    let store = TestStore::new().unwrap();
    store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap();

    let failback = store.site_path("site1").join("dr_failback.yml");
    FileAssert::contains(&failback, "     dr_target_host: primary\n");
    FileAssert::contains(&failback, "     dr_source_map: secondary\n");
    FileAssert::contains(&failback, "- name: oVirt Failover\n");
}

/// Test that both engines are probed in order, primary first
#[tokio::test]
async fn test_generate_probes_both_sites() {
    let store = TestStore::new().unwrap();
    let manager = store.manager();
    manager.generate("site2", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap();
    let calls = manager.probe().calls();
    assert_eq!(
        calls,
        vec![
            format!("ca {PRIMARY_URL}"),
            format!("access {PRIMARY_URL} admin@internal"),
            format!("ca {SECONDARY_URL}"),
            format!("access {SECONDARY_URL} admin@internal"),
        ]
    );
}

/// Test that unmatched descriptors and entries come back as warnings
#[tokio::test]
async fn test_generate_reports_warnings() {
    let store = TestStore::new().unwrap();
    let request = RequestFixture::new()
        .storage(nfs_storage())
        .storage(serde_json::json!({"primary_type": "nfs", "primary_addr": "10.9.9.9", "primary_path": "/gone"}))
        .build();

    let report = store.manager().generate("site1", request).await.unwrap();
    assert_eq!(report.matched, 1);
    assert!(report.warnings.contains(&RemapWarning::UnusedDescriptor {
        locator: "nfs://10.9.9.9:/gone".to_string()
    }));
    assert!(report.output.contains("storage map nfs://10.9.9.9:/gone not used"));
    assert!(report.output.contains("storage map for fcp_dom (fcp) not found"));

    let document = store.site_path("site1").join("disaster_recovery_vars.yml");
    FileAssert::lacks(&document, "dr_domain_type: fcp");
}

/// Test that an existing site is refused without touching it
#[tokio::test]
async fn test_generate_existing_site() {
    let store = TestStore::new().unwrap();
    let site = store.create_site("site1", Some("kept: true\n")).unwrap();

    let err = store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    assert!(matches!(err, DrError::AlreadyExists { ref name } if name == "site1"));
    assert!(err.is_conflict());
    FileAssert::contains(site.join("disaster_recovery_vars.yml"), "kept: true");
}

/// Test generate without a template directory
#[tokio::test]
async fn test_generate_without_template() {
    let store = TestStore::new().unwrap();
    std::fs::remove_dir_all(store.template_path()).unwrap();

    let err = store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    assert!(matches!(err, DrError::TemplateMissing { .. }));
    FileAssert::not_exists(store.site_path("site1"));
}

/// Test that an invalid request is rejected before anything is staged
#[tokio::test]
async fn test_generate_invalid_request() {
    let store = TestStore::new().unwrap();
    let request = RequestFixture::new().field("site_primary_url", "http://manager1").field("site_secondary_password", "").build();

    let err = store.manager().generate("site1", request).await.unwrap_err();
    let DrError::Validation { problems } = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(problems.contains(&"site_primary_url is invalid".to_string()));
    assert!(problems.contains(&"site_secondary_password is empty".to_string()));
    FileAssert::not_exists(store.site_path("site1"));
}

/// Test that a refused login stops generate before the playbook runs
#[tokio::test]
async fn test_generate_secondary_login_refused() {
    let store = TestStore::new().unwrap();
    let manager = store.manager_with(store.config(), StaticProbe::denying(SECONDARY_URL));

    let err = manager.generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    assert!(matches!(err, DrError::Connectivity { ref url, .. } if url == SECONDARY_URL));

    let site = store.site_path("site1");
    FileAssert::exists(&site);
    FileAssert::not_exists(site.join("generate.log"));
    FileAssert::not_exists(site.join("ovirt_passwords.yml"));
}

/// Test a generate playbook that exits cleanly without writing its output
#[tokio::test]
async fn test_generate_missing_output() {
    let store = TestStore::new().unwrap();
    set_behavior(&store.template_path(), "dr_generate.yml", "echo \"nothing written\"\n");

    let err = store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    let DrError::GenerateFailed { ref source, .. } = err else {
        panic!("expected generate failure, got {err:?}");
    };
    assert!(matches!(**source, DrError::MissingOutput { .. }));
    assert!(err.output().is_some_and(|o| o.contains("nothing written")));
    FileAssert::not_exists(store.site_path("site1").join("disaster_recovery_vars.yml"));
}

/// Test a generate playbook that fails
#[tokio::test]
async fn test_generate_playbook_failure() {
    let store = TestStore::new().unwrap();
    set_behavior(&store.template_path(), "dr_generate.yml", "echo \"engine unreachable\" >&2\nexit 4\n");

    let err = store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    assert!(matches!(err, DrError::PlaybookFailed { exit_code: Some(4), .. }));
    assert!(err.output().is_some_and(|o| o.contains("engine unreachable")));
}

/// Test that no final document is written when nothing matches
#[tokio::test]
async fn test_generate_nothing_matched() {
    let store = TestStore::new().unwrap();
    let request = RequestFixture::new()
        .storage(serde_json::json!({"primary_type": "fcp", "primary_id": "00000000-0000-0000-0000-000000000000"}))
        .build();

    let err = store.manager().generate("site1", request).await.unwrap_err();
    let DrError::GenerateFailed { ref source, .. } = err else {
        panic!("expected generate failure, got {err:?}");
    };
    assert!(matches!(**source, DrError::Remap(_)));
    FileAssert::not_exists(store.site_path("site1").join("disaster_recovery_vars.yml"));
    FileAssert::exists(store.site_path("site1").join("disaster_recovery_vars.yml.tpl"));
}

/// Test that a malformed playbook output is reported with its line
#[tokio::test]
async fn test_generate_malformed_output() {
    let store = TestStore::with_mapping("a:\n    b: 1\n  c: 2\n").unwrap();

    let err = store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    let DrError::GenerateFailed { ref source, .. } = err else {
        panic!("expected generate failure, got {err:?}");
    };
    assert!(matches!(**source, DrError::Parse { .. }), "unexpected source: {source:?}");
}

/// Test configured overrides applied to every generated document
#[tokio::test]
async fn test_generate_applies_overrides() {
    let store = TestStore::new().unwrap();
    let mut config = store.config();
    config.generate.overrides = vec!["dr_cluster_mappings[0].secondary_name=DR_Cluster".to_string()];
    let manager = store.manager_with(config, StaticProbe::new());

    manager.generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap();
    FileAssert::contains(
        store.site_path("site1").join("disaster_recovery_vars.yml"),
        "  secondary_name: DR_Cluster\n",
    );
}
