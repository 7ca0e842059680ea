//! The dr-controller binary end to end.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::TestStore;
use crate::fixtures::RequestFixture;

fn controller(store: &TestStore) -> Command {
    let config = store.write_config("").unwrap();
    let mut cmd = Command::cargo_bin("dr-controller").unwrap();
    cmd.arg("--config")
        .arg(config)
        .arg("--store-dir")
        .arg(store.store_path())
        .env("DR_CONTROLLER_BINARY", dr_controller::test_utils::fake_runner())
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Test listing an empty store
#[test]
fn test_list_empty_store() {
    let store = TestStore::new().unwrap();
    controller(&store)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sites found"));
}

/// Test listing sites as JSON
#[test]
fn test_list_json() {
    let store = TestStore::new().unwrap();
    store.create_site("site1", Some("dr_import_storages:\n")).unwrap();
    store.create_site("site2", None).unwrap();

    let output = controller(&store).args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let sites: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sites[0]["name"], "site1");
    assert_eq!(sites[0]["status"], "ready");
    assert_eq!(sites[1]["status"], "incomplete");
}

/// Test that incomplete sites are marked in the text listing
#[test]
fn test_list_marks_incomplete() {
    let store = TestStore::new().unwrap();
    store.create_site("site2", None).unwrap();
    let output = store.run_dr_controller(&["list"]).unwrap();
    output.assert_success().assert_stdout_contains("site2").assert_stdout_contains("(INCOMPLETE)");
}

/// Test show on a generated and a missing site
#[test]
fn test_show() {
    let store = TestStore::new().unwrap();
    store.create_site("site1", Some("dr_sites_primary_url: https://m1\n")).unwrap();

    controller(&store)
        .args(["show", "site1"])
        .assert()
        .success()
        .stdout("dr_sites_primary_url: https://m1\n");

    controller(&store)
        .args(["show", "ghost"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("site 'ghost' not found"))
        .stderr(predicate::str::contains("dr-controller list"));
}

/// Test that invalid names are rejected with a suggestion
#[test]
fn test_invalid_site_name() {
    let store = TestStore::new().unwrap();
    let output = store.run_dr_controller(&["delete", "bad name"]).unwrap();
    assert!(!output.success);
    output.assert_stderr_contains("bad name").assert_stderr_contains("letters, digits");

    let output = store.run_dr_controller(&["failover", "template"]).unwrap();
    assert!(!output.success);
    output.assert_stderr_contains("reserved");
}

/// Test failover through the binary with the fake runner
#[test]
fn test_failover_prints_transcript() {
    let store = TestStore::new().unwrap();
    store.create_site("site1", Some("dr_import_storages:\n")).unwrap();

    controller(&store)
        .args(["failover", "site1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ran fail_over"))
        .stdout(predicate::str::contains("Completed failover of site 'site1'"));

    controller(&store)
        .args(["cleanup", "site1", "--no-output"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ran clean_engine").not());
}

/// Test that a failing playbook exits non-zero with the transcript tail
#[test]
fn test_failover_failure_shows_details() {
    let store = TestStore::new().unwrap();
    let site = store.create_site("site1", Some("dr_import_storages:\n")).unwrap();
    dr_controller::test_utils::set_behavior(&site, "dr_failover.yml", "echo \"engine said no\"\nexit 5\n");

    controller(&store)
        .args(["failover", "site1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exit code 5"))
        .stderr(predicate::str::contains("engine said no"));
}

/// Test delete through the binary
#[test]
fn test_delete() {
    let store = TestStore::new().unwrap();
    store.create_site("site1", None).unwrap();

    controller(&store).args(["delete", "site1"]).assert().success().stdout(predicate::str::contains("Deleted"));
    assert!(!store.site_path("site1").exists());
}

/// Test that request validation runs before any engine is contacted
#[test]
fn test_generate_invalid_request_file() {
    let store = TestStore::new().unwrap();
    let request = store.store_path().join("request.json");
    let fixture = RequestFixture::new().field("site_primary_url", "").field("site_secondary_url", "http://plain");
    std::fs::write(&request, fixture.json()).unwrap();

    controller(&store)
        .args(["generate", "site1", "--request"])
        .arg(&request)
        .assert()
        .failure()
        .stderr(predicate::str::contains("site_primary_url is empty"))
        .stderr(predicate::str::contains("site_secondary_url is invalid"));
    assert!(!store.site_path("site1").exists());
}

/// Test a configuration file that fails validation
#[test]
fn test_invalid_config() {
    let store = TestStore::new().unwrap();
    let config = store.write_config("playbook_timeout_secs = 0\n").unwrap();

    Command::cargo_bin("dr-controller")
        .unwrap()
        .arg("--config")
        .arg(config)
        .arg("list")
        .env("NO_COLOR", "1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("playbook_timeout_secs must be positive"));
}
