//! Failover, failback, cleanup and delete against generated sites.

use dr_controller::constants::PROCESS_LOCK_TARGET;
use dr_controller::core::DrError;
use dr_controller::site::{SiteLock, SiteStatus};
use dr_controller::test_utils::set_behavior;
use std::time::Duration;

use crate::common::{FileAssert, TestStore};
use crate::fixtures::{RequestFixture, nfs_storage};

async fn generated_store() -> TestStore {
    let store = TestStore::new().unwrap();
    store.manager().generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap();
    store
}

/// Test that each operation runs its playbook with its tag
#[tokio::test]
async fn test_operations_use_their_playbooks() {
    let store = generated_store().await;
    let manager = store.manager();

    let output = manager.failover("site1").await.unwrap();
    assert!(output.contains("PLAYBOOK dr_failover.yml -t fail_over -vvvvv"));
    assert!(output.contains("ran fail_over"));

    let output = manager.failback("site1").await.unwrap();
    assert!(output.contains("PLAYBOOK dr_failback.yml -t fail_back"));
    assert!(output.contains("ran fail_back"));

    let output = manager.cleanup("site1").await.unwrap();
    assert!(output.contains("PLAYBOOK dr_failover.yml -t clean_engine"));
    assert!(output.contains("ran clean_engine"));

    let site = store.site_path("site1");
    FileAssert::contains(site.join("failover.log"), "ran fail_over");
    FileAssert::contains(site.join("failback.log"), "ran fail_back");
    FileAssert::contains(site.join("cleanup.log"), "ran clean_engine");
}

/// Test that a second run keeps the previous log
#[tokio::test]
async fn test_operation_log_rotation() {
    let store = generated_store().await;
    let manager = store.manager();
    let site = store.site_path("site1");

    set_behavior(&site, "dr_failover.yml", "echo first\n");
    manager.failover("site1").await.unwrap();
    set_behavior(&site, "dr_failover.yml", "echo second\n");
    manager.failover("site1").await.unwrap();

    FileAssert::contains(site.join("failover.log"), "second");
    FileAssert::lacks(site.join("failover.log"), "first");
    FileAssert::contains(site.join("failover.log.old"), "first");
}

/// Test a failing playbook keeps its transcript in the error
#[tokio::test]
async fn test_operation_failure() {
    let store = generated_store().await;
    set_behavior(&store.site_path("site1"), "dr_failover.yml", "echo \"host unreachable\"\nexit 2\n");

    let err = store.manager().failover("site1").await.unwrap_err();
    assert!(matches!(err, DrError::PlaybookFailed { exit_code: Some(2), .. }));
    assert!(err.output().is_some_and(|o| o.contains("host unreachable")));
}

/// Test that a hung playbook is killed after the configured timeout
#[tokio::test]
async fn test_operation_timeout() {
    let store = generated_store().await;
    set_behavior(&store.site_path("site1"), "dr_failover.yml", "echo started\nsleep 30\n");
    let mut config = store.config();
    config.playbook_timeout_secs = 1;
    let manager = store.manager_with(config, dr_controller::test_utils::StaticProbe::new());

    let started = std::time::Instant::now();
    let err = manager.failover("site1").await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(matches!(err, DrError::PlaybookTimeout { .. }));
    assert!(err.output().is_some_and(|o| o.contains("started")));
}

/// Test operations on a site that was never generated
#[tokio::test]
async fn test_operations_on_missing_site() {
    let store = TestStore::new().unwrap();
    let manager = store.manager();

    assert!(matches!(manager.failover("ghost").await, Err(DrError::NotFound { .. })));
    assert!(matches!(manager.failback("ghost").await, Err(DrError::NotFound { .. })));
    assert!(matches!(manager.cleanup("ghost").await, Err(DrError::NotFound { .. })));
    assert!(matches!(manager.show("ghost").await, Err(DrError::NotFound { .. })));
    assert!(matches!(manager.failover("../etc").await, Err(DrError::InvalidName { .. })));
}

/// Test that a site under operation refuses a second operation
#[tokio::test]
async fn test_concurrent_operation_is_refused() {
    let store = generated_store().await;
    set_behavior(&store.site_path("site1"), "dr_failover.yml", "sleep 2\necho done\n");
    let manager = store.manager();

    let running = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.failover("site1").await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    let err = manager.delete("site1").await.unwrap_err();
    assert!(matches!(err, DrError::InProgress { .. }));
    assert!(err.is_conflict());

    let output = running.await.unwrap().unwrap();
    assert!(output.contains("done"));
    assert!(!manager.process_lock().is_held());
    manager.delete("site1").await.unwrap();
}

/// Test that a separate manager on the same store is excluded by the site lock
#[tokio::test]
async fn test_site_lock_excludes_other_managers() {
    let store = generated_store().await;
    set_behavior(&store.site_path("site1"), "dr_failover.yml", "sleep 2\n");
    let first = store.manager();
    let second = store.manager();

    let running = {
        let first = first.clone();
        tokio::spawn(async move { first.failover("site1").await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    let err = second.failback("site1").await.unwrap_err();
    assert!(matches!(err, DrError::InProgress { ref target } if target == "site1"));
    running.await.unwrap().unwrap();
}

/// Test that generating one site is refused while another site holds the process lock
#[tokio::test]
async fn test_generate_refused_while_process_lock_held() {
    let store = TestStore::new().unwrap();
    let manager = store.manager();
    let held = manager.process_lock().try_acquire().unwrap();

    let err = manager.generate("site2", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    assert!(matches!(err, DrError::InProgress { ref target } if target == PROCESS_LOCK_TARGET), "{err}");
    FileAssert::not_exists(store.site_path("site2"));
    FileAssert::not_exists(SiteLock::path_for(store.store_path(), "site2"));
    assert!(manager.probe().calls().is_empty());

    drop(held);
    manager.generate("site2", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap();
    FileAssert::exists(store.site_path("site2"));
}

/// Test that a site path that cannot be checked fails instead of counting as missing
#[cfg(unix)]
#[tokio::test]
async fn test_uncheckable_site_path_is_an_error() {
    let store = TestStore::new().unwrap();
    let site = store.site_path("site1");
    std::os::unix::fs::symlink(&site, &site).unwrap();
    let manager = store.manager();

    let err = manager.failover("site1").await.unwrap_err();
    assert!(matches!(err, DrError::FileSystem { ref operation, .. } if operation == "check site directory"), "{err}");
    let err = manager.generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap_err();
    assert!(matches!(err, DrError::FileSystem { .. }), "{err}");
    FileAssert::not_exists(SiteLock::path_for(store.store_path(), "site1"));
}

/// Test list, show and delete
#[tokio::test]
async fn test_list_show_delete() {
    let store = generated_store().await;
    store.create_site("half", None).unwrap();
    let manager = store.manager();

    let sites = manager.list().await.unwrap();
    let names: Vec<(&str, SiteStatus)> = sites.iter().map(|s| (s.name.as_str(), s.status)).collect();
    assert_eq!(names, vec![("half", SiteStatus::Incomplete), ("site1", SiteStatus::Ready)]);
    assert!(sites[1].modified.is_some());

    let text = manager.show("site1").await.unwrap();
    assert!(text.contains("dr_secondary_address: 10.1.1.3"));
    assert!(matches!(manager.show("half").await, Err(DrError::NotFound { .. })));

    manager.delete("site1").await.unwrap();
    manager.delete("half").await.unwrap();
    FileAssert::not_exists(store.site_path("site1"));
    assert!(manager.list().await.unwrap().is_empty());
    FileAssert::exists(store.template_path());
}

/// Test that a deleted site can be generated again
#[tokio::test]
async fn test_regenerate_after_delete() {
    let store = generated_store().await;
    let manager = store.manager();

    manager.delete("site1").await.unwrap();
    let report = manager.generate("site1", RequestFixture::new().storage(nfs_storage()).build()).await.unwrap();
    assert_eq!(report.matched, 1);
}
