//! Integration test suite for dr-controller
//!
//! End-to-end tests that drive [`SiteManager`](dr_controller::site::SiteManager)
//! and the binary against a scratch store, a fake playbook runner and a
//! static engine probe. The fake runner is a `/bin/sh` script, so the suite
//! only runs on unix.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **generate**: site generation, remap results and failure modes
//! - **lifecycle**: failover, failback, cleanup, locking, list, show, delete
//! - **cli**: the command-line front end

#![cfg(unix)]

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;
#[path = "../fixtures/mod.rs"]
mod fixtures;

mod cli;
mod generate;
mod lifecycle;
