//! Defaults and fixed names used across the controller.

use std::time::Duration;

/// Playbook runner looked up in `PATH` when the config names none.
pub const DEFAULT_BINARY: &str = "ansible-playbook";

/// Verbosity flag appended to every playbook run.
pub const DEFAULT_VERBOSITY: &str = "-vvvvv";

/// Upper bound for one playbook run (10 minutes).
pub const DEFAULT_PLAYBOOK_TIMEOUT_SECS: u64 = 600;

/// Timeout for CA download and credential checks.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// How long to keep reading output after the playbook exits or is killed.
pub const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Directory under the store root copied to stage every new site. Not a
/// valid site name.
pub const TEMPLATE_NAME: &str = "template";

/// Suffix of the sidecar lock file beside each site directory.
pub const LOCK_SUFFIX: &str = ".lock";

/// `InProgress` target reported when the process-wide lock is taken.
pub const PROCESS_LOCK_TARGET: &str = "*";

/// Suffix a previous operation log is renamed to.
pub const ROTATED_LOG_SUFFIX: &str = ".old";

/// Replacement for secrets in logs and transcripts.
pub const MASK: &str = "********";

/// First line of the remap block prepended to the generate transcript.
pub const STORAGES_HEADER: &str = "STORAGES MESSAGES AND WARNINGS:";

pub const ENV_STORE_DIR: &str = "DR_CONTROLLER_STORE_DIR";
pub const ENV_BINARY: &str = "DR_CONTROLLER_BINARY";
