//! Site name rules.
//!
//! A site name becomes a directory under the store root, so it is restricted
//! to a single safe path component.

use regex::Regex;
use std::sync::LazyLock;

use crate::constants::TEMPLATE_NAME;
use crate::core::{DrError, Result};

static SITE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("site name pattern is valid"));

/// Reject names that are not `^[A-Za-z0-9_-]+$` or that equal the reserved
/// template directory name.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| DrError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name == TEMPLATE_NAME {
        return Err(invalid("name is reserved"));
    }
    if !SITE_NAME.is_match(name) {
        return Err(invalid("only letters, digits, '_' and '-' are allowed"));
    }
    Ok(())
}
