//! Failback playbook derivation.
//!
//! The failback playbook is the failover playbook with the site roles
//! swapped: data is mapped from the secondary site back onto the primary.

const SOURCE_MAP: &str = "dr_source_map:";
const TARGET_HOST: &str = "dr_target_host:";

/// Rewrite the role markers of a failover playbook, keeping indentation and
/// every other line as is.
#[must_use]
pub fn derive_failback(failover: &str) -> String {
    let mut out = String::with_capacity(failover.len());
    for line in failover.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let ending = &line[body.len()..];
        let trimmed = body.trim_start();
        let indent = &body[..body.len() - trimmed.len()];

        if trimmed.starts_with(SOURCE_MAP) {
            out.push_str(indent);
            out.push_str(SOURCE_MAP);
            out.push_str(" secondary");
        } else if trimmed.starts_with(TARGET_HOST) {
            out.push_str(indent);
            out.push_str(TARGET_HOST);
            out.push_str(" primary");
        } else {
            out.push_str(body);
        }
        out.push_str(ending);
    }
    out
}
