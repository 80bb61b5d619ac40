//! rsync availability check.

use super::{probe_version, CheckResult};

/// Probe rsync at the configured path.
///
/// Failure is not fatal for file pushes: the engine falls back to the
/// builtin sync strategy.
pub fn check_rsync(path: &str) -> CheckResult {
    match probe_version(path) {
        Some(version) => CheckResult::ok("rsync", &version),
        None => CheckResult::fail(
            "rsync",
            &format!("not found at '{}'", path),
            "file pushes will use the builtin sync strategy (no undo support)",
        ),
    }
}
