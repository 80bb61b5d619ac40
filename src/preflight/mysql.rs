//! mysql / mysqldump availability checks.

use super::{probe_version, CheckResult};

/// Probe the mysql client at the configured path.
pub fn check_mysql(path: &str) -> CheckResult {
    match probe_version(path) {
        Some(version) => CheckResult::ok("mysql", &version),
        None => CheckResult::fail(
            "mysql",
            &format!("not found at '{}'", path),
            "database pushes need the mysql client; set mysql_path in the config",
        ),
    }
}

/// Probe mysqldump at the configured path.
pub fn check_mysqldump(path: &str) -> CheckResult {
    match probe_version(path) {
        Some(version) => CheckResult::ok("mysqldump", &version),
        None => CheckResult::fail(
            "mysqldump",
            &format!("not found at '{}'", path),
            "database pushes and backups need mysqldump; set mysqldump_path in the config",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tools_fail() {
        assert!(!check_mysql("/nonexistent/mysql").success);
        assert!(!check_mysqldump("/nonexistent/mysqldump").success);
    }
}
