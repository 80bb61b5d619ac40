//! Push request and report types.

use crate::models::tables::TableGroup;
use serde::Serialize;

/// What a single push should move. Built by the CLI layer, consumed once.
#[derive(Debug, Clone, Default)]
pub struct PushRequest {
    /// Push the plugins directory.
    pub plugins: bool,
    /// Push the uploads directory.
    pub uploads: bool,
    /// Push the whole themes directory.
    pub themes: bool,
    /// Push one named theme.
    pub theme: Option<String>,
    /// Push the WordPress core files tree.
    pub wp_core: bool,
    /// Database table groups to push; empty with `db` set pushes everything.
    pub db_groups: Vec<TableGroup>,
    /// Whether to push the database at all.
    pub db: bool,
    /// Rehearse only: log every command, execute nothing.
    pub dry_run: bool,
    /// Snapshot the destination before mutating it.
    pub backup: bool,
}

impl PushRequest {
    /// True when the request selects nothing to move.
    pub fn is_empty(&self) -> bool {
        !self.plugins
            && !self.uploads
            && !self.themes
            && self.theme.is_none()
            && !self.wp_core
            && !self.db
    }
}

/// Outcome of one resource within a push.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceOutcome {
    /// Resource label, e.g. "plugins" or "database".
    pub resource: String,
    pub success: bool,
    /// The resource was only rehearsed: its commands were logged, not run.
    /// Rehearsed outcomes never fail the push verdict.
    pub rehearsed: bool,
}

/// Aggregated outcome of a push.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    pub source: String,
    pub dest: String,
    pub dry_run: bool,
    pub outcomes: Vec<ResourceOutcome>,
    /// Set when the pushed tables require a cross-site domain fixup.
    pub needs_domain_fix: bool,
}

impl PushReport {
    /// Single pass/fail verdict for the whole push.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.success || o.rehearsed)
    }

    /// Record a resource outcome. During a dry run the outcome is marked
    /// rehearsed, since every command reports failure without running.
    pub fn record(&mut self, resource: &str, success: bool) {
        self.outcomes.push(ResourceOutcome {
            resource: resource.to_string(),
            success,
            rehearsed: self.dry_run,
        });
    }

    /// Record a failure that holds even in a dry run, e.g. a precondition
    /// refusal checked before any command would be issued.
    pub fn record_failure(&mut self, resource: &str) {
        self.outcomes.push(ResourceOutcome {
            resource: resource.to_string(),
            success: false,
            rehearsed: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request() {
        let req = PushRequest::default();
        assert!(req.is_empty());

        let req = PushRequest {
            uploads: true,
            ..Default::default()
        };
        assert!(!req.is_empty());
    }

    #[test]
    fn test_report_verdict() {
        let mut report = PushReport::default();
        assert!(report.success());

        report.record("plugins", true);
        report.record("database", false);
        assert!(!report.success());
    }

    #[test]
    fn test_dry_run_outcomes_do_not_fail_verdict() {
        let mut report = PushReport {
            dry_run: true,
            ..Default::default()
        };
        // dry-run commands report failure without running
        report.record("plugins", false);
        report.record("database", false);
        assert!(report.success());

        // a precondition refusal fails the rehearsal too
        report.record_failure("database");
        assert!(!report.success());
    }
}
