//! Database synchronization.
//!
//! Pushes resolved tables from the source database into the destination by
//! piping a dump straight into a restore, after snapshotting the
//! destination and recording how to restore it. The whole pipe runs as one
//! shell command so a failure on either side is visible in the combined
//! output.

use crate::core::backup::BackupManager;
use crate::core::log::ResultLog;
use crate::core::maintenance::MaintenanceWindow;
use crate::core::runner::ProcessRunner;
use crate::core::undo::{UndoRecord, UndoRecorder};
use crate::models::site::DbIdentity;
use crate::models::tables::TableResolution;
use crate::preflight;
use crate::Result;
use regex::Regex;

/// Pushes one database onto another.
#[derive(Debug, Clone)]
pub struct DatabaseSyncer {
    pub mysql_path: String,
    pub mysqldump_path: String,
    pub dump_options: String,
}

impl DatabaseSyncer {
    pub fn new(mysql_path: &str, mysqldump_path: &str) -> Self {
        Self {
            mysql_path: mysql_path.to_string(),
            mysqldump_path: mysqldump_path.to_string(),
            dump_options: "--opt".to_string(),
        }
    }

    /// Push `source` onto `dest`, scoped to the resolved tables.
    ///
    /// Preconditions fail before any side effect. A failure inside the
    /// dump/restore pipe itself is logged and reported as an unsuccessful
    /// push; the destination may be partially written and the pre-push
    /// backup is the recovery path.
    pub fn push(
        &self,
        log: &mut ResultLog,
        runner: &ProcessRunner,
        backup: &mut BackupManager,
        undo: &UndoRecorder,
        maintenance: &mut MaintenanceWindow,
        source: &DbIdentity,
        dest: &DbIdentity,
        resolution: &TableResolution,
    ) -> Result<bool> {
        if source.name == dest.name {
            return Err(crate::Error::SameDatabase(source.name.clone()));
        }
        if source.prefix != dest.prefix {
            return Err(crate::Error::other(
                "Source and destination DB prefix must be the same.",
            ));
        }

        // probes spawn processes, which dry-run forbids; the pipe itself is
        // only logged in that mode anyway
        if !runner.dry_run {
            let mysql = preflight::check_mysql(&self.mysql_path);
            if !mysql.success {
                return Err(crate::Error::ToolUnavailable("mysql".to_string()));
            }
            let mysqldump = preflight::check_mysqldump(&self.mysqldump_path);
            if !mysqldump.success {
                return Err(crate::Error::ToolUnavailable("mysqldump".to_string()));
            }
        }

        let backup_file = backup.backup_database(log, runner, dest)?;

        let tables_arg = resolution.tables_arg();
        let dump_command = format!(
            "{} {}{} -u {} -p'{}' {}{}",
            self.mysqldump_path,
            self.dump_options,
            source.host_arg(),
            source.user,
            source.password,
            source.name,
            tables_arg
        );
        let restore_command = format!(
            "{} -D {} -u {}{} -p'{}'",
            self.mysql_path,
            dest.name,
            dest.user,
            dest.host_arg(),
            dest.password
        );
        let command = format!("{} | {}", dump_command, restore_command);

        if let Some(ref backup_file) = backup_file {
            let restore = format!(
                "'{}' -u {} -p'{}'{} -D {} < '{}'",
                self.mysql_path,
                dest.user,
                dest.password,
                dest.host_arg(),
                dest.name,
                backup_file.display()
            );
            undo.record(
                log,
                &UndoRecord {
                    kind: "mysql".to_string(),
                    original: command.clone(),
                    undo_commands: vec![restore],
                    notes: vec![],
                },
            );
        }

        maintenance.turn_on(log);

        if resolution.tables.is_empty() {
            log.record("Pushing whole database", 1);
        } else {
            log.record(
                &format!(
                    "Pushing database tables from {} to {}: {}",
                    source.label,
                    dest.label,
                    resolution.tables.join(" ")
                ),
                1,
            );
        }
        log.record(
            &format!("Database source: {} ({})", source.label, source.name),
            2,
        );
        log.record(&format!("Database dest: {} ({})", dest.label, dest.name), 2);

        // both tools can report errors on exit 0 when only one side of the
        // pipe fails
        let pattern = Regex::new(r"(?m)^(ERROR|mysqldump: )")
            .map_err(|e| crate::Error::other(format!("bad failure pattern: {}", e)))?;
        let run_result = runner.run(log, &command, 3, Some(&pattern));
        log.record(crate::core::log::SEPARATOR, 1);

        // guaranteed even when the run itself errored
        maintenance.turn_off(log);

        let outcome = run_result?;
        if !outcome.success && !runner.dry_run {
            log.record("Database push failed; destination may be partially written. Restore from the pre-push backup if needed.", 1);
        }
        Ok(outcome.success)
    }
}
