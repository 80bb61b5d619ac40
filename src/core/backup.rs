//! Destination snapshots and retention.
//!
//! Before any mutation the destination is snapshotted: file trees to a
//! timestamped `.tgz`, databases to a `.sql` dump. Artifacts are locked
//! read-only after writing. A retention sweep deletes snapshots older than
//! the configured age and runs at most once per session.

use crate::core::log::ResultLog;
use crate::core::runner::ProcessRunner;
use crate::models::site::DbIdentity;
use crate::utils::fs as fsutil;
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Filename endings that identify our artifacts during the sweep.
const BACKUP_SUFFIXES: &[&str] = &[".sql", ".tgz", "undo"];

/// Creates and expires destination snapshots for one push session.
#[derive(Debug)]
pub struct BackupManager {
    /// Where snapshots are written; `None` disables backups entirely.
    pub backup_root: Option<PathBuf>,
    /// Days to keep old snapshots; 0 disables the sweep.
    pub keep_days: u32,
    /// Global backup toggle for this push.
    pub enabled: bool,
    /// Destination site name, used in artifact filenames.
    pub dest_name: String,
    /// Session timestamp (`YYYYMMDD-HHMMSS`), shared by all artifacts.
    pub timestamp: String,
    /// Extra mysqldump options.
    pub dump_options: String,
    /// Path to mysqldump, for database snapshots.
    pub mysqldump_path: String,
    // one-shot guard for the retention sweep, explicit per session
    swept: bool,
}

impl BackupManager {
    pub fn new(
        backup_root: Option<PathBuf>,
        keep_days: u32,
        enabled: bool,
        dest_name: &str,
        timestamp: &str,
        mysqldump_path: &str,
    ) -> Self {
        Self {
            backup_root,
            keep_days,
            enabled,
            dest_name: dest_name.to_string(),
            timestamp: timestamp.to_string(),
            dump_options: "--opt".to_string(),
            mysqldump_path: mysqldump_path.to_string(),
            swept: false,
        }
    }

    /// Snapshot a directory to `{root}/{dest}-{ts}-file-{label}.tgz`.
    ///
    /// Returns the artifact path, or `None` when nothing was backed up
    /// (symlinked or missing path, backups disabled, no backup root).
    /// In dry-run mode the archive command is only logged; the would-be
    /// path is still returned so undo records stay coherent.
    pub fn backup_file_tree(
        &mut self,
        log: &mut ResultLog,
        runner: &ProcessRunner,
        path: &Path,
        label: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        let root = match &self.backup_root {
            Some(root) => root.clone(),
            None => return Ok(None),
        };

        if fsutil::is_symlink(path) {
            log.record(
                &format!("{} not backed up, it is a symlink.", path.display()),
                1,
            );
            return Ok(None);
        }

        // the sweep deletes real files, which a rehearsal must not do
        if !runner.dry_run {
            self.sweep_old_backups(log);
        }

        if !self.enabled {
            log.record("File backup off", 2);
            log.record(crate::core::log::SEPARATOR, 2);
            return Ok(None);
        }

        if !path.exists() {
            log.record(
                &format!("{} not backed up, because it was not found.", path.display()),
                1,
            );
            log.record(crate::core::log::SEPARATOR, 1);
            return Ok(None);
        }

        // the archive is taken parent-relative so extraction recreates the
        // directory by name
        let dir = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let label = label.unwrap_or(&dir);

        let artifact = root.join(format!(
            "{}-{}-file-{}.tgz",
            self.dest_name, self.timestamp, label
        ));

        log.record(&format!("Backing up {}", path.display()), 1);

        let command = format!(
            "cd '{}'; cd ..; tar -czf '{}' '{}'; chmod 400 '{}'",
            path.display(),
            artifact.display(),
            dir,
            artifact.display()
        );
        runner.run(log, &command, 3, None)?;

        log.record(&format!("Backup file is at {}", artifact.display()), 1);
        log.record(crate::core::log::SEPARATOR, 1);

        Ok(Some(artifact))
    }

    /// Snapshot a database to `{root}/{dest}-{ts}-db-{name}.sql`.
    pub fn backup_database(
        &mut self,
        log: &mut ResultLog,
        runner: &ProcessRunner,
        db: &DbIdentity,
    ) -> Result<Option<PathBuf>> {
        let root = match &self.backup_root {
            Some(root) => root.clone(),
            None => return Ok(None),
        };

        if !self.enabled {
            log.record("Database backup off", 2);
            log.record(crate::core::log::SEPARATOR, 2);
            return Ok(None);
        }

        if !runner.dry_run {
            self.sweep_old_backups(log);
        }

        let artifact = root.join(format!(
            "{}-{}-db-{}.sql",
            self.dest_name, self.timestamp, db.name
        ));

        log.record(&format!("Backing up {} DB", self.dest_name), 1);
        log.record(&format!("Backup file is at {}", artifact.display()), 2);

        let command = format!(
            "{} {} -r '{}'{} -u {} -p'{}' {}; chmod 400 '{}'",
            self.mysqldump_path,
            self.dump_options,
            artifact.display(),
            db.host_arg(),
            db.user,
            db.password,
            db.name,
            artifact.display()
        );
        runner.run(log, &command, 3, None)?;

        log.record(crate::core::log::SEPARATOR, 1);

        Ok(Some(artifact))
    }

    /// Delete snapshots older than the retention window.
    ///
    /// Runs at most once per session. Returns whether anything was deleted.
    pub fn sweep_old_backups(&mut self, log: &mut ResultLog) -> bool {
        if self.swept {
            log.record("Skipping backup clear because we've already run it.", 3);
            log.record(crate::core::log::SEPARATOR, 3);
            return false;
        }
        self.swept = true;

        let root = match &self.backup_root {
            Some(root) => root.clone(),
            None => {
                log.record("Skipping backup clear because backup directory not set.", 3);
                log.record(crate::core::log::SEPARATOR, 3);
                return false;
            }
        };

        if self.keep_days == 0 {
            log.record("Not clearing backups.", 3);
            log.record(crate::core::log::SEPARATOR, 3);
            return false;
        }

        log.record(
            &format!("Checking for old backups to clear at {}", root.display()),
            2,
        );

        let too_old = SystemTime::now() - Duration::from_secs(u64::from(self.keep_days) * 86_400);
        let mut deleted = false;

        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) => {
                log.record(&format!("Could not read backup directory: {}", e), 2);
                return false;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if !BACKUP_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                continue;
            }
            log.record(&format!("Checking {}", name), 4);

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(_) => continue,
            };

            if modified < too_old {
                log.record(
                    &format!("Deleting old backup at {}", path.display()),
                    1,
                );
                // artifacts are chmod 0400; unlock so remove can't fail on
                // permissions alone
                let _ = fsutil::chmod_writable(&path);
                match std::fs::remove_file(&path) {
                    Ok(()) => deleted = true,
                    Err(e) => log.record(&format!("Could not delete {}: {}", name, e), 2),
                }
            }
        }

        if !deleted {
            log.record("No old backups found to delete", 2);
        }
        log.record(crate::core::log::SEPARATOR, if deleted { 1 } else { 2 });
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn quiet_log() -> ResultLog {
        ResultLog::new(vec![], false, 1)
    }

    fn manager(root: Option<PathBuf>, keep_days: u32) -> BackupManager {
        BackupManager::new(root, keep_days, true, "live", "20260830-120000", "mysqldump")
    }

    fn age_file(path: &Path, days: u64) {
        // backdate mtime via filetime-free approach: set it with `touch -d`
        // is unavailable in-process, so write then adjust via utimes through
        // the `std` fallback: keep it simple and rely on File::set_times.
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        let when = SystemTime::now() - Duration::from_secs(days * 86_400);
        let times = fs::FileTimes::new().set_modified(when);
        file.set_times(times).unwrap();
    }

    #[test]
    fn test_sweep_deletes_only_old_artifacts() {
        let dir = tempfile::TempDir::new().unwrap();
        let old_sql = dir.path().join("live-20200101-000000-db-wp.sql");
        let old_tgz = dir.path().join("live-20200101-000000-file-plugins.tgz");
        let fresh = dir.path().join("live-20260829-000000-db-wp.sql");
        let unrelated = dir.path().join("notes.txt");
        for p in [&old_sql, &old_tgz, &fresh, &unrelated] {
            fs::write(p, "x").unwrap();
        }
        age_file(&old_sql, 30);
        age_file(&old_tgz, 30);
        age_file(&unrelated, 30);

        let mut mgr = manager(Some(dir.path().to_path_buf()), 10);
        let mut log = quiet_log();
        assert!(mgr.sweep_old_backups(&mut log));

        assert!(!old_sql.exists());
        assert!(!old_tgz.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_sweep_runs_once_per_session() {
        let dir = tempfile::TempDir::new().unwrap();
        let old = dir.path().join("live-old-db-wp.sql");
        fs::write(&old, "x").unwrap();
        age_file(&old, 30);

        let mut mgr = manager(Some(dir.path().to_path_buf()), 10);
        let mut log = quiet_log();
        assert!(mgr.sweep_old_backups(&mut log));

        // a new old file appears; the second sweep in the same session is a no-op
        let old2 = dir.path().join("live-old2-db-wp.sql");
        fs::write(&old2, "x").unwrap();
        age_file(&old2, 30);
        assert!(!mgr.sweep_old_backups(&mut log));
        assert!(old2.exists());
    }

    #[test]
    fn test_sweep_noop_without_retention() {
        let dir = tempfile::TempDir::new().unwrap();
        let old = dir.path().join("live-old-db-wp.sql");
        fs::write(&old, "x").unwrap();
        age_file(&old, 30);

        let mut mgr = manager(Some(dir.path().to_path_buf()), 0);
        let mut log = quiet_log();
        assert!(!mgr.sweep_old_backups(&mut log));
        assert!(old.exists());
    }

    #[test]
    fn test_file_backup_refuses_symlink() {
        let dir = tempfile::TempDir::new().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&real, &link).unwrap();
        #[cfg(not(unix))]
        return;

        let mut mgr = manager(Some(dir.path().to_path_buf()), 0);
        let runner = ProcessRunner::new(true, false);
        let mut log = quiet_log();

        let result = mgr
            .backup_file_tree(&mut log, &runner, &link, None)
            .unwrap();
        assert!(result.is_none());
        assert!(log.render(5).contains("it is a symlink"));
    }

    #[test]
    fn test_file_backup_missing_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut mgr = manager(Some(dir.path().to_path_buf()), 0);
        let runner = ProcessRunner::new(true, false);
        let mut log = quiet_log();

        let result = mgr
            .backup_file_tree(&mut log, &runner, &dir.path().join("gone"), None)
            .unwrap();
        assert!(result.is_none());
        assert!(log.render(5).contains("not found"));
    }

    #[test]
    fn test_file_backup_creates_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let tree = dir.path().join("plugins");
        fs::create_dir(&tree).unwrap();
        fs::write(tree.join("a.php"), "<?php").unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir(&backups).unwrap();

        let mut mgr = manager(Some(backups.clone()), 0);
        let runner = ProcessRunner::new(false, false);
        let mut log = quiet_log();

        let artifact = mgr
            .backup_file_tree(&mut log, &runner, &tree, Some("plugins"))
            .unwrap()
            .expect("backup should run");

        assert_eq!(
            artifact,
            backups.join("live-20260830-120000-file-plugins.tgz")
        );
        assert!(artifact.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&artifact).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o400);
        }
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let tree = dir.path().join("plugins");
        fs::create_dir(&tree).unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir(&backups).unwrap();

        let mut mgr = manager(Some(backups.clone()), 0);
        let runner = ProcessRunner::new(true, false);
        let mut log = quiet_log();

        let artifact = mgr
            .backup_file_tree(&mut log, &runner, &tree, Some("plugins"))
            .unwrap();
        // would-be path is reported, nothing is written
        assert!(artifact.is_some());
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 0);
        assert!(log.render(5).contains("DRYRUN: "));
    }

    #[test]
    fn test_dry_run_skips_sweep() {
        let dir = tempfile::TempDir::new().unwrap();
        let old = dir.path().join("live-old-db-wp.sql");
        fs::write(&old, "x").unwrap();
        age_file(&old, 30);
        let tree = dir.path().join("plugins");
        fs::create_dir(&tree).unwrap();

        let mut mgr = manager(Some(dir.path().to_path_buf()), 10);
        let runner = ProcessRunner::new(true, false);
        let mut log = quiet_log();

        mgr.backup_file_tree(&mut log, &runner, &tree, Some("plugins"))
            .unwrap();
        assert!(old.exists());
    }

    #[test]
    fn test_database_backup_command_masks_in_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut mgr = manager(Some(dir.path().to_path_buf()), 0);
        let runner = ProcessRunner::new(true, false);
        let mut log = ResultLog::new(vec!["sekrit".to_string()], false, 1);

        let db = DbIdentity {
            label: "Live".to_string(),
            host: "db.example.com".to_string(),
            name: "wp_live".to_string(),
            user: "wp".to_string(),
            password: "sekrit".to_string(),
            prefix: "wp_".to_string(),
        };

        let artifact = mgr.backup_database(&mut log, &runner, &db).unwrap();
        assert_eq!(
            artifact.unwrap(),
            dir.path().join("live-20260830-120000-db-wp_live.sql")
        );
        let rendered = log.render(5);
        assert!(rendered.contains("--host=db.example.com"));
        assert!(!rendered.contains("sekrit"));
    }

    #[test]
    fn test_backup_disabled() {
        let dir = tempfile::TempDir::new().unwrap();
        let tree = dir.path().join("plugins");
        fs::create_dir(&tree).unwrap();

        let mut mgr = manager(Some(dir.path().to_path_buf()), 0);
        mgr.enabled = false;
        let runner = ProcessRunner::new(false, false);
        let mut log = quiet_log();

        let result = mgr
            .backup_file_tree(&mut log, &runner, &tree, None)
            .unwrap();
        assert!(result.is_none());
        assert!(log.render(5).contains("File backup off"));
    }
}
