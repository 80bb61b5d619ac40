//! File tree synchronization.
//!
//! Makes a destination directory's file set match a source directory:
//! copies new and changed files, deletes what exists only at the
//! destination, respects the exclude list, and refuses to operate through
//! symlinked roots.
//!
//! Two strategies behind the same call: `Native` shells out to rsync with
//! archive+compress+delete semantics; `Fallback` is a pure in-process
//! mirror using checksum comparison, for hosts without rsync. The strategy
//! is chosen once when the session is built.

use crate::core::log::ResultLog;
use crate::core::runner::ProcessRunner;
use crate::core::undo::{UndoRecord, UndoRecorder};
use crate::utils::fs as fsutil;
use crate::utils::hash;
use crate::Result;
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// How file trees are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// External rsync.
    Native,
    /// In-process recursive copy/delete.
    Fallback,
}

/// Counters reported after a fallback sync.
#[derive(Debug, Default, Clone, Copy)]
struct SyncStats {
    copied: usize,
    skipped: usize,
    deleted: usize,
}

/// Mirrors one directory tree onto another.
#[derive(Debug, Clone)]
pub struct FileSyncer {
    pub strategy: SyncStrategy,
    pub rsync_path: String,
    pub excludes: Vec<String>,
}

impl FileSyncer {
    pub fn new(strategy: SyncStrategy, rsync_path: &str, excludes: Vec<String>) -> Self {
        Self {
            strategy,
            rsync_path: rsync_path.to_string(),
            excludes,
        }
    }

    /// Mirror `source` onto `dest`.
    ///
    /// When a backup artifact and label are supplied and the sync succeeds,
    /// an undo record describing how to restore the pre-push tree is handed
    /// to the recorder. Returns whether the sync succeeded; precondition
    /// refusals (symlinked roots) are reported as failure after logging.
    pub fn sync(
        &self,
        log: &mut ResultLog,
        runner: &ProcessRunner,
        undo: &UndoRecorder,
        source: &Path,
        dest: &Path,
        backup_file: Option<&Path>,
        label: Option<&str>,
    ) -> Result<bool> {
        if fsutil::is_symlink(source) {
            log.record(
                &format!(
                    "Could not push from {} because it is a symlink and not a real directory.",
                    source.display()
                ),
                1,
            );
            return Ok(false);
        }
        if fsutil::is_symlink(dest) {
            log.record(
                &format!(
                    "Could not push to {} because it is a symlink and not a real directory.",
                    dest.display()
                ),
                1,
            );
            return Ok(false);
        }

        if !runner.dry_run && !dest.exists() {
            std::fs::create_dir_all(dest)?;
        }

        match self.strategy {
            SyncStrategy::Native => {
                self.sync_native(log, runner, undo, source, dest, backup_file, label)
            }
            SyncStrategy::Fallback => {
                self.sync_fallback(log, runner, undo, source, dest, backup_file, label)
            }
        }
    }

    fn rsync_options(&self) -> String {
        let mut options = String::from("-avz --delete");
        for exclude in &self.excludes {
            options.push_str(&format!(" --exclude='{}'", exclude.trim()));
        }
        options
    }

    fn sync_native(
        &self,
        log: &mut ResultLog,
        runner: &ProcessRunner,
        undo: &UndoRecorder,
        source: &Path,
        dest: &Path,
        backup_file: Option<&Path>,
        label: Option<&str>,
    ) -> Result<bool> {
        let options = self.rsync_options();
        // trailing slashes make rsync mirror contents instead of nesting
        // the source directory inside the destination
        let command = format!(
            "{} {} '{}' '{}'",
            self.rsync_path,
            options,
            fsutil::trailing_slash(source),
            fsutil::trailing_slash(dest)
        );

        log.record(
            &format!("Files source path: {}", source.display()),
            2,
        );
        log.record(&format!("Files dest path: {}", dest.display()), 2);

        // rsync can exit 0 after partial transfers; scan output too
        let pattern = Regex::new(r"rsync error")
            .map_err(|e| crate::Error::other(format!("bad failure pattern: {}", e)))?;
        let outcome = runner.run(log, &command, 3, Some(&pattern))?;
        log.record(crate::core::log::SEPARATOR, 1);

        if outcome.success {
            if let (Some(backup_file), Some(label)) = (backup_file, label) {
                self.record_native_undo(log, undo, &command, dest, backup_file, label, &options);
            }
        }

        Ok(outcome.success)
    }

    /// Undo for the native strategy: extract the archive next to the other
    /// backups, then mirror the extracted copy back onto the live path.
    fn record_native_undo(
        &self,
        log: &mut ResultLog,
        undo: &UndoRecorder,
        original: &str,
        dest: &Path,
        backup_file: &Path,
        label: &str,
        options: &str,
    ) {
        let backup_root = match backup_file.parent() {
            Some(root) => root,
            None => return,
        };
        let undo_dir = format!("{}-{}-undo_files", undo.dest_name, undo.timestamp);

        let prep = format!(
            "cd '{}'; mkdir '{}'; cd '{}'; tar -zpxf '{}'",
            backup_root.display(),
            undo_dir,
            undo_dir,
            backup_file.display()
        );
        let restore = format!(
            "'{}' {} '{}/{}/{}/' '{}'",
            self.rsync_path,
            options,
            backup_root.display(),
            undo_dir,
            label,
            fsutil::trailing_slash(dest)
        );

        undo.record(
            log,
            &UndoRecord {
                kind: "rsync".to_string(),
                original: original.to_string(),
                undo_commands: vec![prep, restore],
                notes: vec![],
            },
        );
    }

    fn sync_fallback(
        &self,
        log: &mut ResultLog,
        runner: &ProcessRunner,
        undo: &UndoRecorder,
        source: &Path,
        dest: &Path,
        backup_file: Option<&Path>,
        label: Option<&str>,
    ) -> Result<bool> {
        let description = format!(
            "builtin sync '{}' -> '{}'",
            source.display(),
            dest.display()
        );

        if runner.dry_run {
            log.record(&format!("DRYRUN: {}", description), 3);
            return Ok(false);
        }

        log.record(
            &format!("Files source path: {}", source.display()),
            2,
        );
        log.record(&format!("Files dest path: {}", dest.display()), 2);

        let mut stats = SyncStats::default();
        self.copy_tree(log, source, dest, &mut stats)?;
        self.delete_extraneous(log, source, dest, &mut stats)?;

        log.record(
            &format!(
                "Copied {} file(s), {} unchanged, deleted {} extraneous entr(ies)",
                stats.copied, stats.skipped, stats.deleted
            ),
            2,
        );
        log.record(crate::core::log::SEPARATOR, 1);

        self.validate_mirror(log, source, dest);

        if backup_file.is_some() && label.is_some() {
            // acknowledged gap: no automatic reversal for the builtin strategy
            undo.record(
                log,
                &UndoRecord::unsupported(
                    "filesync",
                    &description,
                    "undo is not supported for the builtin sync strategy; restore manually from the backup archive",
                ),
            );
        }

        Ok(true)
    }

    /// Copy new and changed files from `source` into `dest`, recursively.
    fn copy_tree(
        &self,
        log: &mut ResultLog,
        source: &Path,
        dest: &Path,
        stats: &mut SyncStats,
    ) -> Result<()> {
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if self.is_excluded(&name) {
                log.record(&format!("Excluded: {}", name), 4);
                continue;
            }

            let src_path = entry.path();
            let dst_path = dest.join(&name);
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                // an entry whose type changed between the sides is replaced,
                // matching rsync --delete semantics
                if dst_path.exists() && !dst_path.is_dir() {
                    std::fs::remove_file(&dst_path)?;
                    log.record(&format!("Deleted {}", dst_path.display()), 4);
                    stats.deleted += 1;
                }
                if !dst_path.exists() {
                    std::fs::create_dir_all(&dst_path)?;
                }
                self.copy_tree(log, &src_path, &dst_path, stats)?;
            } else if file_type.is_file() {
                if dst_path.is_dir() {
                    std::fs::remove_dir_all(&dst_path)?;
                    log.record(&format!("Deleted {}", dst_path.display()), 4);
                    stats.deleted += 1;
                }
                // incrementality: identical content is never re-copied
                let changed = if dst_path.exists() {
                    hash::sha256_file(&src_path)? != hash::sha256_file(&dst_path)?
                } else {
                    true
                };
                if changed {
                    std::fs::copy(&src_path, &dst_path)?;
                    log.record(&format!("Copied {}", src_path.display()), 4);
                    stats.copied += 1;
                } else {
                    stats.skipped += 1;
                }
            } else {
                log.record(
                    &format!("Skipping special file {}", src_path.display()),
                    4,
                );
            }
        }
        Ok(())
    }

    /// Delete destination entries with no counterpart under the source.
    ///
    /// Walks bottom-up so emptied directories can be removed after their
    /// contents. A directory still holding excluded entries is kept.
    fn delete_extraneous(
        &self,
        log: &mut ResultLog,
        source: &Path,
        dest: &Path,
        stats: &mut SyncStats,
    ) -> Result<()> {
        for entry in WalkDir::new(dest)
            .min_depth(1)
            .contents_first(true)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let rel = match entry.path().strip_prefix(dest) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if rel
                .components()
                .any(|c| self.is_excluded(&c.as_os_str().to_string_lossy()))
            {
                continue;
            }
            if source.join(rel).exists() {
                continue;
            }

            if entry.file_type().is_dir() {
                // fails while non-empty, which only happens when excluded
                // entries remain inside
                match std::fs::remove_dir(entry.path()) {
                    Ok(()) => {
                        log.record(&format!("Deleted {}", entry.path().display()), 4);
                        stats.deleted += 1;
                    }
                    Err(e) => {
                        log.record(
                            &format!("Kept {}: {}", entry.path().display(), e),
                            4,
                        );
                    }
                }
            } else {
                std::fs::remove_file(entry.path())?;
                log.record(&format!("Deleted {}", entry.path().display()), 4);
                stats.deleted += 1;
            }
        }
        Ok(())
    }

    /// Advisory post-sync check: report source files missing or differing
    /// at the destination. Mismatches are logged, not failed.
    fn validate_mirror(&self, log: &mut ResultLog, source: &Path, dest: &Path) {
        let mut mismatches = 0usize;
        for entry in WalkDir::new(source)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let rel = match entry.path().strip_prefix(source) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if rel
                .components()
                .any(|c| self.is_excluded(&c.as_os_str().to_string_lossy()))
            {
                continue;
            }
            let mirrored = dest.join(rel);
            let matches = mirrored.exists()
                && match (hash::sha256_file(entry.path()), hash::sha256_file(&mirrored)) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                };
            if !matches {
                mismatches += 1;
                log.record(&format!("Post-sync mismatch: {}", rel.display()), 2);
            }
        }
        if mismatches > 0 {
            log.record(
                &format!("Post-sync validation found {} mismatch(es)", mismatches),
                2,
            );
        }
    }

    /// Exclude patterns match whole path components; a trailing slash in
    /// the pattern (`tmp/`) is tolerated.
    fn is_excluded(&self, name: &str) -> bool {
        self.excludes
            .iter()
            .any(|pattern| pattern.trim().trim_end_matches('/') == name)
    }
}
