//! Push orchestration.
//!
//! A `PushSession` owns everything one push needs: the result log, the
//! process runner, the backup manager, the undo recorder and the two
//! synchronizers, all sharing a single session timestamp. Resources are
//! pushed in sequence and are independent units of work; one resource
//! failing never rolls back another.

use crate::core::backup::BackupManager;
use crate::core::dbsync::DatabaseSyncer;
use crate::core::filesync::{FileSyncer, SyncStrategy};
use crate::core::log::ResultLog;
use crate::core::maintenance::MaintenanceWindow;
use crate::core::runner::ProcessRunner;
use crate::core::undo::UndoRecorder;
use crate::models::config::Config;
use crate::models::push::{PushReport, PushRequest};
use crate::models::site::{same_directory, DbIdentity, Site};
use crate::models::tables::TableGroupResolver;
use crate::preflight;
use crate::utils::fs as fsutil;
use crate::Result;
use std::path::{Path, PathBuf};

/// One push from a source site to a destination site.
#[derive(Debug)]
pub struct PushSession {
    request: PushRequest,
    source_name: String,
    dest_name: String,
    source: Site,
    dest: Site,
    source_db: DbIdentity,
    dest_db: DbIdentity,
    resolver: TableGroupResolver,
    pub log: ResultLog,
    runner: ProcessRunner,
    backup: BackupManager,
    undo: UndoRecorder,
    syncer: FileSyncer,
    db: DatabaseSyncer,
    /// Session timestamp shared by every artifact of this push.
    pub timestamp: String,
}

impl PushSession {
    /// Build a session for one push. Fails fast on unknown sites, a
    /// source pushed onto itself, or broken configuration.
    pub fn new(
        config: &Config,
        source_name: &str,
        dest_name: &str,
        request: PushRequest,
        echo: bool,
    ) -> Result<Self> {
        if source_name == dest_name {
            return Err(crate::Error::other(format!(
                "Source and destination sites are the same: {}",
                source_name
            )));
        }

        let source = config.site(source_name)?.clone();
        let dest = config.site(dest_name)?.clone();
        if same_directory(&source.web_path, &dest.web_path) {
            return Err(crate::Error::other(format!(
                "Source and destination web paths are the same: {}",
                source.web_path.display()
            )));
        }
        for site in [&source, &dest] {
            fsutil::ensure_directory(&site.web_path)?;
            fsutil::reject_symlink(&site.web_path)?;
        }

        let source_db = config.db_for_site(&source)?.clone();
        let dest_db = config.db_for_site(&dest)?.clone();

        let mut log = ResultLog::new(config.secrets(), echo, config.output_level);
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();

        let rsync_path = resolve_tool(&config.rsync_path, "rsync", &mut log);
        let mysql_path = resolve_tool(&config.mysql_path, "mysql", &mut log);
        let mysqldump_path = resolve_tool(&config.mysqldump_path, "mysqldump", &mut log);

        let runner = ProcessRunner::new(request.dry_run, echo);

        // strategy is fixed here, once; dry runs assume rsync so the
        // rehearsal logs the commands a real run would issue
        let strategy = if request.dry_run || preflight::check_rsync(&rsync_path).success {
            SyncStrategy::Native
        } else {
            log.record(
                &format!(
                    "rsync not found at {}, using the builtin sync strategy",
                    rsync_path
                ),
                3,
            );
            SyncStrategy::Fallback
        };

        let backup = BackupManager::new(
            config.dest_backup_path.clone(),
            config.backup_keep_days,
            request.backup,
            dest_name,
            &timestamp,
            &mysqldump_path,
        );
        let undo = UndoRecorder::new(
            config.source_backup_path.clone(),
            dest_name,
            &timestamp,
            request.dry_run,
        );
        let syncer = FileSyncer::new(strategy, &rsync_path, config.excludes.clone());
        let db = DatabaseSyncer::new(&mysql_path, &mysqldump_path);

        Ok(Self {
            request,
            source_name: source_name.to_string(),
            dest_name: dest_name.to_string(),
            source,
            dest,
            source_db,
            dest_db,
            resolver: config.table_resolver(),
            log,
            runner,
            backup,
            undo,
            syncer,
            db,
            timestamp,
        })
    }

    /// Which sync strategy this session will use.
    pub fn strategy(&self) -> SyncStrategy {
        self.syncer.strategy
    }

    /// Path of this session's undo file, if undo recording is enabled.
    pub fn undo_file(&self) -> Option<PathBuf> {
        self.undo.undo_file()
    }

    /// Run the push and return the aggregated report.
    pub fn run(&mut self) -> Result<PushReport> {
        let mut report = PushReport {
            source: self.source_name.clone(),
            dest: self.dest_name.clone(),
            dry_run: self.request.dry_run,
            ..Default::default()
        };

        if self.request.dry_run {
            self.log.record("DRY RUN: no changes will be made", 1);
            self.log.separator();
        }

        if self.request.is_empty() {
            self.log.record("Nothing selected to push.", 1);
            return Ok(report);
        }

        for (label, source_path, dest_path, extra_exclude) in self.file_resources() {
            let ok = self.push_file_tree(&label, &source_path, &dest_path, extra_exclude)?;
            report.record(&label, ok);
        }

        if self.request.db {
            match self.push_database() {
                Ok((ok, needs_domain_fix)) => {
                    report.record("database", ok);
                    report.needs_domain_fix = needs_domain_fix;
                }
                Err(e) => {
                    // a precondition failure aborts only this resource
                    self.log.record(&format!("Database not pushed: {}", e), 1);
                    self.log.separator();
                    report.record_failure("database");
                }
            }
        }

        if report.dry_run && report.success() {
            self.log.record(
                &format!(
                    "Dry run from {} to {} complete",
                    self.source_name, self.dest_name
                ),
                1,
            );
        } else {
            self.log.record(
                &format!(
                    "Push from {} to {}: {}",
                    self.source_name,
                    self.dest_name,
                    if report.success() { "OK" } else { "FAILED" }
                ),
                1,
            );
        }

        Ok(report)
    }

    /// The requested file-tree resources, in push order.
    fn file_resources(&self) -> Vec<(String, PathBuf, PathBuf, Option<String>)> {
        let mut resources = Vec::new();

        if self.request.plugins {
            resources.push((
                "plugins".to_string(),
                self.source.plugins_path(),
                self.dest.plugins_path(),
                None,
            ));
        }
        if self.request.uploads {
            resources.push((
                "uploads".to_string(),
                self.source.uploads_path(),
                self.dest.uploads_path(),
                None,
            ));
        }
        if self.request.themes {
            resources.push((
                "themes".to_string(),
                self.source.themes_path(),
                self.dest.themes_path(),
                None,
            ));
        }
        if let Some(ref theme) = self.request.theme {
            resources.push((
                theme.clone(),
                self.source.theme_path(theme),
                self.dest.theme_path(theme),
                None,
            ));
        }
        if self.request.wp_core {
            // core files only: the content tree is its own resource
            let content_dir = Path::new(&self.source.wp_content_dir)
                .components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().to_string());
            resources.push((
                "wp-core".to_string(),
                self.source.wp_path(),
                self.dest.wp_path(),
                content_dir,
            ));
        }

        resources
    }

    fn push_file_tree(
        &mut self,
        label: &str,
        source_path: &Path,
        dest_path: &Path,
        extra_exclude: Option<String>,
    ) -> Result<bool> {
        let backup_file =
            self.backup
                .backup_file_tree(&mut self.log, &self.runner, dest_path, Some(label))?;

        let mut syncer = self.syncer.clone();
        if let Some(exclude) = extra_exclude {
            syncer.excludes.push(exclude);
        }

        let mut maintenance =
            MaintenanceWindow::new(self.dest.maintenance_file(), self.runner.dry_run);
        maintenance.turn_on(&mut self.log);

        self.log.record(
            &format!(
                "Pushing files from {} to {}",
                self.source_name, self.dest_name
            ),
            1,
        );

        let result = syncer.sync(
            &mut self.log,
            &self.runner,
            &self.undo,
            source_path,
            dest_path,
            backup_file.as_deref(),
            Some(label),
        );

        // off on success and error paths alike; Drop only backstops panics
        maintenance.turn_off(&mut self.log);
        result
    }

    fn push_database(&mut self) -> Result<(bool, bool)> {
        let resolution = self.resolver.resolve(
            &self.request.db_groups,
            &self.source_db.prefix,
            self.source.multisite,
        )?;

        let mut maintenance =
            MaintenanceWindow::new(self.dest.maintenance_file(), self.runner.dry_run);

        let ok = self.db.push(
            &mut self.log,
            &self.runner,
            &mut self.backup,
            &self.undo,
            &mut maintenance,
            &self.source_db,
            &self.dest_db,
            &resolution,
        )?;

        Ok((ok, resolution.needs_domain_fix))
    }
}

/// Fall back to the bare command name when a configured absolute tool path
/// does not exist. Many of the wrapped tools live on $PATH anyway.
fn resolve_tool(configured: &str, fallback: &str, log: &mut ResultLog) -> String {
    if configured.contains('/') && !Path::new(configured).exists() {
        log.record(
            &format!(
                "{} not found at {}, using '{}' and hoping the system path is set correctly",
                fallback, configured, fallback
            ),
            3,
        );
        fallback.to_string()
    } else {
        configured.to_string()
    }
}
