//! The `sweep` subcommand.

use crate::core::backup::BackupManager;
use crate::core::log::ResultLog;
use crate::models::config::Config;
use crate::Result;
use colored::Colorize;

/// Run a retention sweep over the destination backup root.
pub fn sweep(config: &Config) -> Result<()> {
    if config.dest_backup_path.is_none() {
        println!("{}", "No dest_backup_path configured, nothing to sweep.".yellow());
        return Ok(());
    }
    if config.backup_keep_days == 0 {
        println!(
            "{}",
            "backup_keep_days is 0, retention sweeping is disabled.".yellow()
        );
        return Ok(());
    }

    let mut log = ResultLog::new(config.secrets(), true, 5);
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let mut manager = BackupManager::new(
        config.dest_backup_path.clone(),
        config.backup_keep_days,
        true,
        "sweep",
        &timestamp,
        &config.mysqldump_path,
    );

    let deleted = manager.sweep_old_backups(&mut log);
    if deleted {
        println!("{}", "Old backups deleted.".green());
    } else {
        println!("Nothing to delete.");
    }
    Ok(())
}
