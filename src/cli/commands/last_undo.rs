//! The `last-undo` subcommand.

use crate::core::undo::UndoRecorder;
use crate::models::config::Config;
use crate::Result;
use colored::Colorize;

/// Print the most recent undo file and its contents.
pub fn last_undo(config: &Config) -> Result<()> {
    let root = match &config.source_backup_path {
        Some(root) => root,
        None => {
            println!(
                "{}",
                "No source_backup_path configured, undo recording is disabled.".yellow()
            );
            return Ok(());
        }
    };

    match UndoRecorder::last_undo_file(root) {
        Some(undo_file) => {
            println!("{} {}", "Last undo file:".bold(), undo_file.display());
            println!();
            match std::fs::read_to_string(&undo_file) {
                Ok(content) => print!("{}", content),
                Err(e) => println!("{}", format!("Could not read it: {}", e).red()),
            }
        }
        None => println!("No undo file recorded yet."),
    }
    Ok(())
}
