//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sitesync - push files and database tables between site environments
#[derive(Parser, Debug)]
#[command(name = "sitesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Push resources from one site to another
    Push {
        /// Source site name
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Destination site name
        #[arg(value_name = "DEST")]
        dest: String,

        /// Push the plugins directory
        #[arg(long)]
        plugins: bool,

        /// Push the uploads directory
        #[arg(long)]
        uploads: bool,

        /// Push the whole themes directory
        #[arg(long)]
        themes: bool,

        /// Push a single theme by name
        #[arg(long, value_name = "THEME")]
        theme: Option<String>,

        /// Push the WordPress core files (everything except wp-content)
        #[arg(long)]
        wp_core: bool,

        /// Push the database, limited to these table groups
        /// (options, comments, content, users, multisite, or a custom group)
        #[arg(long, value_name = "GROUPS", value_delimiter = ',')]
        db_groups: Option<Vec<String>>,

        /// Push the entire database
        #[arg(long)]
        all_tables: bool,

        /// Rehearse only: log every command, execute nothing
        #[arg(long)]
        dry_run: bool,

        /// Skip the pre-push destination backup
        #[arg(long)]
        no_backup: bool,

        /// Suppress live output (the leveled log is still kept)
        #[arg(short, long)]
        quiet: bool,

        /// Print the push report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the external tools are available
    Check,

    /// Delete backups older than the configured retention window
    Sweep,

    /// Show the most recent undo file for the configured backup root
    LastUndo,
}
