//! sitesync CLI
//!
//! A command-line tool for pushing files and database tables between site
//! environments, with backups and undo recording.

use clap::Parser;
use sitesync::cli::{
    args::{Cli, Commands},
    commands::{last_undo, push, sweep},
};
use sitesync::models::config::Config;
use sitesync::preflight;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Push {
            source,
            dest,
            plugins,
            uploads,
            themes,
            theme,
            wp_core,
            db_groups,
            all_tables,
            dry_run,
            no_backup,
            quiet,
            json,
        } => {
            let args = push::PushArgs {
                source,
                dest,
                plugins,
                uploads,
                themes,
                theme,
                wp_core,
                db_groups,
                all_tables,
                dry_run,
                no_backup,
                quiet,
                json,
            };
            let ok = push::push(&config, args)?;
            if !ok {
                std::process::exit(1);
            }
        }

        Commands::Check => {
            let results = preflight::run_preflight_checks(
                &config.rsync_path,
                &config.mysql_path,
                &config.mysqldump_path,
            );
            preflight::print_results(&results);
            if !preflight::all_passed(&results) {
                std::process::exit(1);
            }
        }

        Commands::Sweep => {
            sweep::sweep(&config)?;
        }

        Commands::LastUndo => {
            last_undo::last_undo(&config)?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("sitesync=debug")
    } else {
        EnvFilter::new("sitesync=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
