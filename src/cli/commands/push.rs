//! The `push` subcommand.

use crate::core::push::PushSession;
use crate::models::config::Config;
use crate::models::push::PushRequest;
use crate::models::tables::TableGroup;
use crate::Result;
use colored::Colorize;

/// Options collected from the command line.
#[derive(Debug, Default)]
pub struct PushArgs {
    pub source: String,
    pub dest: String,
    pub plugins: bool,
    pub uploads: bool,
    pub themes: bool,
    pub theme: Option<String>,
    pub wp_core: bool,
    pub db_groups: Option<Vec<String>>,
    pub all_tables: bool,
    pub dry_run: bool,
    pub no_backup: bool,
    pub quiet: bool,
    pub json: bool,
}

/// Run a push. Returns whether it succeeded.
pub fn push(config: &Config, args: PushArgs) -> Result<bool> {
    let request = build_request(&args);

    if args.dry_run && !args.quiet {
        println!("{}", "DRY RUN - no changes will be made".bold().yellow());
        println!();
    }

    let mut session = PushSession::new(config, &args.source, &args.dest, request, !args.quiet)?;
    let report = session.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.success());
    }

    if !args.quiet {
        println!();
        if report.success() {
            let verdict = if report.dry_run {
                "Dry run complete".to_string()
            } else {
                format!("Push from {} to {} complete", report.source, report.dest)
            };
            println!("{}", verdict.bold().green());
        } else {
            println!(
                "{}",
                format!("Push from {} to {} FAILED", report.source, report.dest)
                    .bold()
                    .red()
            );
            for outcome in report.outcomes.iter().filter(|o| !o.success && !o.rehearsed) {
                println!("  - {} failed", outcome.resource);
            }
        }
        if report.needs_domain_fix {
            println!(
                "{}",
                "Note: pushed tables carry cross-site domain references; fix site URLs on the destination."
                    .yellow()
            );
        }
        if let Some(undo_file) = session.undo_file() {
            if undo_file.exists() {
                println!("Undo file: {}", undo_file.display());
            }
        }
    }

    Ok(report.success())
}

fn build_request(args: &PushArgs) -> PushRequest {
    let mut db_groups: Vec<TableGroup> = args
        .db_groups
        .iter()
        .flatten()
        .map(|name| TableGroup::parse(name))
        .collect();
    if args.all_tables {
        db_groups = vec![TableGroup::AllTables];
    }
    let db = !db_groups.is_empty() || args.all_tables;

    PushRequest {
        plugins: args.plugins,
        uploads: args.uploads,
        themes: args.themes,
        theme: args.theme.clone(),
        wp_core: args.wp_core,
        db,
        db_groups,
        dry_run: args.dry_run,
        backup: !args.no_backup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_groups() {
        let args = PushArgs {
            db_groups: Some(vec!["comments".to_string(), "users".to_string()]),
            ..Default::default()
        };
        let request = build_request(&args);
        assert!(request.db);
        assert_eq!(
            request.db_groups,
            vec![TableGroup::Comments, TableGroup::Users]
        );
    }

    #[test]
    fn test_all_tables_wins() {
        let args = PushArgs {
            db_groups: Some(vec!["comments".to_string()]),
            all_tables: true,
            ..Default::default()
        };
        let request = build_request(&args);
        assert_eq!(request.db_groups, vec![TableGroup::AllTables]);
    }

    #[test]
    fn test_no_db_flags_no_db_push() {
        let args = PushArgs {
            plugins: true,
            ..Default::default()
        };
        let request = build_request(&args);
        assert!(!request.db);
        assert!(request.backup);
    }
}
