//! Table groups and table-list resolution.
//!
//! A table group is a named, ordered set of database tables pushed as one
//! unit. Built-in groups cover the standard WordPress tables; custom groups
//! come from the config.

use crate::Result;
use std::collections::BTreeMap;

/// A named group of tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableGroup {
    Options,
    Comments,
    Content,
    Users,
    Multisite,
    AllTables,
    /// Operator-defined group, looked up in the config.
    Custom(String),
}

impl TableGroup {
    /// Parse a group name as given on the command line or in a request.
    pub fn parse(name: &str) -> Self {
        match name {
            "options" => TableGroup::Options,
            "comments" => TableGroup::Comments,
            "content" => TableGroup::Content,
            "users" => TableGroup::Users,
            "multisite" => TableGroup::Multisite,
            "all_tables" | "all-tables" => TableGroup::AllTables,
            other => TableGroup::Custom(other.to_string()),
        }
    }

    /// Bare (unprefixed) table names for a built-in group.
    ///
    /// `AllTables` resolves to an empty list: the dump is not table-scoped.
    fn builtin_tables(&self) -> Option<&'static [&'static str]> {
        match self {
            TableGroup::Options => Some(&["options"]),
            TableGroup::Comments => Some(&["commentmeta", "comments"]),
            TableGroup::Content => Some(&[
                "links",
                "postmeta",
                "posts",
                "term_relationships",
                "term_taxonomy",
                "terms",
            ]),
            TableGroup::Users => Some(&["usermeta", "users"]),
            TableGroup::Multisite => Some(&[
                "blogs",
                "blog_versions",
                "registration_log",
                "signups",
                "site",
                "sitemeta",
            ]),
            TableGroup::AllTables => Some(&[]),
            TableGroup::Custom(_) => None,
        }
    }
}

/// Result of resolving table groups against a prefix and custom groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableResolution {
    /// Prefix-qualified table names, in request order.
    pub tables: Vec<String>,
    /// Whether the push must be followed by a cross-site domain fixup.
    ///
    /// Set when options, multisite or the whole database are pushed, or when
    /// a multisite source is pushed with no explicit group selection.
    pub needs_domain_fix: bool,
}

impl TableResolution {
    /// `--tables wp_a wp_b` fragment for the dump command, empty when the
    /// dump is not table-scoped.
    pub fn tables_arg(&self) -> String {
        if self.tables.is_empty() {
            String::new()
        } else {
            format!(" --tables {}", self.tables.join(" "))
        }
    }
}

/// Apply the configured prefix to a bare table name.
///
/// Custom groups may carry a literal `%prefix%` token; it is rewritten here
/// so prefixing stays a single explicit step.
fn prefix_table(prefix: &str, bare: &str) -> String {
    if bare.contains("%prefix%") {
        bare.replace("%prefix%", prefix)
    } else {
        format!("{}{}", prefix, bare)
    }
}

/// Resolves symbolic table groups to concrete, prefix-qualified table lists.
#[derive(Debug, Clone, Default)]
pub struct TableGroupResolver {
    /// Operator-defined groups: group key -> ordered bare table names.
    pub custom_groups: BTreeMap<String, Vec<String>>,
}

impl TableGroupResolver {
    pub fn new(custom_groups: BTreeMap<String, Vec<String>>) -> Self {
        Self { custom_groups }
    }

    /// Resolve a list of groups for a source site with the given prefix.
    ///
    /// An unknown custom group is a fatal configuration error, never a
    /// silent skip.
    pub fn resolve(
        &self,
        groups: &[TableGroup],
        prefix: &str,
        source_is_multisite: bool,
    ) -> Result<TableResolution> {
        let mut resolution = TableResolution::default();

        // An empty selection on a multisite source pushes everything, which
        // carries the cross-site domain rows with it.
        if groups.is_empty() && source_is_multisite {
            resolution.needs_domain_fix = true;
        }

        for group in groups {
            match group {
                TableGroup::Options | TableGroup::Multisite | TableGroup::AllTables => {
                    resolution.needs_domain_fix = true;
                }
                _ => {}
            }

            let bare: Vec<String> = match group.builtin_tables() {
                Some(names) => names.iter().map(|s| s.to_string()).collect(),
                None => {
                    let key = match group {
                        TableGroup::Custom(key) => key,
                        _ => unreachable!("builtin groups always have tables"),
                    };
                    self.custom_groups
                        .get(key)
                        .cloned()
                        .ok_or_else(|| crate::Error::UnknownTableGroup(key.clone()))?
                }
            };

            for name in bare {
                resolution.tables.push(prefix_table(prefix, &name));
            }
        }

        Ok(resolution)
    }
}
