//! Site and database identity types.
//!
//! A "site" is one deployed environment (staging, live, a dev copy).
//! Each site resolves to exactly one database identity via its `db` key.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One deployed environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Display label (defaults to the config key).
    #[serde(default)]
    pub label: String,
    /// Filesystem root of the web install.
    pub web_path: PathBuf,
    /// WordPress directory relative to the web root ("" when WP is at the root).
    #[serde(default)]
    pub wp_dir: String,
    /// Content directory relative to the web root.
    #[serde(default = "default_content_dir")]
    pub wp_content_dir: String,
    /// Plugins directory relative to the web root.
    #[serde(default = "default_plugins_dir")]
    pub wp_plugins_dir: String,
    /// Uploads directory relative to the web root.
    #[serde(default = "default_uploads_dir")]
    pub wp_uploads_dir: String,
    /// Themes directory relative to the web root.
    #[serde(default = "default_themes_dir")]
    pub wp_themes_dir: String,
    /// Key into the `[dbs]` table.
    pub db: String,
    /// Primary domain, used for reporting.
    #[serde(default)]
    pub domain: String,
    /// Whether this is the live site.
    #[serde(default)]
    pub live: bool,
    /// Whether a page cache is active on this site.
    #[serde(default)]
    pub cache: bool,
    /// Whether only admins may log in while this site is a push destination.
    #[serde(default)]
    pub admin_only: bool,
    /// Whether this site is a multisite install.
    #[serde(default)]
    pub multisite: bool,
}

fn default_content_dir() -> String {
    "wp-content".to_string()
}

fn default_plugins_dir() -> String {
    "wp-content/plugins".to_string()
}

fn default_uploads_dir() -> String {
    "wp-content/uploads".to_string()
}

fn default_themes_dir() -> String {
    "wp-content/themes".to_string()
}

impl Site {
    /// Absolute path of the plugins directory.
    pub fn plugins_path(&self) -> PathBuf {
        crate::utils::fs::join_web_path(&self.web_path, &self.wp_plugins_dir)
    }

    /// Absolute path of the uploads directory.
    pub fn uploads_path(&self) -> PathBuf {
        crate::utils::fs::join_web_path(&self.web_path, &self.wp_uploads_dir)
    }

    /// Absolute path of the themes directory.
    pub fn themes_path(&self) -> PathBuf {
        crate::utils::fs::join_web_path(&self.web_path, &self.wp_themes_dir)
    }

    /// Absolute path of a single theme.
    pub fn theme_path(&self, theme: &str) -> PathBuf {
        self.themes_path().join(theme)
    }

    /// Absolute path of the WordPress install directory.
    pub fn wp_path(&self) -> PathBuf {
        crate::utils::fs::join_web_path(&self.web_path, &self.wp_dir)
    }

    /// Path of the maintenance sentinel file for this site.
    pub fn maintenance_file(&self) -> PathBuf {
        self.wp_path().join(".maintenance")
    }
}

/// Connection identity for one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbIdentity {
    /// Display label (defaults to the config key).
    #[serde(default)]
    pub label: String,
    /// Host, omitted from commands when empty (local socket).
    #[serde(default)]
    pub host: String,
    /// Database name.
    pub name: String,
    /// User name.
    pub user: String,
    /// Password. Masked in all logged output.
    #[serde(rename = "pw")]
    pub password: String,
    /// Table prefix, e.g. `wp_`.
    pub prefix: String,
}

impl DbIdentity {
    /// `--host=H` fragment, or empty for a local socket.
    pub fn host_arg(&self) -> String {
        if self.host.is_empty() {
            String::new()
        } else {
            format!(" --host={}", self.host)
        }
    }
}

/// Validate a site entry, returning a description of the first problem.
pub fn validate_site(key: &str, site: &Site) -> Option<String> {
    if site.web_path.as_os_str().is_empty() {
        return Some(format!("site '{}' has an empty web_path", key));
    }
    if !site.web_path.is_absolute() {
        return Some(format!(
            "site '{}' web_path must be absolute: {}",
            key,
            site.web_path.display()
        ));
    }
    if site.db.is_empty() {
        return Some(format!("site '{}' has no db key", key));
    }
    None
}

/// Validate a database entry.
pub fn validate_db(key: &str, db: &DbIdentity) -> Option<String> {
    if db.name.is_empty() {
        return Some(format!("db '{}' has an empty name", key));
    }
    if db.user.is_empty() {
        return Some(format!("db '{}' has an empty user", key));
    }
    if db.prefix.is_empty() {
        // the resolver prefixes every table name, so this cannot be defaulted
        return Some(format!("db '{}' has no table prefix", key));
    }
    None
}

/// True when both paths point at the same directory (best-effort, canonicalized).
pub fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a == b,
    }
}
