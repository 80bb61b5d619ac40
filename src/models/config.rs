//! Configuration model.
//!
//! All configuration is read once at startup from a TOML file and validated
//! eagerly. After `Config::load` succeeds the structures are read-only for
//! the rest of the run.

use crate::models::site::{validate_db, validate_site, DbIdentity, Site};
use crate::models::tables::TableGroupResolver;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default file patterns excluded from every file push.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".svn", ".htaccess", "tmp/", "wp-config.php"];

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sites, keyed by name.
    pub sites: BTreeMap<String, Site>,
    /// Database identities, keyed by name.
    pub dbs: BTreeMap<String, DbIdentity>,
    /// Operator-defined table groups: group key -> bare table names.
    #[serde(default)]
    pub table_groups: BTreeMap<String, Vec<String>>,
    /// File patterns excluded from every push.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,
    /// Where undo files are written (source side).
    #[serde(default)]
    pub source_backup_path: Option<PathBuf>,
    /// Where backup archives and dumps are written (destination side).
    #[serde(default)]
    pub dest_backup_path: Option<PathBuf>,
    /// Days to keep backups; 0 disables the retention sweep.
    #[serde(default)]
    pub backup_keep_days: u32,
    /// Path to rsync.
    #[serde(default = "default_rsync")]
    pub rsync_path: String,
    /// Path to mysql.
    #[serde(default = "default_mysql")]
    pub mysql_path: String,
    /// Path to mysqldump.
    #[serde(default = "default_mysqldump")]
    pub mysqldump_path: String,
    /// Echo log entries up to this level (1=summary .. 5=verbose).
    #[serde(default = "default_output_level")]
    pub output_level: u8,
}

fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

fn default_rsync() -> String {
    "rsync".to_string()
}

fn default_mysql() -> String {
    "mysql".to_string()
}

fn default_mysqldump() -> String {
    "mysqldump".to_string()
}

fn default_output_level() -> u8 {
    1
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(crate::Error::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.fill_labels();
        config.validate()?;
        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitesync")
            .join("sitesync.toml")
    }

    /// Default empty labels to the config key.
    fn fill_labels(&mut self) {
        for (key, site) in self.sites.iter_mut() {
            if site.label.is_empty() {
                site.label = key.clone();
            }
        }
        for (key, db) in self.dbs.iter_mut() {
            if db.label.is_empty() {
                db.label = key.clone();
            }
        }
    }

    /// Fail fast on anything a push would otherwise trip over mid-run.
    fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(crate::Error::InvalidConfig("no sites defined".to_string()));
        }
        for (key, site) in &self.sites {
            if let Some(problem) = validate_site(key, site) {
                return Err(crate::Error::InvalidConfig(problem));
            }
            if !self.dbs.contains_key(&site.db) {
                return Err(crate::Error::InvalidConfig(format!(
                    "site '{}' references unknown db '{}'",
                    key, site.db
                )));
            }
        }
        for (key, db) in &self.dbs {
            if let Some(problem) = validate_db(key, db) {
                return Err(crate::Error::InvalidConfig(problem));
            }
        }
        for (key, tables) in &self.table_groups {
            if tables.is_empty() {
                return Err(crate::Error::InvalidConfig(format!(
                    "table group '{}' is empty",
                    key
                )));
            }
        }
        if self.output_level == 0 {
            return Err(crate::Error::InvalidConfig(
                "output_level must be between 1 and 5".to_string(),
            ));
        }
        Ok(())
    }

    /// Look up a site by name.
    pub fn site(&self, name: &str) -> Result<&Site> {
        self.sites
            .get(name)
            .ok_or_else(|| crate::Error::UnknownSite(name.to_string()))
    }

    /// Look up the database identity for a site.
    pub fn db_for_site(&self, site: &Site) -> Result<&DbIdentity> {
        self.dbs
            .get(&site.db)
            .ok_or_else(|| crate::Error::UnknownDatabase(site.db.clone()))
    }

    /// Table-group resolver over the configured custom groups.
    pub fn table_resolver(&self) -> TableGroupResolver {
        TableGroupResolver::new(self.table_groups.clone())
    }

    /// All configured DB passwords, for log masking.
    pub fn secrets(&self) -> Vec<String> {
        self.dbs
            .values()
            .map(|db| db.password.clone())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
backup_keep_days = 10
source_backup_path = "/backups/undo"
dest_backup_path = "/backups"

[sites.staging]
web_path = "/var/www/staging"
db = "staging"

[sites.live]
label = "Production"
web_path = "/var/www/live"
db = "live"
live = true

[dbs.staging]
name = "wp_staging"
user = "wp"
pw = "stagingpass"
prefix = "wp_"

[dbs.live]
name = "wp_live"
user = "wp"
pw = "livepass"
prefix = "wp_"

[table_groups]
shop = ["shop_orders", "shop_items"]
"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sitesync.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_sample() {
        let (_dir, path) = write_config(SAMPLE);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.site("staging").unwrap().label, "staging");
        assert_eq!(config.site("live").unwrap().label, "Production");
        assert!(config.site("live").unwrap().live);

        let db = config
            .db_for_site(config.site("staging").unwrap())
            .unwrap();
        assert_eq!(db.name, "wp_staging");
        assert_eq!(db.prefix, "wp_");

        assert_eq!(config.excludes, default_excludes());
        assert_eq!(config.backup_keep_days, 10);
        assert_eq!(config.table_groups["shop"].len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/sitesync.toml")).unwrap_err();
        assert!(matches!(err, crate::Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_unknown_db_reference() {
        let bad = SAMPLE.replace("db = \"staging\"", "db = \"missing\"");
        let (_dir, path) = write_config(&bad);
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_prefix_rejected() {
        let bad = SAMPLE.replace("prefix = \"wp_\"", "prefix = \"\"");
        let (_dir, path) = write_config(&bad);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_secrets_collects_passwords() {
        let (_dir, path) = write_config(SAMPLE);
        let config = Config::load(&path).unwrap();
        let secrets = config.secrets();
        assert!(secrets.contains(&"stagingpass".to_string()));
        assert!(secrets.contains(&"livepass".to_string()));
    }

    #[test]
    fn test_unknown_site() {
        let (_dir, path) = write_config(SAMPLE);
        let config = Config::load(&path).unwrap();
        assert!(matches!(
            config.site("qa").unwrap_err(),
            crate::Error::UnknownSite(_)
        ));
    }
}
