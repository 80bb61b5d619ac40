//! Leveled result log.
//!
//! Append-only record of what a push did, levels 1 (summary) to 5
//! (verbose). Every configured database password is masked before an entry
//! is stored, so no render of the log can leak a credential. When live echo
//! is on, entries are also written to the operator's terminal as they are
//! recorded, filtered by the configured echo level.

/// Mask substituted for secrets in logged output.
const MASK: &str = "*****";

/// Conventional separator message, echoed as a blank line.
pub const SEPARATOR: &str = "--";

/// One log entry.
#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub level: u8,
    pub message: String,
}

/// Append-only, leveled message sink for one push.
#[derive(Debug, Default)]
pub struct ResultLog {
    entries: Vec<ResultEntry>,
    secrets: Vec<String>,
    echo: bool,
    echo_level: u8,
}

impl ResultLog {
    pub fn new(secrets: Vec<String>, echo: bool, echo_level: u8) -> Self {
        Self {
            entries: Vec::new(),
            secrets,
            echo,
            echo_level,
        }
    }

    /// Append a message at the given level, masking secrets first.
    pub fn record(&mut self, message: &str, level: u8) {
        let masked = self.mask(message.trim());

        if self.echo && self.echo_level >= level {
            if masked == SEPARATOR {
                println!();
            } else {
                println!("[{}] {}", level, masked);
            }
        }

        self.entries.push(ResultEntry {
            level,
            message: masked,
        });
    }

    /// Shorthand for a level-1 separator.
    pub fn separator(&mut self) {
        self.record(SEPARATOR, 1);
    }

    /// Render all entries up to `max_level`, in insertion order.
    pub fn render(&self, max_level: u8) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if entry.level <= max_level {
                out.push_str(&format!("[{}] {}\n", entry.level, entry.message));
            }
        }
        out
    }

    /// All entries, for programmatic inspection.
    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    fn mask(&self, message: &str) -> String {
        let mut masked = message.to_string();
        for secret in &self.secrets {
            if !secret.is_empty() {
                masked = masked.replace(secret, MASK);
            }
        }
        masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_render() {
        let mut log = ResultLog::new(vec![], false, 1);
        log.record("summary line", 1);
        log.record("detail line", 3);
        log.record("noise", 5);

        assert_eq!(log.render(1), "[1] summary line\n");
        assert_eq!(log.render(3), "[1] summary line\n[3] detail line\n");
        assert_eq!(log.entries().len(), 3);
    }

    #[test]
    fn test_secrets_masked_before_storage() {
        let mut log = ResultLog::new(vec!["hunter2".to_string()], false, 1);
        log.record("mysql -u wp -p'hunter2' wp_live", 3);

        let rendered = log.render(5);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("-p'*****'"));
    }

    #[test]
    fn test_order_preserved() {
        let mut log = ResultLog::new(vec![], false, 1);
        for i in 0..10 {
            log.record(&format!("entry {}", i), 1);
        }
        let rendered = log.render(1);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "[1] entry 0");
        assert_eq!(lines[9], "[1] entry 9");
    }

    #[test]
    fn test_messages_trimmed() {
        let mut log = ResultLog::new(vec![], false, 1);
        log.record("  padded  ", 1);
        assert_eq!(log.entries()[0].message, "padded");
    }
}
