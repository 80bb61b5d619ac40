//! Undo recording.
//!
//! Every mutating push appends a human-and-machine-readable block to a
//! per-destination undo file describing how to reverse it, and rewrites a
//! `last` pointer file naming the most recent undo file. Recording is
//! best-effort: a failure here is logged but never aborts the push.

use crate::core::log::ResultLog;
use crate::utils::fs as fsutil;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Name of the pointer file that always names the latest undo file.
pub const LAST_POINTER: &str = "last";

/// One reversal record.
#[derive(Debug, Clone)]
pub struct UndoRecord {
    /// Resource kind, e.g. "rsync" or "mysql".
    pub kind: String,
    /// The command that was (or would be) run.
    pub original: String,
    /// Literal shell commands that reverse it, in order. Empty when undo
    /// is unsupported for this strategy.
    pub undo_commands: Vec<String>,
    /// Free-form metadata, written as `# key:` / `## value` lines.
    pub notes: Vec<(String, String)>,
}

impl UndoRecord {
    /// Record that the given strategy cannot be undone automatically.
    pub fn unsupported(kind: &str, original: &str, reason: &str) -> Self {
        Self {
            kind: kind.to_string(),
            original: original.to_string(),
            undo_commands: Vec::new(),
            notes: vec![("unsupported".to_string(), reason.to_string())],
        }
    }
}

/// Appends undo records for one push session.
#[derive(Debug)]
pub struct UndoRecorder {
    /// Source-side backup root; `None` disables undo recording.
    pub root: Option<PathBuf>,
    pub dest_name: String,
    pub timestamp: String,
    pub dry_run: bool,
}

impl UndoRecorder {
    pub fn new(root: Option<PathBuf>, dest_name: &str, timestamp: &str, dry_run: bool) -> Self {
        Self {
            root,
            dest_name: dest_name.to_string(),
            timestamp: timestamp.to_string(),
            dry_run,
        }
    }

    /// Path of the undo file for this session, if recording is enabled.
    pub fn undo_file(&self) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(format!("{}-{}.undo", self.dest_name, self.timestamp)))
    }

    /// Append a record and rewrite the `last` pointer.
    ///
    /// Returns whether the record was written. Never fails the push.
    pub fn record(&self, log: &mut ResultLog, record: &UndoRecord) -> bool {
        let (root, undo_file) = match (&self.root, self.undo_file()) {
            (Some(root), Some(file)) => (root.clone(), file),
            _ => return false,
        };

        if self.dry_run {
            log.record(&format!("DRYRUN: undo record ({})", record.kind), 3);
            return false;
        }

        match self.write(&root, &undo_file, record) {
            Ok(()) => true,
            Err(e) => {
                // advisory only: the push proceeds without its undo record
                log.record(&format!("Could not write undo file: {}", e), 2);
                tracing::warn!("undo record failed: {}", e);
                false
            }
        }
    }

    fn write(
        &self,
        root: &PathBuf,
        undo_file: &PathBuf,
        record: &UndoRecord,
    ) -> crate::Result<()> {
        std::fs::create_dir_all(root)?;

        let mut text = String::from("#\n# start undo\n#\n");
        text.push_str(&format!("# type {}\n", record.kind));
        text.push_str("# original:\n");
        text.push_str(&format!("## {}\n", record.original));
        for (key, value) in &record.notes {
            text.push_str(&format!("# {}:\n## {}\n", key, value));
        }
        if !record.undo_commands.is_empty() {
            text.push_str("# undo command:\n");
            for command in &record.undo_commands {
                text.push_str(command);
                text.push('\n');
            }
            text.push('\n');
        }
        text.push_str("#\n# end undo\n#\n\n\n");

        // the file is locked 0400 between appends; relax, append, re-lock
        if undo_file.exists() {
            fsutil::chmod_writable(undo_file)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(undo_file)?;
        file.write_all(text.as_bytes())?;
        drop(file);
        fsutil::chmod_readonly(undo_file)?;

        // the pointer is rewritten only after the block is on disk, so it
        // never names an undo file that does not exist
        std::fs::write(root.join(LAST_POINTER), undo_file.display().to_string())?;

        Ok(())
    }

    /// Resolve the most recently written undo file under a backup root.
    pub fn last_undo_file(root: &std::path::Path) -> Option<PathBuf> {
        let pointer = root.join(LAST_POINTER);
        let content = std::fs::read_to_string(pointer).ok()?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}
