//! Maintenance window controller.
//!
//! While a destination is being mutated, a `.maintenance` sentinel file in
//! its web root marks the application unavailable. The window must be
//! closed again on every exit path; `turn_off` is called explicitly on the
//! normal and error paths, and `Drop` removes the sentinel as a backstop if
//! a panic unwinds past the push.

use crate::core::log::ResultLog;
use std::path::PathBuf;

/// Two-state maintenance toggle for one destination.
#[derive(Debug)]
pub struct MaintenanceWindow {
    sentinel: PathBuf,
    dry_run: bool,
    on: bool,
}

impl MaintenanceWindow {
    pub fn new(sentinel: PathBuf, dry_run: bool) -> Self {
        Self {
            sentinel,
            dry_run,
            on: false,
        }
    }

    /// Whether the window is currently open.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Mark the destination unavailable.
    ///
    /// Best-effort: the in-memory state flips even if the file write fails.
    pub fn turn_on(&mut self, log: &mut ResultLog) {
        log.record("Maintenance mode on", 1);
        if self.dry_run {
            log.record(&format!("DRYRUN: write {}", self.sentinel.display()), 3);
        } else {
            let content = format!("<?php $upgrading = {}; ?>\n", chrono::Utc::now().timestamp());
            if let Err(e) = std::fs::write(&self.sentinel, content) {
                log.record(&format!("Could not write maintenance file: {}", e), 2);
            }
        }
        log.record(crate::core::log::SEPARATOR, 1);
        self.on = true;
    }

    /// Mark the destination available again.
    pub fn turn_off(&mut self, log: &mut ResultLog) {
        if !self.on {
            return;
        }
        log.record("Maintenance mode off", 1);
        if self.dry_run {
            log.record(&format!("DRYRUN: remove {}", self.sentinel.display()), 3);
        } else {
            self.remove_sentinel();
        }
        log.record(crate::core::log::SEPARATOR, 1);
        self.on = false;
    }

    fn remove_sentinel(&self) {
        if self.sentinel.exists() {
            if let Err(e) = std::fs::remove_file(&self.sentinel) {
                tracing::warn!(
                    "could not remove maintenance file {}: {}",
                    self.sentinel.display(),
                    e
                );
            }
        }
    }
}

impl Drop for MaintenanceWindow {
    fn drop(&mut self) {
        // safety net for abnormal unwind; the normal paths call turn_off
        if self.on {
            tracing::warn!("maintenance window left on, forcing off");
            if !self.dry_run {
                self.remove_sentinel();
            }
            self.on = false;
        }
    }
}
