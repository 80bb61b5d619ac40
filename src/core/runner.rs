//! External process runner.
//!
//! Runs a command line through the host shell, with stderr merged into
//! stdout. Output is captured and, when echo is on, streamed to the
//! operator as it arrives. Several of the wrapped tools report errors on
//! exit 0, so a caller-supplied failure pattern matched against the
//! accumulated output also fails the run.
//!
//! In dry-run mode nothing is executed: the command is recorded with a
//! `DRYRUN:` prefix and the run reports failure with no output.

use crate::core::log::ResultLog;
use crate::Result;
use regex::Regex;
use std::io::{Read, Write};
use std::process::{Command, Stdio};

/// Outcome of one command run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub output: String,
}

/// Synchronous shell-command runner.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    pub dry_run: bool,
    pub echo: bool,
}

impl ProcessRunner {
    pub fn new(dry_run: bool, echo: bool) -> Self {
        Self { dry_run, echo }
    }

    /// Run a command, logging it at `level`.
    ///
    /// Returns `Err` only when the process cannot be spawned at all;
    /// a process that runs and fails is a normal `RunOutcome`.
    pub fn run(
        &self,
        log: &mut ResultLog,
        command: &str,
        level: u8,
        failure_pattern: Option<&Regex>,
    ) -> Result<RunOutcome> {
        if self.dry_run {
            log.record(&format!("DRYRUN: {}", command), level);
            return Ok(RunOutcome {
                success: false,
                output: String::new(),
            });
        }

        log.record(&format!("RUN: {}", command), level);

        // the whole command list runs inside one group so the stderr merge
        // covers every stage of a pipe, not just the last simple command
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(format!("{{ {} ; }} 2>&1", command))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| crate::Error::SpawnError(format!("{}: {}", command, e)))?;

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            let mut buf = [0u8; 4096];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                let chunk = String::from_utf8_lossy(&buf[..n]);
                if self.echo {
                    print!("{}", chunk);
                    let _ = std::io::stdout().flush();
                }
                output.push_str(&chunk);
            }
        }

        let status = child.wait()?;
        let mut success = status.success();

        if success {
            if let Some(pattern) = failure_pattern {
                if pattern.is_match(&output) {
                    tracing::debug!("output matched failure pattern: {}", pattern);
                    success = false;
                }
            }
        }

        Ok(RunOutcome { success, output })
    }
}
