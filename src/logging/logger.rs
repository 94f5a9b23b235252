//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, Outcome, Phase, PhaseEntry, PhaseStatus, ProgressEvent};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// All messages are also written to a persistent log file at
/// `$XDG_CACHE_HOME/dotstow/<command>.log` (default `~/.cache/dotstow/<command>.log`)
/// with timestamps and ANSI codes stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    phases: Mutex<Vec<PhaseEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary. The file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            phases: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded phase entries.
    #[must_use]
    pub fn phase_entries(&self) -> Vec<PhaseEntry> {
        self.phases.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Report per-item progress at a level matching its outcome.
    pub fn progress(&self, event: &ProgressEvent) {
        let line = event.render();
        match event.outcome {
            Outcome::Started => self.debug(&line),
            Outcome::Done => self.info(&format!("\x1b[32m✓\x1b[0m {line}")),
            Outcome::Skipped => self.info(&format!("\x1b[2m○ {line}\x1b[0m")),
            Outcome::Failed => self.warn(&line),
            Outcome::DryRun => self.dry_run(&line),
        }
    }

    /// Record a phase result for the summary.
    pub fn record_phase(&self, phase: Phase, status: PhaseStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.phases.lock() {
            guard.push(PhaseEntry {
                phase,
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return `true` if any recorded phase has failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Count the number of failed phases.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.phases.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|p| p.status == PhaseStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded phases.
    pub fn print_summary(&self) {
        let phases = self.phase_entries();
        if phases.is_empty() {
            return;
        }

        self.stage("Summary");

        for entry in &phases {
            let (icon, color) = match entry.status {
                PhaseStatus::Ok => ("✓", "\x1b[32m"),
                PhaseStatus::Skipped => ("○", "\x1b[33m"),
                PhaseStatus::DryRun => ("~", "\x1b[37m"),
                PhaseStatus::Failed => ("✗", "\x1b[31m"),
            };

            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.phase));
        }

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn progress(&self, event: &ProgressEvent) {
        self.progress(event);
    }

    fn record_phase(&self, phase: Phase, status: PhaseStatus, message: Option<&str>) {
        self.record_phase(phase, status, message);
    }
}
