//! Core logging types: phases, progress events, and the [`Log`] trait.
use std::fmt;

/// Orchestration phase an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Host platform detection.
    Platform,
    /// Package dependency installation.
    Dependencies,
    /// Symlinking config groups.
    Stow,
    /// Cloning external assets.
    External,
    /// Rendering machine-specific configs.
    Machine,
    /// Pulling and restowing an existing install.
    Update,
    /// Tearing an install down.
    Uninstall,
}

impl Phase {
    /// Human-readable name used in stage headers and summaries.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Platform => "Platform",
            Self::Dependencies => "Dependencies",
            Self::Stow => "Configs",
            Self::External => "External",
            Self::Machine => "Machine configs",
            Self::Update => "Update",
            Self::Uninstall => "Uninstall",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// What happened to a single item within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Work on the item is about to begin.
    Started,
    /// The item completed successfully.
    Done,
    /// The item was skipped (already present, condition not met, ...).
    Skipped,
    /// The item failed; the phase continues with the next one.
    Failed,
    /// The item would have been acted on without dry-run.
    DryRun,
}

/// A structured per-item progress notification.
///
/// `current` is 1-based; `total` is the number of items in the batch.
/// Both are zero for events that do not belong to a counted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Phase that emitted the event.
    pub phase: Phase,
    /// Item name or id, when the event concerns a single item.
    pub item: Option<String>,
    /// What happened.
    pub outcome: Outcome,
    /// 1-based position within the batch.
    pub current: usize,
    /// Batch size.
    pub total: usize,
    /// Human-readable detail.
    pub message: String,
}

impl ProgressEvent {
    /// Create an event for a phase with no item or count.
    #[must_use]
    pub fn new(phase: Phase, outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            phase,
            item: None,
            outcome,
            current: 0,
            total: 0,
            message: message.into(),
        }
    }

    /// Attach the item this event concerns.
    #[must_use]
    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    /// Attach the batch position.
    #[must_use]
    pub const fn at(mut self, current: usize, total: usize) -> Self {
        self.current = current;
        self.total = total;
        self
    }

    /// Render the event as a single console line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut line = String::new();
        if self.total > 0 {
            line.push_str(&format!("[{}/{}] ", self.current, self.total));
        }
        if let Some(item) = &self.item {
            line.push_str(item);
            if !self.message.is_empty() {
                line.push_str(": ");
            }
        }
        line.push_str(&self.message);
        line
    }
}

/// Phase result for summary reporting.
#[derive(Debug, Clone)]
pub struct PhaseEntry {
    /// Phase the entry summarizes.
    pub phase: Phase,
    /// Final status of the phase.
    pub status: PhaseStatus,
    /// Optional detail message (e.g., skip reason or counts).
    pub message: Option<String>,
}

/// Status of a completed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// Phase completed without item failures.
    Ok,
    /// Phase was not run (disabled by an option, nothing to do).
    Skipped,
    /// Phase ran in dry-run mode; no changes were applied.
    DryRun,
    /// At least one item in the phase failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) forwards to [`tracing`]; tests use a
/// recording implementation so orchestration code can be observed without a
/// subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Report per-item progress.
    fn progress(&self, event: &ProgressEvent);
    /// Record a phase result for the summary.
    fn record_phase(&self, phase: Phase, status: PhaseStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_with_count_and_item() {
        let event = ProgressEvent::new(Phase::External, Outcome::Done, "cloned")
            .item("tpm")
            .at(2, 3);
        assert_eq!(event.render(), "[2/3] tpm: cloned");
    }

    #[test]
    fn render_without_count() {
        let event = ProgressEvent::new(Phase::Stow, Outcome::Skipped, "nothing to do");
        assert_eq!(event.render(), "nothing to do");
    }

    #[test]
    fn render_item_only() {
        let event = ProgressEvent::new(Phase::Stow, Outcome::Done, "").item("git");
        assert_eq!(event.render(), "git");
    }

    #[test]
    fn phase_titles() {
        assert_eq!(Phase::Stow.to_string(), "Configs");
        assert_eq!(Phase::Machine.title(), "Machine configs");
    }
}
