//! Multi-phase operations: install, update, and uninstall.
pub mod install;
pub mod uninstall;
pub mod update;

use std::fmt;

pub use install::{InstallOptions, InstallResult, install, install_with_platform};
pub use uninstall::{UninstallOptions, UninstallResult, uninstall};
pub use update::{UpdateOptions, UpdateResult, update};

use crate::context::Context;
use crate::error::TemplateError;
use crate::logging::PhaseStatus;
use crate::machine::RenderResult;
use crate::stow::Skipped;

/// One failed item, flattened for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// `dependency`, `config`, `external`, `machine`, or `error`.
    pub kind: &'static str,
    /// Item name; empty for phase-level errors.
    pub name: String,
    /// Rendered cause.
    pub cause: String,
}

impl Failure {
    fn new(kind: &'static str, name: &str, cause: impl fmt::Display) -> Self {
        Self {
            kind,
            name: name.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.cause)
        } else {
            write!(f, "{} '{}': {}", self.kind, self.name, self.cause)
        }
    }
}

/// A machine config that could not be collected, rendered, or removed.
#[derive(Debug)]
pub struct MachineFailure {
    /// Machine config id.
    pub id: String,
    /// The cause.
    pub error: TemplateError,
}

/// Outcome of the machine configs phase.
#[derive(Debug, Default)]
pub struct MachineOutcome {
    /// Rendered (and, outside dry runs, written).
    pub configured: Vec<RenderResult>,
    /// Failed.
    pub failed: Vec<MachineFailure>,
    /// Not acted on.
    pub skipped: Vec<Skipped>,
}

impl MachineOutcome {
    fn skip(&mut self, id: &str, reason: &str) {
        self.skipped.push(Skipped::new(id, reason));
    }

    fn fail(&mut self, id: &str, error: TemplateError) {
        self.failed.push(MachineFailure {
            id: id.to_string(),
            error,
        });
    }
}

/// Phase status for a phase that finished with `failed` item failures.
#[must_use]
pub fn phase_status(ctx: &Context, failed: usize) -> PhaseStatus {
    if failed > 0 {
        PhaseStatus::Failed
    } else if ctx.dry_run {
        PhaseStatus::DryRun
    } else {
        PhaseStatus::Ok
    }
}
