//! `deps` command: check and install declared packages.
use anyhow::Result;

use super::App;
use crate::cli::DepsCommand;
use crate::deps::{self, DepsOptions};
use crate::logging::Phase;
use crate::setup::phase_status;
use crate::platform::Platform;

/// Run a `deps` subcommand.
///
/// # Errors
///
/// Returns an error if the platform has no usable package manager, or if
/// dependencies are missing (`check`) or failed to install (`install`).
pub fn run(app: &App, cmd: &DepsCommand) -> Result<()> {
    let platform = app.detect_platform()?;
    match cmd {
        DepsCommand::Check => check(app, &platform),
        DepsCommand::Install { all } => install(app, &platform, *all),
    }
}

fn check(app: &App, platform: &Platform) -> Result<()> {
    let result = deps::check(&app.ctx, &app.manifest, platform)?;
    for (title, tier) in [
        ("Critical", &result.critical),
        ("Core", &result.core),
        ("Optional", &result.optional),
    ] {
        if tier.is_empty() {
            continue;
        }
        app.log.stage(title);
        for status in tier {
            let marker = if status.installed { "✓" } else { "✗" };
            let mut line = format!("{marker} {}", status.item.name);
            if status.package != status.item.name {
                line.push_str(&format!(" ({})", status.package));
            }
            app.log.info(&line);
        }
    }

    let missing: Vec<&str> = result.missing().map(|s| s.item.name.as_str()).collect();
    if missing.is_empty() {
        app.log.info("all dependencies installed");
        return Ok(());
    }
    for status in result.missing_critical() {
        app.log
            .warn(&format!("critical dependency missing: {}", status.item.name));
    }
    anyhow::bail!("{} missing: {}", missing.len(), missing.join(", "))
}

fn install(app: &App, platform: &Platform, all: bool) -> Result<()> {
    app.log.stage(Phase::Dependencies.title());
    let outcome = deps::install(
        &app.ctx,
        &app.manifest,
        platform,
        DepsOptions { only_missing: !all },
    )?;
    for failure in &outcome.failed {
        app.log.error(&failure.to_string());
    }
    let status = phase_status(&app.ctx, outcome.failed.len());
    app.log.record_phase(
        Phase::Dependencies,
        status,
        Some(&format!(
            "{} installed, {} skipped",
            outcome.installed.len(),
            outcome.skipped.len()
        )),
    );
    app.finish(outcome.failed.len())
}
