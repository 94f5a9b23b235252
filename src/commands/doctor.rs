//! `doctor` command: report what would stop an install or update.
use anyhow::{Result, bail};

use super::App;
use crate::doctor::{self, CheckStatus, HealthReport};

/// Run every health check and print the report.
///
/// # Errors
///
/// Returns an error when any check is an error.
pub fn run(app: &App) -> Result<()> {
    let platform = match app.detect_platform() {
        Ok(platform) => Some(platform),
        Err(e) => {
            app.log.error(&format!("{e:#}"));
            None
        }
    };
    let state = app.load_state();
    let report = doctor::diagnose(&app.ctx, &app.manifest, platform.as_ref(), state.as_ref());
    print(app, &report);

    let errors = report.count(CheckStatus::Error);
    if errors > 0 {
        bail!("{errors} check(s) failed");
    }
    Ok(())
}

fn print(app: &App, report: &HealthReport) {
    app.log.stage("Health report");
    for check in &report.checks {
        let line = format!("{} {}: {}", check.status.marker(), check.name, check.message);
        match check.status {
            CheckStatus::Error => app.log.error(&line),
            CheckStatus::Warning => app.log.warn(&line),
            CheckStatus::Ok | CheckStatus::Skipped => app.log.info(&line),
        }
    }

    app.log.stage("Summary");
    app.log.info(&format!(
        "{} passed, {} warning(s), {} error(s), {} skipped",
        report.count(CheckStatus::Ok),
        report.count(CheckStatus::Warning),
        report.count(CheckStatus::Error),
        report.count(CheckStatus::Skipped)
    ));

    let fixes = report.fixes();
    if !fixes.is_empty() {
        app.log.stage("Suggested fixes");
        for (idx, fix) in fixes.iter().enumerate() {
            app.log.info(&format!("{}. {fix}", idx + 1));
        }
    }
}
