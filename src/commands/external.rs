//! `external` command: status, clone, update, and removal of external assets.
use anyhow::Result;

use super::App;
use crate::cli::ExternalCommand;
use crate::external::{self, ExternalOptions, ExternalResult, ExternalState};
use crate::logging::Phase;
use crate::setup::phase_status;

/// Run an `external` subcommand.
///
/// Successful clones, updates, and removals are mirrored into the state.
///
/// # Errors
///
/// Returns an error if the platform cannot be detected, `git` is missing,
/// or any asset failed.
pub fn run(app: &App, cmd: &ExternalCommand) -> Result<()> {
    match cmd {
        ExternalCommand::Status => status(app),
        ExternalCommand::Clone { id } => fetch(app, id.as_deref(), false),
        ExternalCommand::Update { id } => fetch(app, id.as_deref(), true),
        ExternalCommand::Remove { id } => remove(app, id),
    }
}

fn status(app: &App) -> Result<()> {
    let platform = app.detect_platform()?;
    let statuses = external::check_status(&app.ctx, &app.manifest, &platform);
    if statuses.is_empty() {
        app.log.info("no external assets declared");
        return Ok(());
    }
    app.log.stage("External");
    for status in &statuses {
        let marker = match status.state {
            ExternalState::Installed => "✓",
            ExternalState::Missing => "·",
            ExternalState::Skipped => "○",
            ExternalState::Error => "✗",
        };
        let mut line = format!(
            "{marker} {} ({}) -> {}",
            status.dep.display_name(),
            status.state,
            status.path.display()
        );
        if let Some(reason) = &status.reason {
            line.push_str(&format!(": {reason}"));
        }
        app.log.info(&line);
    }
    Ok(())
}

fn fetch(app: &App, id: Option<&str>, update: bool) -> Result<()> {
    let platform = app.detect_platform()?;
    let opts = ExternalOptions { update };
    if let Some(id) = id {
        external::clone_single(&app.ctx, &app.manifest, &platform, id, opts)?;
        if !app.ctx.dry_run
            && let Some(dep) = app.manifest.external(id)
        {
            let mut state = app.state_or_new();
            state.set_external(id, &app.ctx.expand(&dep.destination));
            state.touch();
            app.save_state(&state)?;
        }
        return Ok(());
    }

    app.log.stage(Phase::External.title());
    let result = external::clone_all(&app.ctx, &app.manifest, &platform, opts)?;
    report(app, &result)?;
    app.finish(result.failed.len())
}

fn report(app: &App, result: &ExternalResult) -> Result<()> {
    for failure in &result.failed {
        app.log
            .error(&format!("external '{}': {}", failure.dep.id, failure.error));
    }
    let status = phase_status(&app.ctx, result.failed.len());
    app.log.record_phase(
        Phase::External,
        status,
        Some(&format!(
            "{} cloned, {} updated, {} skipped",
            result.cloned.len(),
            result.updated.len(),
            result.skipped.len()
        )),
    );

    if app.ctx.dry_run || (result.cloned.is_empty() && result.updated.is_empty()) {
        return Ok(());
    }
    let mut state = app.state_or_new();
    for dep in result.cloned.iter().chain(&result.updated) {
        state.set_external(&dep.id, &app.ctx.expand(&dep.destination));
    }
    state.touch();
    app.save_state(&state)
}

fn remove(app: &App, id: &str) -> Result<()> {
    external::remove(&app.ctx, &app.manifest, id)?;
    if !app.ctx.dry_run
        && let Some(mut state) = app.load_state()
        && state.remove_external(id)
    {
        state.touch();
        app.save_state(&state)?;
    }
    Ok(())
}
