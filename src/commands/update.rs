//! Update command implementation.
use anyhow::Result;

use super::App;
use crate::cli::UpdateOpts;
use crate::setup::{self, UpdateOptions, UpdateResult};
use crate::state::State;

/// Run the update command.
///
/// # Errors
///
/// Returns an error if the root is not a git repository, the pull fails,
/// or any restow or external update failed.
pub fn run(app: &mut App, opts: &UpdateOpts) -> Result<()> {
    let platform = app.detect_platform()?;
    let prior = app.load_state();
    let result = setup::update(
        &app.ctx,
        &mut app.manifest,
        &app.manifest_path,
        prior.as_ref(),
        &platform,
        UpdateOptions {
            update_external: opts.external,
            skip_restow: opts.skip_restow,
        },
    )?;

    for failure in &result.restow.failed {
        app.log.error(&failure.to_string());
    }
    if let Some(external) = &result.external {
        for failure in &external.failed {
            app.log
                .error(&format!("external '{}': {}", failure.dep.id, failure.error));
        }
    }
    for error in &result.errors {
        app.log.error(&format!("{error:#}"));
    }

    if !result.has_errors() && !app.ctx.dry_run {
        let mut state = prior.unwrap_or_else(|| State::new(&app.ctx.root, app.manifest.display_name()));
        record(app, &mut state, &result);
        app.save_state(&state)?;
    }

    app.finish(failed(&result))
}

fn record(app: &App, state: &mut State, result: &UpdateResult) {
    for name in &result.restow.success {
        if !state.has_config(name) {
            let path = app
                .manifest
                .config(name)
                .map_or(name.as_str(), |c| c.source_dir());
            state.add_config(name, path);
        }
    }
    if let Some(external) = &result.external {
        for dep in external.cloned.iter().chain(&external.updated) {
            state.set_external(&dep.id, &app.ctx.expand(&dep.destination));
        }
    }
    state.touch();
}

fn failed(result: &UpdateResult) -> usize {
    result.restow.failed.len()
        + result.external.as_ref().map_or(0, |e| e.failed.len())
        + result.errors.len()
}
