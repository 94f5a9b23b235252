//! Install command implementation.
use anyhow::Result;

use super::App;
use crate::cli::InstallOpts;
use crate::machine::Prompter;
use crate::setup::{self, InstallOptions, InstallResult};
use crate::state::State;

impl From<&InstallOpts> for InstallOptions {
    fn from(opts: &InstallOpts) -> Self {
        Self {
            auto: opts.auto,
            minimal: opts.minimal,
            skip_deps: opts.skip_deps,
            skip_stow: opts.skip_stow,
            skip_external: opts.skip_external,
            skip_machine: opts.skip_machine,
            overwrite: opts.overwrite,
            force: opts.force,
        }
    }
}

/// Run the install command.
///
/// State is written only when every phase finished cleanly.
///
/// # Errors
///
/// Returns an error if platform detection fails, the state cannot be
/// written, or any item failed.
pub fn run(app: &App, opts: &InstallOpts, prompter: &mut Prompter<'_>) -> Result<()> {
    app.log.info(&format!("dotstow {}", super::version::string()));

    let prior = app.load_state();
    let result = setup::install(
        &app.ctx,
        &app.manifest,
        prior.as_ref(),
        prompter,
        InstallOptions::from(opts),
    )?;
    report(app, &result);

    if !result.has_errors() && !app.ctx.dry_run {
        let mut state = prior.unwrap_or_else(|| State::new(&app.ctx.root, app.manifest.display_name()));
        result.record_into(&mut state, &app.manifest, &app.ctx);
        app.save_state(&state)?;
    }

    if !result.has_errors() && !app.manifest.post_install.trim().is_empty() {
        app.log.stage("Next steps");
        for line in app.manifest.post_install.trim().lines() {
            app.log.info(line);
        }
    }

    let failures = result.failures();
    app.finish(failures.len())
}

fn report(app: &App, result: &InstallResult) {
    app.log.stage("Results");
    for line in result.summary().lines() {
        app.log.info(line);
    }
    for failure in result.failures() {
        app.log.error(&failure.to_string());
    }
}
