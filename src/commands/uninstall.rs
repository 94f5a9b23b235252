//! Uninstall command implementation.
use anyhow::Result;

use super::App;
use crate::cli::UninstallOpts;
use crate::machine::Prompter;
use crate::setup::{self, UninstallOptions};

/// Run the uninstall command.
///
/// Without `--force` the user must answer `y` or `yes` first; any other
/// answer leaves everything untouched.
///
/// # Errors
///
/// Returns an error if confirmation cannot be read or any item failed.
pub fn run(app: &App, opts: &UninstallOpts, prompter: &mut Prompter<'_>) -> Result<()> {
    if !opts.force && !app.ctx.dry_run {
        let question = format!(
            "Unstow all configs from {} and remove dotstow state?",
            app.ctx.home.display()
        );
        if !prompter.confirm(&question)? {
            app.log.info("aborted; nothing was changed");
            return Ok(());
        }
    }

    let state = app.load_state();
    let result = setup::uninstall(
        &app.ctx,
        &app.manifest,
        &app.store,
        state,
        UninstallOptions {
            remove_external: opts.remove_external,
            remove_machine: opts.remove_machine,
        },
    );

    for failure in &result.unstow.failed {
        app.log.error(&failure.to_string());
    }
    for failure in &result.externals_failed {
        app.log
            .error(&format!("external '{}': {}", failure.dep.id, failure.error));
    }
    for failure in &result.machine_failed {
        app.log
            .error(&format!("machine '{}': {}", failure.id, failure.error));
    }
    if let Some(e) = &result.state_error {
        app.log.error(&e.to_string());
    }
    if result.state_deleted {
        app.log
            .info(&format!("removed {}", app.store.path().display()));
    }

    app.finish(
        result.unstow.failed.len()
            + result.externals_failed.len()
            + result.machine_failed.len()
            + usize::from(result.state_error.is_some()),
    )
}
