//! `stow` command: link, unlink, or relink single config groups.
use anyhow::{Result, bail};

use super::App;
use crate::cli::StowCommand;
use crate::config::ConfigItem;
use crate::logging::Phase;
use crate::setup::phase_status;
use crate::stow::{self, StowOptions, StowResult};

/// Run a `stow` subcommand.
///
/// # Errors
///
/// Returns an error for an unknown group, when stow is missing, or when any
/// group failed.
pub fn run(app: &App, cmd: &StowCommand) -> Result<()> {
    stow::validate_stow(&app.ctx)?;
    let opts = StowOptions {
        dry_run: app.ctx.dry_run,
        force: false,
    };

    match cmd {
        StowCommand::Add { name } => {
            let item = lookup(app, name)?;
            let result = stow::stow_configs(&app.ctx, std::slice::from_ref(&item), opts);
            if !app.ctx.dry_run && !result.success.is_empty() {
                let mut state = app.state_or_new();
                state.add_config(&item.name, item.source_dir());
                state.touch();
                app.save_state(&state)?;
            }
            finish(app, &result)
        }
        StowCommand::Remove { name } => {
            let state = app.load_state();
            let item = match app.manifest.config(name) {
                Some(item) => item.clone(),
                None => match state
                    .as_ref()
                    .and_then(|s| s.configs.iter().find(|c| &c.name == name))
                {
                    Some(c) => ConfigItem {
                        name: c.name.clone(),
                        path: c.path.clone(),
                        ..ConfigItem::default()
                    },
                    None => bail!("unknown config '{name}'"),
                },
            };
            let result = stow::unstow_configs(&app.ctx, std::slice::from_ref(&item), opts);
            if !app.ctx.dry_run
                && !result.success.is_empty()
                && let Some(mut state) = state
                && state.remove_config(name)
            {
                state.touch();
                app.save_state(&state)?;
            }
            finish(app, &result)
        }
        StowCommand::Refresh { name } => {
            let items = match name {
                Some(name) => vec![lookup(app, name)?],
                None => match app.load_state() {
                    Some(state) => state
                        .configs
                        .iter()
                        .filter_map(|c| app.manifest.config(&c.name).cloned())
                        .collect(),
                    None => app.manifest.configs.core.clone(),
                },
            };
            let result = stow::restow_configs(&app.ctx, &items, opts);
            finish(app, &result)
        }
    }
}

fn lookup(app: &App, name: &str) -> Result<ConfigItem> {
    match app.manifest.config(name) {
        Some(item) => Ok(item.clone()),
        None => bail!("unknown config '{name}'"),
    }
}

fn finish(app: &App, result: &StowResult) -> Result<()> {
    for skipped in &result.skipped {
        app.log
            .warn(&format!("{}: {}", skipped.name, skipped.reason));
    }
    for failure in &result.failed {
        app.log.error(&failure.to_string());
    }
    let status = phase_status(&app.ctx, result.failed.len());
    app.log.record_phase(
        Phase::Stow,
        status,
        Some(&format!("{} done", result.success.len())),
    );
    app.finish(result.failed.len())
}
