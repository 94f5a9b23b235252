//! Undo an install.
//!
//! Unstows groups, optionally deletes external assets and generated machine
//! configs, then removes the state. The dotfiles repository itself is never
//! deleted.
use crate::config::{ConfigItem, Manifest};
use crate::context::Context;
use crate::error::{ExternalError, StateError, TemplateError};
use crate::external::{self, ExternalFailure};
use crate::logging::Phase;
use crate::machine;
use crate::state::{State, StateStore};
use crate::stow::{self, StowOptions, StowResult};

use super::{MachineFailure, phase_status};

/// Options for [`uninstall`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallOptions {
    /// Delete external asset destinations.
    pub remove_external: bool,
    /// Delete generated machine config files.
    pub remove_machine: bool,
}

/// Outcome of [`uninstall`].
#[derive(Debug, Default)]
pub struct UninstallResult {
    /// Unstow of the installed groups.
    pub unstow: StowResult,
    /// External asset ids whose destination was deleted.
    pub externals_removed: Vec<String>,
    /// External assets that could not be deleted.
    pub externals_failed: Vec<ExternalFailure>,
    /// Machine config ids whose file was deleted.
    pub machine_removed: Vec<String>,
    /// Machine configs that could not be deleted.
    pub machine_failed: Vec<MachineFailure>,
    /// Whether the state file was removed.
    pub state_deleted: bool,
    /// Failure to update or remove the state file.
    pub state_error: Option<StateError>,
}

impl UninstallResult {
    /// Whether any step failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.unstow.failed.is_empty()
            || !self.externals_failed.is_empty()
            || !self.machine_failed.is_empty()
            || self.state_error.is_some()
    }
}

/// Unstow installed groups and clean up.
///
/// Groups come from `state`; without state every declared group is unstowed.
/// After a clean run the state file is deleted; after a partial failure it
/// is rewritten without the items that were removed. A dry run leaves the
/// state untouched.
pub fn uninstall(
    ctx: &Context,
    manifest: &Manifest,
    store: &StateStore,
    state: Option<State>,
    opts: UninstallOptions,
) -> UninstallResult {
    let mut result = UninstallResult::default();

    ctx.log.stage("Unstowing configs");
    let items: Vec<ConfigItem> = match &state {
        Some(state) => state
            .configs
            .iter()
            .map(|c| ConfigItem {
                name: c.name.clone(),
                path: c.path.clone(),
                ..ConfigItem::default()
            })
            .collect(),
        None => manifest.all_configs().cloned().collect(),
    };
    if !items.is_empty() {
        match stow::validate_stow(ctx) {
            Ok(()) => {
                result.unstow = stow::unstow_configs(
                    ctx,
                    &items,
                    StowOptions {
                        dry_run: ctx.dry_run,
                        force: false,
                    },
                );
            }
            Err(e) => {
                ctx.log.error(&format!("{e:#}"));
                result
                    .unstow
                    .failed
                    .extend(items.iter().map(|item| crate::error::StowError {
                        group: item.name.clone(),
                        source: format!("{e:#}").into(),
                    }));
            }
        }
    }
    ctx.log.record_phase(
        Phase::Uninstall,
        phase_status(ctx, result.unstow.failed.len()),
        Some(&format!("{} unstowed", result.unstow.success.len())),
    );

    if opts.remove_external {
        ctx.log.stage("Removing external assets");
        for dep in &manifest.external {
            match external::remove(ctx, manifest, &dep.id) {
                Ok(()) => result.externals_removed.push(dep.id.clone()),
                Err(ExternalError::NotInstalled { .. }) => {}
                Err(error) => result.externals_failed.push(ExternalFailure {
                    dep: dep.clone(),
                    error,
                }),
            }
        }
        ctx.log.record_phase(
            Phase::External,
            phase_status(ctx, result.externals_failed.len()),
            Some(&format!("{} removed", result.externals_removed.len())),
        );
    }

    if opts.remove_machine {
        ctx.log.stage("Removing machine configs");
        for prompt in &manifest.machine_config {
            match machine::remove(ctx, prompt) {
                Ok(_) => result.machine_removed.push(prompt.id.clone()),
                Err(TemplateError::NotConfigured(_)) => {}
                Err(error) => result.machine_failed.push(MachineFailure {
                    id: prompt.id.clone(),
                    error,
                }),
            }
        }
        ctx.log.record_phase(
            Phase::Machine,
            phase_status(ctx, result.machine_failed.len()),
            Some(&format!("{} removed", result.machine_removed.len())),
        );
    }

    if ctx.dry_run {
        ctx.log
            .dry_run(&format!("would remove state file {}", store.path().display()));
        return result;
    }

    if result.has_errors() {
        if let Some(mut state) = state {
            for name in &result.unstow.success {
                state.remove_config(name);
            }
            for id in &result.externals_removed {
                state.remove_external(id);
            }
            for id in &result.machine_removed {
                state.remove_machine_config(id);
            }
            result.state_error = store.save(&state).err();
        }
        return result;
    }

    match store.delete() {
        Ok(()) => result.state_deleted = true,
        Err(e) => result.state_error = Some(e),
    }
    result
}
