//! The install pipeline.
//!
//! Phases run in a fixed order (platform, dependencies, configs, external
//! assets, machine configs). Only platform detection can abort the run;
//! every later failure is collected into [`InstallResult`].
use std::fmt::Write as _;

use crate::config::{ConfigItem, Manifest};
use crate::context::Context;
use crate::deps::{self, DepsOptions, InstallOutcome};
use crate::error::PlatformError;
use crate::external::{self, ExternalOptions, ExternalResult};
use crate::logging::{Outcome, Phase, PhaseStatus, ProgressEvent};
use crate::machine::{self, PromptOptions, Prompter, RenderOptions};
use crate::platform::Platform;
use crate::state::{PlatformState, State};
use crate::stow::{self, Skipped, StowOptions, StowResult};

use super::{Failure, MachineOutcome, phase_status};

/// Options for [`install`].
#[derive(Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstallOptions {
    /// Never read input; prompts take their defaults.
    pub auto: bool,
    /// Stow only the core groups.
    pub minimal: bool,
    /// Skip the dependency phase.
    pub skip_deps: bool,
    /// Skip the configs phase.
    pub skip_stow: bool,
    /// Skip the external assets phase.
    pub skip_external: bool,
    /// Skip the machine configs phase.
    pub skip_machine: bool,
    /// Rewrite machine configs that already exist.
    pub overwrite: bool,
    /// Adopt conflicting files into the repository when stowing.
    pub force: bool,
}

/// Aggregate outcome of an install run.
#[derive(Debug)]
pub struct InstallResult {
    /// Detected platform.
    pub platform: Platform,
    /// Dependency phase.
    pub dependencies: InstallOutcome,
    /// Configs phase.
    pub stow: StowResult,
    /// External assets phase.
    pub external: ExternalResult,
    /// Machine configs phase.
    pub machine: MachineOutcome,
    /// Failures that belong to a whole phase rather than one item.
    pub errors: Vec<anyhow::Error>,
}

impl InstallResult {
    fn new(platform: Platform) -> Self {
        Self {
            platform,
            dependencies: InstallOutcome::default(),
            stow: StowResult::default(),
            external: ExternalResult::default(),
            machine: MachineOutcome::default(),
            errors: Vec::new(),
        }
    }

    /// Whether any phase reported a failure.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.dependencies.failed.is_empty()
            || !self.stow.failed.is_empty()
            || !self.external.failed.is_empty()
            || !self.machine.failed.is_empty()
            || !self.errors.is_empty()
    }

    /// Every failed item with its cause.
    #[must_use]
    pub fn failures(&self) -> Vec<Failure> {
        let mut out: Vec<Failure> = Vec::new();
        out.extend(
            self.dependencies
                .failed
                .iter()
                .map(|e| Failure::new("dependency", &e.name, e)),
        );
        out.extend(
            self.stow
                .failed
                .iter()
                .map(|e| Failure::new("config", &e.group, &e.source)),
        );
        out.extend(
            self.external
                .failed
                .iter()
                .map(|f| Failure::new("external", &f.dep.id, &f.error)),
        );
        out.extend(
            self.machine
                .failed
                .iter()
                .map(|f| Failure::new("machine", &f.id, &f.error)),
        );
        out.extend(
            self.errors
                .iter()
                .map(|e| Failure::new("error", "", format!("{e:#}"))),
        );
        out
    }

    /// Human-readable summary, one line per phase.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Platform: {}", self.platform.describe());
        let _ = writeln!(
            out,
            "Dependencies: {} installed, {} failed, {} skipped",
            self.dependencies.installed.len(),
            self.dependencies.failed.len(),
            self.dependencies.skipped.len()
        );
        let _ = writeln!(
            out,
            "Configs: {} stowed, {} failed, {} skipped",
            self.stow.success.len(),
            self.stow.failed.len(),
            self.stow.skipped.len()
        );
        let _ = writeln!(
            out,
            "External: {} cloned, {} updated, {} failed, {} skipped",
            self.external.cloned.len(),
            self.external.updated.len(),
            self.external.failed.len(),
            self.external.skipped.len()
        );
        let _ = writeln!(
            out,
            "Machine configs: {} configured, {} failed, {} skipped",
            self.machine.configured.len(),
            self.machine.failed.len(),
            self.machine.skipped.len()
        );
        let _ = write!(out, "Errors: {}", self.errors.len());
        out
    }

    /// Record every successful item into `state`.
    ///
    /// Failed and skipped items are never recorded. Nothing is recorded for
    /// a dry run.
    pub fn record_into(&self, state: &mut State, manifest: &Manifest, ctx: &Context) {
        if ctx.dry_run {
            return;
        }
        state.platform = PlatformState::from(&self.platform);
        state.manifest_name = manifest.display_name().to_string();
        for name in &self.stow.success {
            let path = manifest
                .config(name)
                .map_or_else(|| name.clone(), |c| c.source_dir().to_string());
            state.add_config(name, &path);
        }
        for dep in self.external.cloned.iter().chain(&self.external.updated) {
            state.set_external(&dep.id, &ctx.expand(&dep.destination));
        }
        for rendered in self.machine.configured.iter().filter(|r| r.written) {
            state.set_machine_config(&rendered.id, &rendered.destination);
        }
        state.touch();
    }
}

/// Detect the platform, then run every phase.
///
/// # Errors
///
/// Returns a [`PlatformError`] when detection fails; nothing else aborts.
pub fn install(
    ctx: &Context,
    manifest: &Manifest,
    state: Option<&State>,
    prompter: &mut Prompter<'_>,
    opts: InstallOptions,
) -> Result<InstallResult, PlatformError> {
    ctx.log.stage("Detecting platform");
    let platform = match Platform::detect(ctx.executor.as_ref()) {
        Ok(platform) => platform,
        Err(e) => {
            ctx.log
                .record_phase(Phase::Platform, PhaseStatus::Failed, Some(&e.to_string()));
            return Err(e);
        }
    };
    ctx.log.info(&platform.describe());
    ctx.log.record_phase(Phase::Platform, PhaseStatus::Ok, None);
    Ok(install_with_platform(
        ctx, manifest, &platform, state, prompter, opts,
    ))
}

/// Run every phase against an already detected platform.
pub fn install_with_platform(
    ctx: &Context,
    manifest: &Manifest,
    platform: &Platform,
    state: Option<&State>,
    prompter: &mut Prompter<'_>,
    opts: InstallOptions,
) -> InstallResult {
    let mut result = InstallResult::new(platform.clone());

    if opts.skip_deps {
        skip_phase(ctx, Phase::Dependencies);
    } else {
        dependencies_phase(ctx, manifest, platform, &mut result);
    }

    if opts.skip_stow {
        skip_phase(ctx, Phase::Stow);
    } else {
        stow_phase(ctx, manifest, platform, state, opts, &mut result);
    }

    if opts.skip_external {
        skip_phase(ctx, Phase::External);
    } else {
        external_phase(ctx, manifest, platform, &mut result);
    }

    if opts.skip_machine {
        skip_phase(ctx, Phase::Machine);
    } else {
        machine_phase(ctx, manifest, prompter, opts, &mut result);
    }

    result
}

fn skip_phase(ctx: &Context, phase: Phase) {
    ctx.log.debug(&format!("skipping {phase}"));
    ctx.log
        .record_phase(phase, PhaseStatus::Skipped, Some("skipped by option"));
}

fn dependencies_phase(ctx: &Context, manifest: &Manifest, platform: &Platform, result: &mut InstallResult) {
    ctx.log.stage(Phase::Dependencies.title());
    match deps::install(ctx, manifest, platform, DepsOptions { only_missing: true }) {
        Ok(outcome) => {
            for name in outcome.still_missing_critical() {
                ctx.log.warn(&format!("critical dependency missing: {name}"));
            }
            let msg = format!(
                "{} installed, {} failed",
                outcome.installed.len(),
                outcome.failed.len()
            );
            ctx.log.record_phase(
                Phase::Dependencies,
                phase_status(ctx, outcome.failed.len()),
                Some(&msg),
            );
            result.dependencies = outcome;
        }
        Err(e) => {
            ctx.log.error(&e.to_string());
            ctx.log
                .record_phase(Phase::Dependencies, PhaseStatus::Failed, Some(&e.to_string()));
            result.errors.push(e.into());
        }
    }
}

fn stow_phase(
    ctx: &Context,
    manifest: &Manifest,
    platform: &Platform,
    state: Option<&State>,
    opts: InstallOptions,
    result: &mut InstallResult,
) {
    ctx.log.stage(Phase::Stow.title());
    let groups: Vec<&ConfigItem> = if opts.minimal {
        manifest.configs.core.iter().collect()
    } else {
        manifest.all_configs().collect()
    };

    let mut skipped = Vec::new();
    let mut candidates: Vec<ConfigItem> = Vec::new();
    for item in groups {
        let reason = if !platform.matches_any(&item.platforms) {
            Some(format!("not available on {}", platform.os))
        } else if state.is_some_and(|s| s.has_config(&item.name)) {
            Some("already stowed".to_string())
        } else {
            None
        };
        match reason {
            Some(reason) => {
                ctx.progress(
                    &ProgressEvent::new(Phase::Stow, Outcome::Skipped, reason.as_str()).item(&item.name),
                );
                skipped.push(Skipped::new(&item.name, reason));
            }
            None => candidates.push(item.clone()),
        }
    }

    if !candidates.is_empty()
        && let Err(e) = stow::validate_stow(ctx)
    {
        ctx.log.error(&format!("{e:#}"));
        ctx.log
            .record_phase(Phase::Stow, PhaseStatus::Failed, Some(&e.to_string()));
        result.stow.skipped = skipped;
        result.errors.push(e);
        return;
    }

    let mut stowed = stow::stow_configs(
        ctx,
        &candidates,
        StowOptions {
            dry_run: ctx.dry_run,
            force: opts.force,
        },
    );
    skipped.append(&mut stowed.skipped);
    stowed.skipped = skipped;

    let msg = format!(
        "{} stowed, {} skipped",
        stowed.success.len(),
        stowed.skipped.len()
    );
    ctx.log.record_phase(
        Phase::Stow,
        phase_status(ctx, stowed.failed.len()),
        Some(&msg),
    );
    result.stow = stowed;
}

fn external_phase(ctx: &Context, manifest: &Manifest, platform: &Platform, result: &mut InstallResult) {
    ctx.log.stage(Phase::External.title());
    match external::clone_all(ctx, manifest, platform, ExternalOptions::default()) {
        Ok(outcome) => {
            let msg = format!(
                "{} cloned, {} skipped",
                outcome.cloned.len(),
                outcome.skipped.len()
            );
            ctx.log.record_phase(
                Phase::External,
                phase_status(ctx, outcome.failed.len()),
                Some(&msg),
            );
            result.external = outcome;
        }
        Err(e) => {
            ctx.log.error(&e.to_string());
            ctx.log
                .record_phase(Phase::External, PhaseStatus::Failed, Some(&e.to_string()));
            result.errors.push(e.into());
        }
    }
}

fn machine_phase(
    ctx: &Context,
    manifest: &Manifest,
    prompter: &mut Prompter<'_>,
    opts: InstallOptions,
    result: &mut InstallResult,
) {
    ctx.log.stage(Phase::Machine.title());
    let outcome = &mut result.machine;
    let prompt_opts = PromptOptions {
        skip_prompts: opts.auto,
    };
    for prompt in &manifest.machine_config {
        let destination = ctx.expand(&prompt.destination);
        if destination.exists() && !opts.overwrite {
            ctx.progress(
                &ProgressEvent::new(Phase::Machine, Outcome::Skipped, "already configured")
                    .item(&prompt.id),
            );
            outcome.skip(&prompt.id, "already configured");
            continue;
        }
        let rendered = prompter.collect(prompt, prompt_opts).and_then(|values| {
            machine::render_and_write(
                ctx,
                prompt,
                &values.values,
                RenderOptions {
                    overwrite: opts.overwrite,
                },
            )
        });
        match rendered {
            Ok(rendered) => outcome.configured.push(rendered),
            Err(error) => {
                ctx.progress(
                    &ProgressEvent::new(Phase::Machine, Outcome::Failed, error.to_string())
                        .item(&prompt.id),
                );
                outcome.fail(&prompt.id, error);
            }
        }
    }
    let msg = format!(
        "{} configured, {} skipped",
        outcome.configured.len(),
        outcome.skipped.len()
    );
    ctx.log.record_phase(
        Phase::Machine,
        phase_status(ctx, outcome.failed.len()),
        Some(&msg),
    );
}
