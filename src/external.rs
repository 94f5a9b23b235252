//! External assets: third-party repositories placed at fixed destinations.
//!
//! Each asset is cloned (or copied, with its git metadata stripped) to a
//! destination, optionally only when its condition matches the platform.
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{ExternalDep, Manifest};
use crate::context::Context;
use crate::error::ExternalError;
use crate::git;
use crate::logging::{Outcome, Phase, ProgressEvent};
use crate::platform::Platform;

/// How an asset is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Shallow git clone; updatable with `pull`.
    Clone,
    /// Shallow clone with `.git` removed; a plain snapshot.
    Copy,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "clone" => Ok(Self::Clone),
            "copy" => Ok(Self::Copy),
            other => Err(other.to_string()),
        }
    }
}

/// Options for clone operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalOptions {
    /// Pull existing clones instead of skipping them.
    pub update: bool,
}

/// Why an asset was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The condition does not match this platform.
    ConditionNotMet,
    /// The destination exists and updating was not requested.
    AlreadyExists,
    /// The destination exists but is not a git clone, so it cannot be pulled.
    NotUpdatable,
    /// Dry run; nothing was changed.
    DryRun,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConditionNotMet => "condition not met",
            Self::AlreadyExists => "already exists",
            Self::NotUpdatable => "not a git clone",
            Self::DryRun => "dry run",
        })
    }
}

/// An asset that was not acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSkipped {
    /// The asset.
    pub dep: ExternalDep,
    /// Why.
    pub reason: SkipReason,
}

/// An asset whose operation failed.
#[derive(Debug)]
pub struct ExternalFailure {
    /// The asset.
    pub dep: ExternalDep,
    /// The cause.
    pub error: ExternalError,
}

/// Outcome of [`clone_all`].
#[derive(Debug, Default)]
pub struct ExternalResult {
    /// Newly cloned or copied.
    pub cloned: Vec<ExternalDep>,
    /// Existing clones that were pulled.
    pub updated: Vec<ExternalDep>,
    /// Not acted on.
    pub skipped: Vec<ExternalSkipped>,
    /// Failed.
    pub failed: Vec<ExternalFailure>,
}

/// Where an asset stands on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalState {
    /// Present at its destination.
    Installed,
    /// Applicable but absent.
    Missing,
    /// Condition does not match this platform.
    Skipped,
    /// The destination exists but is not usable (e.g. a file).
    Error,
}

impl fmt::Display for ExternalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Installed => "installed",
            Self::Missing => "missing",
            Self::Skipped => "skipped",
            Self::Error => "error",
        })
    }
}

/// Status report for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalStatus {
    /// The asset.
    pub dep: ExternalDep,
    /// Expanded destination.
    pub path: PathBuf,
    /// Its state.
    pub state: ExternalState,
    /// Extra detail for `Skipped` and `Error`.
    pub reason: Option<String>,
}

/// Whether every condition key matches the platform.
///
/// Values are comma-separated alternatives. Unknown keys are ignored; an
/// empty condition always matches.
#[must_use]
pub fn check_condition(condition: &BTreeMap<String, String>, platform: &Platform) -> bool {
    condition.iter().all(|(key, expected)| match key.as_str() {
        "platform" | "os" => any_of(expected, platform.os.as_str()),
        "distro" => any_of(expected, &platform.distro),
        "package_manager" => any_of(expected, &platform.package_manager),
        "arch" | "architecture" => any_of(expected, &platform.architecture),
        "wsl" => match expected.trim() {
            "true" => platform.is_wsl,
            "false" => !platform.is_wsl,
            _ => true,
        },
        _ => true,
    })
}

fn any_of(expected: &str, actual: &str) -> bool {
    expected.split(',').map(str::trim).any(|v| v == actual)
}

/// Clone every applicable asset.
///
/// Per-asset failures are collected and never stop the batch. Existing
/// destinations are skipped unless `opts.update` is set, in which case git
/// clones are pulled.
///
/// # Errors
///
/// Returns [`ExternalError::GitMissing`] when `git` is not on `PATH`.
pub fn clone_all(
    ctx: &Context,
    manifest: &Manifest,
    platform: &Platform,
    opts: ExternalOptions,
) -> Result<ExternalResult, ExternalError> {
    let mut result = ExternalResult::default();
    if manifest.external.is_empty() {
        return Ok(result);
    }
    if !ctx.dry_run && !ctx.executor.which("git") {
        return Err(ExternalError::GitMissing);
    }

    let total = manifest.external.len();
    for (idx, dep) in manifest.external.iter().enumerate() {
        let event = |outcome: Outcome, msg: &str| {
            ProgressEvent::new(Phase::External, outcome, msg)
                .item(dep.display_name())
                .at(idx + 1, total)
        };
        match process(ctx, dep, platform, opts) {
            Ok(Processed::Cloned) => {
                ctx.progress(&event(Outcome::Done, "cloned"));
                result.cloned.push(dep.clone());
            }
            Ok(Processed::Updated) => {
                ctx.progress(&event(Outcome::Done, "updated"));
                result.updated.push(dep.clone());
            }
            Ok(Processed::Skipped(reason)) => {
                let outcome = if reason == SkipReason::DryRun {
                    Outcome::DryRun
                } else {
                    Outcome::Skipped
                };
                ctx.progress(&event(outcome, &reason.to_string()));
                result.skipped.push(ExternalSkipped {
                    dep: dep.clone(),
                    reason,
                });
            }
            Err(error) => {
                ctx.progress(&event(Outcome::Failed, &error.to_string()));
                result.failed.push(ExternalFailure {
                    dep: dep.clone(),
                    error,
                });
            }
        }
    }
    Ok(result)
}

/// Clone (or update) one asset by id.
///
/// Unlike [`clone_all`], a condition mismatch or an existing destination is
/// reported as an error.
///
/// # Errors
///
/// Returns [`ExternalError`] for an unknown id, a condition mismatch, an
/// existing destination without `update`, or a failed clone or pull.
pub fn clone_single(
    ctx: &Context,
    manifest: &Manifest,
    platform: &Platform,
    id: &str,
    opts: ExternalOptions,
) -> Result<(), ExternalError> {
    let dep = manifest
        .external(id)
        .ok_or_else(|| ExternalError::NotFound(id.to_string()))?;
    if !ctx.dry_run && !ctx.executor.which("git") {
        return Err(ExternalError::GitMissing);
    }
    let event = |outcome: Outcome, msg: &str| {
        ProgressEvent::new(Phase::External, outcome, msg).item(dep.display_name())
    };
    match process(ctx, dep, platform, opts)? {
        Processed::Cloned => ctx.progress(&event(Outcome::Done, "cloned")),
        Processed::Updated => ctx.progress(&event(Outcome::Done, "updated")),
        Processed::Skipped(SkipReason::ConditionNotMet) => {
            return Err(ExternalError::ConditionNotMet(id.to_string()));
        }
        Processed::Skipped(SkipReason::AlreadyExists | SkipReason::NotUpdatable) => {
            return Err(ExternalError::AlreadyExists {
                id: id.to_string(),
                path: ctx.expand(&dep.destination),
            });
        }
        Processed::Skipped(SkipReason::DryRun) => {
            ctx.progress(&event(Outcome::DryRun, "dry run"));
        }
    }
    Ok(())
}

/// Delete an asset's destination.
///
/// # Errors
///
/// Returns [`ExternalError::NotInstalled`] when the destination is absent,
/// [`ExternalError::Protected`] when it is (or contains) the dotfiles
/// repository, or [`ExternalError::Remove`] when deletion fails.
pub fn remove(ctx: &Context, manifest: &Manifest, id: &str) -> Result<(), ExternalError> {
    let dep = manifest
        .external(id)
        .ok_or_else(|| ExternalError::NotFound(id.to_string()))?;
    let path = ctx.expand(&dep.destination);
    if path.symlink_metadata().is_err() {
        return Err(ExternalError::NotInstalled {
            id: id.to_string(),
            path,
        });
    }
    if ctx.is_protected(&path) {
        return Err(ExternalError::Protected { path });
    }
    let event =
        |outcome: Outcome, msg: &str| ProgressEvent::new(Phase::External, outcome, msg).item(id);
    if ctx.dry_run {
        ctx.progress(&event(
            Outcome::DryRun,
            &format!("would remove {}", path.display()),
        ));
        return Ok(());
    }
    remove_path(&path).map_err(|source| ExternalError::Remove {
        id: id.to_string(),
        source,
    })?;
    ctx.progress(&event(Outcome::Done, "removed"));
    Ok(())
}

/// Report the state of every asset.
#[must_use]
pub fn check_status(ctx: &Context, manifest: &Manifest, platform: &Platform) -> Vec<ExternalStatus> {
    manifest
        .external
        .iter()
        .map(|dep| {
            let path = ctx.expand(&dep.destination);
            let (state, reason) = if !check_condition(&dep.condition, platform) {
                (ExternalState::Skipped, Some(SkipReason::ConditionNotMet.to_string()))
            } else if path.is_dir() {
                let reason = (!git::is_repository(&path)).then(|| "not a git repo".to_string());
                (ExternalState::Installed, reason)
            } else if path.exists() {
                (
                    ExternalState::Error,
                    Some("destination exists but is not a directory".to_string()),
                )
            } else {
                (ExternalState::Missing, None)
            };
            ExternalStatus {
                dep: dep.clone(),
                path,
                state,
                reason,
            }
        })
        .collect()
}

enum Processed {
    Cloned,
    Updated,
    Skipped(SkipReason),
}

fn process(
    ctx: &Context,
    dep: &ExternalDep,
    platform: &Platform,
    opts: ExternalOptions,
) -> Result<Processed, ExternalError> {
    if !check_condition(&dep.condition, platform) {
        return Ok(Processed::Skipped(SkipReason::ConditionNotMet));
    }
    let method = dep
        .method
        .parse::<Method>()
        .map_err(|method| ExternalError::UnknownMethod {
            id: dep.id.clone(),
            method,
        })?;
    let dest = ctx.expand(&dep.destination);

    if dest.exists() {
        if !opts.update {
            return Ok(Processed::Skipped(SkipReason::AlreadyExists));
        }
        if !git::is_repository(&dest) {
            return Ok(Processed::Skipped(SkipReason::NotUpdatable));
        }
        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would pull {} in {}", dep.id, dest.display()));
            return Ok(Processed::Skipped(SkipReason::DryRun));
        }
        git::pull_ff_only(ctx.executor.as_ref(), &dest).map_err(|e| ExternalError::Update {
            id: dep.id.clone(),
            source: e.into(),
        })?;
        return Ok(Processed::Updated);
    }

    if ctx.dry_run {
        ctx.log
            .dry_run(&format!("would clone {} into {}", dep.url, dest.display()));
        return Ok(Processed::Skipped(SkipReason::DryRun));
    }
    let cloned = match method {
        Method::Clone => git::clone_shallow(ctx.executor.as_ref(), &dep.url, &dest),
        Method::Copy => copy_snapshot(ctx, &dep.url, &dest),
    };
    cloned.map_err(|e| ExternalError::Clone {
        id: dep.id.clone(),
        source: e.into(),
    })?;
    Ok(Processed::Cloned)
}

/// Clone into a hidden sibling, strip `.git`, and rename into place.
fn copy_snapshot(ctx: &Context, url: &str, dest: &Path) -> anyhow::Result<()> {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = dest.with_file_name(format!(".{name}.dotstow-tmp"));
    if staging.exists() {
        remove_path(&staging)?;
    }
    let staged = git::clone_shallow(ctx.executor.as_ref(), url, &staging).and_then(|()| {
        let git_dir = staging.join(".git");
        if git_dir.exists() {
            std::fs::remove_dir_all(&git_dir)?;
        }
        std::fs::rename(&staging, dest)?;
        Ok(())
    });
    if staged.is_err() && staging.exists() {
        remove_path(&staging).ok();
    }
    staged
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
