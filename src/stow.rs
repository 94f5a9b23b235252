//! Symlinking config groups with GNU stow.
//!
//! Every group is a directory under the dotfiles root whose contents are
//! linked into the home directory.
use std::fmt;
use std::path::Path;

use anyhow::{Result, bail};

use crate::config::ConfigItem;
use crate::context::Context;
use crate::error::StowError;
use crate::logging::{Outcome, Phase, ProgressEvent};

/// Options for stow operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StowOptions {
    /// Simulate with `stow -n`.
    pub dry_run: bool,
    /// Adopt conflicting files into the repository (`--adopt`).
    pub force: bool,
}

/// Which stow operation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StowAction {
    /// Create links.
    Stow,
    /// Remove links.
    Unstow,
    /// Remove then recreate links.
    Restow,
}

impl StowAction {
    const fn verb(self) -> &'static str {
        match self {
            Self::Stow => "stowed",
            Self::Unstow => "unstowed",
            Self::Restow => "restowed",
        }
    }
}

impl fmt::Display for StowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stow => "stow",
            Self::Unstow => "unstow",
            Self::Restow => "restow",
        })
    }
}

/// A group that was not acted on, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Group name.
    pub name: String,
    /// Why it was skipped.
    pub reason: String,
}

impl Skipped {
    /// Create a skip record.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of a batch operation.
#[derive(Debug, Default)]
pub struct StowResult {
    /// Groups acted on successfully.
    pub success: Vec<String>,
    /// Groups whose operation failed.
    pub failed: Vec<StowError>,
    /// Groups not acted on.
    pub skipped: Vec<Skipped>,
}

/// Build the stow command line for one group.
#[must_use]
pub fn stow_args(
    action: StowAction,
    home: &Path,
    root: &Path,
    group: &str,
    opts: StowOptions,
) -> Vec<String> {
    let mut args = vec!["-v".to_string()];
    match action {
        StowAction::Stow => {}
        StowAction::Unstow => args.push("-D".to_string()),
        StowAction::Restow => args.push("-R".to_string()),
    }
    if opts.dry_run {
        args.push("-n".to_string());
    }
    if opts.force && action != StowAction::Unstow {
        args.push("--adopt".to_string());
    }
    args.extend([
        "-t".to_string(),
        home.display().to_string(),
        "-d".to_string(),
        root.display().to_string(),
        group.to_string(),
    ]);
    args
}

/// Check that GNU stow is available.
///
/// # Errors
///
/// Returns an error when `stow` is not on `PATH` or cannot report its version.
pub fn validate_stow(ctx: &Context) -> Result<()> {
    if !ctx.executor.which("stow") {
        bail!("GNU stow is not installed; install it with your package manager");
    }
    let result = ctx.executor.run_unchecked("stow", &["--version"])?;
    if !result.success {
        bail!("stow --version failed: {}", result.stderr.trim());
    }
    Ok(())
}

/// Link one group into the home directory.
///
/// # Errors
///
/// Returns a [`StowError`] naming the group when stow fails.
pub fn stow(ctx: &Context, group: &str, opts: StowOptions) -> Result<(), StowError> {
    run(ctx, StowAction::Stow, group, opts)
}

/// Remove one group's links.
///
/// # Errors
///
/// Returns a [`StowError`] naming the group when stow fails.
pub fn unstow(ctx: &Context, group: &str, opts: StowOptions) -> Result<(), StowError> {
    run(ctx, StowAction::Unstow, group, opts)
}

/// Recreate one group's links.
///
/// # Errors
///
/// Returns a [`StowError`] naming the group when stow fails.
pub fn restow(ctx: &Context, group: &str, opts: StowOptions) -> Result<(), StowError> {
    run(ctx, StowAction::Restow, group, opts)
}

fn run(ctx: &Context, action: StowAction, group: &str, opts: StowOptions) -> Result<(), StowError> {
    let args = stow_args(action, &ctx.home, &ctx.root, group, opts);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    ctx.log.debug(&format!("stow {}", args.join(" ")));
    ctx.executor
        .run("stow", &refs)
        .map(|_| ())
        .map_err(|e| StowError {
            group: group.to_string(),
            source: e.into(),
        })
}

/// Stow each group, skipping those whose directory is missing.
pub fn stow_configs(ctx: &Context, items: &[ConfigItem], opts: StowOptions) -> StowResult {
    batch(ctx, StowAction::Stow, items, opts)
}

/// Unstow each group, skipping those whose directory is missing.
pub fn unstow_configs(ctx: &Context, items: &[ConfigItem], opts: StowOptions) -> StowResult {
    batch(ctx, StowAction::Unstow, items, opts)
}

/// Restow each group, skipping those whose directory is missing.
pub fn restow_configs(ctx: &Context, items: &[ConfigItem], opts: StowOptions) -> StowResult {
    batch(ctx, StowAction::Restow, items, opts)
}

fn batch(ctx: &Context, action: StowAction, items: &[ConfigItem], opts: StowOptions) -> StowResult {
    let mut result = StowResult::default();
    let total = items.len();
    for (idx, item) in items.iter().enumerate() {
        let event = |outcome: Outcome, msg: &str| {
            ProgressEvent::new(Phase::Stow, outcome, msg)
                .item(&item.name)
                .at(idx + 1, total)
        };

        if !ctx.root.join(item.source_dir()).is_dir() {
            ctx.progress(&event(Outcome::Skipped, "directory not found"));
            result
                .skipped
                .push(Skipped::new(&item.name, "directory not found"));
            continue;
        }

        ctx.progress(&event(Outcome::Started, &format!("{action}ing")));
        match run(ctx, action, item.source_dir(), opts) {
            Ok(()) => {
                let outcome = if opts.dry_run {
                    Outcome::DryRun
                } else {
                    Outcome::Done
                };
                ctx.progress(&event(outcome, action.verb()));
                result.success.push(item.name.clone());
            }
            Err(e) => {
                ctx.progress(&event(Outcome::Failed, &e.to_string()));
                result.failed.push(StowError {
                    group: item.name.clone(),
                    source: e.source,
                });
            }
        }
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingExecutor, make_groups, test_context, test_context_with};
    use std::path::PathBuf;

    #[test]
    fn args_for_each_action() {
        let home = PathBuf::from("/home/u");
        let root = PathBuf::from("/home/u/dotfiles");
        let stow = stow_args(StowAction::Stow, &home, &root, "git", StowOptions::default());
        assert_eq!(
            stow.join(" "),
            "-v -t /home/u -d /home/u/dotfiles git"
        );
        let opts = StowOptions {
            dry_run: true,
            force: true,
        };
        assert_eq!(
            stow_args(StowAction::Restow, &home, &root, "git", opts).join(" "),
            "-v -R -n --adopt -t /home/u -d /home/u/dotfiles git"
        );
        assert_eq!(
            stow_args(StowAction::Unstow, &home, &root, "git", opts).join(" "),
            "-v -D -n -t /home/u -d /home/u/dotfiles git"
        );
    }

    #[test]
    fn batch_skips_missing_directories_without_invoking_stow() {
        let tmp = tempfile::tempdir().unwrap();
        make_groups(tmp.path(), &["git"]);
        let (ctx, _log, ex) = test_context(tmp.path(), tmp.path());
        let items = [ConfigItem::named("git"), ConfigItem::named("ghost")];

        let result = stow_configs(&ctx, &items, StowOptions::default());

        assert_eq!(result.success, vec!["git"]);
        assert_eq!(result.skipped, vec![Skipped::new("ghost", "directory not found")]);
        assert_eq!(ex.calls().len(), 1);
        assert!(!ex.calls()[0].contains("ghost"));
    }

    #[test]
    fn batch_collects_failures_and_continues() {
        let tmp = tempfile::tempdir().unwrap();
        make_groups(tmp.path(), &["git", "zsh", "tmux"]);
        let (ctx, _log, ex) = test_context_with(
            tmp.path(),
            tmp.path(),
            RecordingExecutor::new().failing_on(" zsh"),
        );
        let items = [
            ConfigItem::named("git"),
            ConfigItem::named("zsh"),
            ConfigItem::named("tmux"),
        ];

        let result = restow_configs(&ctx, &items, StowOptions::default());

        assert_eq!(result.success, vec!["git", "tmux"]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].group, "zsh");
        assert_eq!(ex.count_prefix("stow -v -R"), 3);
    }

    #[test]
    fn group_path_differs_from_name() {
        let tmp = tempfile::tempdir().unwrap();
        make_groups(tmp.path(), &["nvim-config"]);
        let (ctx, _log, ex) = test_context(tmp.path(), tmp.path());
        let item = ConfigItem {
            name: "nvim".to_string(),
            path: "nvim-config".to_string(),
            ..ConfigItem::default()
        };
        let result = unstow_configs(&ctx, &[item], StowOptions::default());
        assert_eq!(result.success, vec!["nvim"]);
        assert!(ex.calls()[0].ends_with(" nvim-config"));
    }

    #[test]
    fn dry_run_passes_simulate_flag() {
        let tmp = tempfile::tempdir().unwrap();
        make_groups(tmp.path(), &["git"]);
        let (ctx, log, ex) = test_context(tmp.path(), tmp.path());
        let opts = StowOptions {
            dry_run: true,
            force: false,
        };
        stow_configs(&ctx, &[ConfigItem::named("git")], opts);
        assert!(ex.calls()[0].contains(" -n "));
        assert!(log.events().iter().any(|e| e.outcome == Outcome::DryRun));
    }

    #[test]
    fn validate_requires_stow_on_path() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log, _ex) = test_context_with(
            tmp.path(),
            tmp.path(),
            RecordingExecutor::new().without_program("stow"),
        );
        let err = validate_stow(&ctx).unwrap_err();
        assert!(err.to_string().contains("not installed"));

        let (ctx, _log, ex) = test_context(tmp.path(), tmp.path());
        validate_stow(&ctx).unwrap();
        assert_eq!(ex.calls(), vec!["stow --version"]);
    }
}
