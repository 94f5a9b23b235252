//! Pull the dotfiles repository and refresh what is installed.
use std::path::Path;

use anyhow::{Context as _, Result, bail};

use crate::config::{ConfigItem, Manifest};
use crate::context::Context;
use crate::external::{self, ExternalOptions, ExternalResult};
use crate::git;
use crate::logging::{Phase, PhaseStatus};
use crate::platform::Platform;
use crate::state::State;
use crate::stow::{self, Skipped, StowOptions, StowResult};

use super::phase_status;

/// Options for [`update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Also pull external assets.
    pub update_external: bool,
    /// Do not restow after pulling.
    pub skip_restow: bool,
}

/// Outcome of [`update`].
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// HEAD before the pull.
    pub old_head: String,
    /// HEAD after the pull.
    pub new_head: String,
    /// Whether the manifest changed and was reloaded.
    pub manifest_reloaded: bool,
    /// Restow of the installed groups.
    pub restow: StowResult,
    /// External refresh, when requested.
    pub external: Option<ExternalResult>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
    /// Phase-level failures.
    pub errors: Vec<anyhow::Error>,
}

impl UpdateResult {
    /// Whether the repository moved.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.old_head != self.new_head
    }

    /// Whether any item or phase failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.restow.failed.is_empty()
            || self
                .external
                .as_ref()
                .is_some_and(|e| !e.failed.is_empty())
            || !self.errors.is_empty()
    }
}

/// Fast-forward the dotfiles repository, reload the manifest if it changed,
/// restow installed groups, and optionally refresh external assets.
///
/// Groups come from `state`; without state every core group is restowed.
///
/// # Errors
///
/// Returns an error when the root is not a git repository or the pull fails.
pub fn update(
    ctx: &Context,
    manifest: &mut Manifest,
    manifest_path: &Path,
    state: Option<&State>,
    platform: &Platform,
    opts: UpdateOptions,
) -> Result<UpdateResult> {
    ctx.log.stage("Updating dotfiles repository");
    if !git::is_repository(&ctx.root) {
        ctx.log
            .record_phase(Phase::Update, PhaseStatus::Failed, Some("not a git repository"));
        bail!("not a git repository: {}", ctx.root.display());
    }

    let old = git::head(&ctx.root)?;
    let new = if ctx.dry_run {
        ctx.log
            .dry_run(&format!("would run git pull --ff-only in {}", ctx.root.display()));
        old
    } else {
        if let Err(e) = git::pull_ff_only(ctx.executor.as_ref(), &ctx.root) {
            ctx.log
                .record_phase(Phase::Update, PhaseStatus::Failed, Some("pull failed"));
            return Err(e.context("pulling dotfiles repository"));
        }
        git::head(&ctx.root)?
    };

    let mut result = UpdateResult {
        old_head: old.to_string(),
        new_head: new.to_string(),
        ..UpdateResult::default()
    };
    if result.changed() {
        ctx.log.info(&format!(
            "updated {} -> {}",
            short(&result.old_head),
            short(&result.new_head)
        ));
    } else {
        ctx.log.info("already up to date");
    }

    let relative = manifest_path
        .strip_prefix(&ctx.root)
        .unwrap_or(manifest_path)
        .to_string_lossy()
        .replace('\\', "/");
    if git::file_changed(&ctx.root, old, new, &relative).context("comparing manifest revisions")? {
        match Manifest::load(manifest_path) {
            Ok(reloaded) => {
                ctx.log.info("manifest changed; reloaded");
                *manifest = reloaded;
                result.manifest_reloaded = true;
            }
            Err(e) => {
                let msg = format!("manifest changed but could not be reloaded, keeping previous: {e}");
                ctx.log.warn(&msg);
                result.warnings.push(msg);
            }
        }
    }
    ctx.log
        .record_phase(Phase::Update, PhaseStatus::Ok, Some(&short(&result.new_head)));

    if opts.skip_restow {
        ctx.log
            .record_phase(Phase::Stow, PhaseStatus::Skipped, Some("skipped by option"));
    } else {
        let (restow, error) = restow_installed(ctx, manifest, state);
        result.restow = restow;
        let failed = result.restow.failed.len() + usize::from(error.is_some());
        if let Some(e) = error {
            ctx.log.error(&format!("{e:#}"));
            result.errors.push(e);
        }
        let msg = format!("{} restowed", result.restow.success.len());
        ctx.log
            .record_phase(Phase::Stow, phase_status(ctx, failed), Some(&msg));
    }

    if opts.update_external {
        ctx.log.stage(Phase::External.title());
        match external::clone_all(ctx, manifest, platform, ExternalOptions { update: true }) {
            Ok(outcome) => {
                let msg = format!(
                    "{} updated, {} cloned",
                    outcome.updated.len(),
                    outcome.cloned.len()
                );
                ctx.log.record_phase(
                    Phase::External,
                    phase_status(ctx, outcome.failed.len()),
                    Some(&msg),
                );
                result.external = Some(outcome);
            }
            Err(e) => {
                ctx.log
                    .record_phase(Phase::External, PhaseStatus::Failed, Some(&e.to_string()));
                result.errors.push(e.into());
            }
        }
    }

    Ok(result)
}

fn restow_installed(
    ctx: &Context,
    manifest: &Manifest,
    state: Option<&State>,
) -> (StowResult, Option<anyhow::Error>) {
    ctx.log.stage("Restowing configs");
    let mut gone = Vec::new();
    let items: Vec<ConfigItem> = match state {
        Some(state) => state
            .configs
            .iter()
            .filter_map(|c| {
                let found = manifest.config(&c.name).cloned();
                if found.is_none() {
                    gone.push(Skipped::new(&c.name, "no longer in manifest"));
                }
                found
            })
            .collect(),
        None => manifest.configs.core.clone(),
    };

    if !items.is_empty()
        && let Err(e) = stow::validate_stow(ctx)
    {
        return (
            StowResult {
                skipped: gone,
                ..StowResult::default()
            },
            Some(e),
        );
    }

    let mut result = stow::restow_configs(
        ctx,
        &items,
        StowOptions {
            dry_run: ctx.dry_run,
            force: false,
        },
    );
    result.skipped.append(&mut gone);
    (result, None)
}

fn short(head: &str) -> String {
    head.chars().take(7).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::PathBuf;

    use git2::Repository;

    use super::*;
    use crate::config::MANIFEST_FILE_NAME;
    use crate::exec::{ExecResult, Executor};
    use crate::git::tests::commit;
    use crate::platform::Os;
    use crate::test_helpers::{RecordingExecutor, make_groups, manifest, test_context, test_context_with};

    const V1: &str = "[[configs.core]]\nname = \"git\"\n";
    const V2: &str = "[[configs.core]]\nname = \"git\"\n\n[[configs.core]]\nname = \"zsh\"\n";

    /// Executor whose `git pull` commits `files` to the repository.
    #[derive(Debug)]
    struct PullingExecutor {
        inner: RecordingExecutor,
        repo: PathBuf,
        files: Vec<(String, String)>,
    }

    impl Executor for PullingExecutor {
        fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
            self.inner.run(program, args)
        }

        fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
            let result = self.inner.run_in(dir, program, args)?;
            if args.first() == Some(&"pull") {
                let repo = Repository::open(&self.repo).unwrap();
                let files: Vec<(&str, &str)> = self
                    .files
                    .iter()
                    .map(|(p, c)| (p.as_str(), c.as_str()))
                    .collect();
                commit(&repo, &files, "upstream");
            }
            Ok(result)
        }

        fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
            self.inner.run_unchecked(program, args)
        }

        fn which(&self, program: &str) -> bool {
            self.inner.which(program)
        }
    }

    fn repo_with_manifest(root: &Path) -> PathBuf {
        let repo = Repository::init(root).unwrap();
        commit(&repo, &[(MANIFEST_FILE_NAME, V1)], "initial");
        make_groups(root, &["git", "zsh"]);
        root.join(MANIFEST_FILE_NAME)
    }

    fn ctx_pulling(root: &Path, files: &[(&str, &str)]) -> (Context, std::sync::Arc<crate::test_helpers::MemoryLog>) {
        let log = std::sync::Arc::new(crate::test_helpers::MemoryLog::default());
        let executor = PullingExecutor {
            inner: RecordingExecutor::new(),
            repo: root.to_path_buf(),
            files: files
                .iter()
                .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
                .collect(),
        };
        let ctx = Context::with_home(
            root.to_path_buf(),
            root.to_path_buf(),
            log.clone(),
            std::sync::Arc::new(executor),
            false,
        );
        (ctx, log)
    }

    fn linux() -> Platform {
        Platform::new(Os::Linux, "fedora", "dnf")
    }

    #[test]
    fn reloads_manifest_when_it_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = repo_with_manifest(tmp.path());
        let (ctx, _log) = ctx_pulling(tmp.path(), &[(MANIFEST_FILE_NAME, V2)]);
        let mut m = manifest(V1);

        let result = update(&ctx, &mut m, &path, None, &linux(), UpdateOptions::default()).unwrap();

        assert!(result.changed());
        assert!(result.manifest_reloaded);
        assert_eq!(m.configs.core.len(), 2);
        assert_eq!(result.restow.success, vec!["git", "zsh"]);
        assert!(!result.has_errors());
    }

    #[test]
    fn unrelated_change_keeps_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = repo_with_manifest(tmp.path());
        let (ctx, _log) = ctx_pulling(tmp.path(), &[("git/.gitconfig", "[core]\n")]);
        let mut m = manifest(V1);

        let result = update(&ctx, &mut m, &path, None, &linux(), UpdateOptions::default()).unwrap();

        assert!(result.changed());
        assert!(!result.manifest_reloaded);
        assert_eq!(result.restow.success, vec!["git"]);
    }

    #[test]
    fn invalid_new_manifest_is_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let path = repo_with_manifest(tmp.path());
        let (ctx, log) = ctx_pulling(tmp.path(), &[(MANIFEST_FILE_NAME, "[[configs.core]\n")]);
        let mut m = manifest(V1);

        let result = update(&ctx, &mut m, &path, None, &linux(), UpdateOptions::default()).unwrap();

        assert!(!result.manifest_reloaded);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(log.messages("warn").len(), 1);
        assert_eq!(m, manifest(V1));
    }

    #[test]
    fn restows_groups_from_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = repo_with_manifest(tmp.path());
        let (ctx, _log, ex) = test_context(tmp.path(), tmp.path());
        let mut m = manifest(V2);
        let mut state = State::new(tmp.path(), "dots");
        state.add_config("zsh", "zsh");
        state.add_config("retired", "retired");

        let result = update(&ctx, &mut m, &path, Some(&state), &linux(), UpdateOptions::default())
            .unwrap();

        assert!(!result.changed());
        assert_eq!(result.restow.success, vec!["zsh"]);
        assert_eq!(result.restow.skipped, vec![Skipped::new("retired", "no longer in manifest")]);
        assert_eq!(ex.count_prefix("stow -v -R"), 1);
        assert_eq!(ex.count_prefix("git -C"), 1);
    }

    #[test]
    fn not_a_repository_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log, ex) = test_context(tmp.path(), tmp.path());
        let mut m = manifest(V1);
        let err = update(
            &ctx,
            &mut m,
            &tmp.path().join(MANIFEST_FILE_NAME),
            None,
            &linux(),
            UpdateOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
        assert!(ex.calls().is_empty());
    }

    #[test]
    fn failed_pull_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let path = repo_with_manifest(tmp.path());
        let (ctx, _log, ex) = test_context_with(
            tmp.path(),
            tmp.path(),
            RecordingExecutor::new().failing_on("pull --ff-only"),
        );
        let mut m = manifest(V1);
        let err = update(&ctx, &mut m, &path, None, &linux(), UpdateOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("pulling dotfiles repository"));
        assert_eq!(ex.count_prefix("stow"), 0);
    }

    #[test]
    fn external_refresh_pulls_clones() {
        let tmp = tempfile::tempdir().unwrap();
        let path = repo_with_manifest(tmp.path());
        let tpm = tmp.path().join("plugins/tpm");
        std::fs::create_dir_all(&tpm).unwrap();
        Repository::init(&tpm).unwrap();
        let (ctx, _log, ex) = test_context(tmp.path(), tmp.path());
        let mut m = manifest(
            "[[external]]\nid = \"tpm\"\nurl = \"u\"\ndestination = \"~/plugins/tpm\"\n",
        );
        let opts = UpdateOptions {
            update_external: true,
            skip_restow: true,
        };

        let result = update(&ctx, &mut m, &path, None, &linux(), opts).unwrap();

        assert_eq!(result.external.unwrap().updated.len(), 1);
        assert_eq!(ex.count_prefix("git -C"), 2);
        assert_eq!(ex.count_prefix("stow"), 0);
    }
}
