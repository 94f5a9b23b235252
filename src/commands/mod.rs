//! Subcommand handlers.
//!
//! Every handler receives an [`App`] built once in `main` and returns
//! `anyhow::Result<()>`; an `Err` becomes a non-zero exit status.
pub mod config;
pub mod deps;
pub mod detect;
pub mod doctor;
pub mod external;
pub mod install;
pub mod list;
pub mod machine;
pub mod stow;
pub mod uninstall;
pub mod update;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{Manifest, ROOT_ENV, discover, root_of};
use crate::context::{self, Context};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Logger;
use crate::platform::Platform;
use crate::state::{State, StateStore};

/// Everything a command needs, resolved once per invocation.
#[derive(Debug)]
pub struct App {
    /// Paths and collaborators shared with the core.
    pub ctx: Context,
    /// The loaded manifest.
    pub manifest: Manifest,
    /// Where the manifest was found.
    pub manifest_path: PathBuf,
    /// Where install state lives.
    pub store: StateStore,
    /// Concrete logger, for the end-of-run summary.
    pub log: Arc<Logger>,
}

impl App {
    /// Locate and load the manifest for the current user and directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown or the manifest
    /// cannot be found, parsed, or validated.
    pub fn init(global: &GlobalOpts, log: Arc<Logger>) -> Result<Self> {
        let home = context::home_dir()?;
        let cwd = std::env::current_dir().context("reading current directory")?;
        let env_root = std::env::var_os(ROOT_ENV).map(PathBuf::from);
        Self::load(
            global,
            log,
            Arc::new(SystemExecutor),
            &home,
            &cwd,
            env_root.as_deref(),
        )
    }

    /// Build an application context from explicit inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be found, parsed, or validated.
    pub fn load(
        global: &GlobalOpts,
        log: Arc<Logger>,
        executor: Arc<dyn Executor>,
        home: &Path,
        cwd: &Path,
        env_root: Option<&Path>,
    ) -> Result<Self> {
        let explicit = global.manifest.as_deref().or(global.root.as_deref());
        let manifest_path = discover(explicit, env_root, cwd, home)?;

        log.stage("Loading manifest");
        let manifest = Manifest::load(&manifest_path)?;
        log.info(&format!(
            "{} ({})",
            manifest.display_name(),
            manifest_path.display()
        ));
        log.debug(&format!(
            "{} configs, {} archived",
            manifest.all_configs().count(),
            manifest.archived.len()
        ));
        log.debug(&format!(
            "{} external assets, {} machine configs",
            manifest.external.len(),
            manifest.machine_config.len()
        ));

        let warnings = manifest.warnings();
        if !warnings.is_empty() {
            log.warn(&format!("found {} manifest warning(s):", warnings.len()));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.section, warning.item, warning.message
                ));
            }
        }

        let root = root_of(&manifest_path);
        let store = StateStore::resolve(global.state_file.as_deref(), home);
        log.debug(&format!("state file: {}", store.path().display()));
        let ctx = Context::with_home(root, home.to_path_buf(), log.clone(), executor, global.dry_run);

        Ok(Self {
            ctx,
            manifest,
            manifest_path,
            store,
            log,
        })
    }

    /// Load the install state.
    ///
    /// An unreadable state file is reported and treated as absent.
    #[must_use]
    pub fn load_state(&self) -> Option<State> {
        match self.store.load() {
            Ok(state) => state,
            Err(e) => {
                self.log.warn(&format!("ignoring state file: {e}"));
                None
            }
        }
    }

    /// Persist `state` unless this is a dry run.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be written.
    pub fn save_state(&self, state: &State) -> Result<()> {
        if self.ctx.dry_run {
            self.log
                .dry_run(&format!("would write state to {}", self.store.path().display()));
            return Ok(());
        }
        self.store.save(state)?;
        self.log
            .debug(&format!("state written to {}", self.store.path().display()));
        Ok(())
    }

    /// Existing state, or a fresh one for this repository.
    #[must_use]
    pub fn state_or_new(&self) -> State {
        self.load_state()
            .unwrap_or_else(|| State::new(&self.ctx.root, self.manifest.display_name()))
    }

    /// Detect the host platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot be detected.
    pub fn detect_platform(&self) -> Result<Platform> {
        let platform = Platform::detect(self.ctx.executor.as_ref())?;
        self.log.debug(&format!("platform: {}", platform.describe()));
        Ok(platform)
    }

    /// Print the phase summary and turn recorded failures into an error.
    ///
    /// # Errors
    ///
    /// Returns an error if `failed` is non-zero.
    pub fn finish(&self, failed: usize) -> Result<()> {
        self.log.print_summary();
        if failed > 0 {
            anyhow::bail!("{failed} item(s) failed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::MANIFEST_FILE_NAME;
    use crate::test_helpers::RecordingExecutor;

    fn write_manifest(dir: &Path, text: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE_NAME), text).unwrap();
    }

    fn load(global: &GlobalOpts, home: &Path, cwd: &Path) -> Result<App> {
        App::load(
            global,
            Arc::new(Logger::new("test")),
            Arc::new(RecordingExecutor::new()),
            home,
            cwd,
            None,
        )
    }

    #[test]
    fn root_is_manifest_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dots = tmp.path().join("dots");
        write_manifest(&dots, "[metadata]\nname = \"mine\"\n");
        let global = GlobalOpts {
            root: Some(dots.clone()),
            ..GlobalOpts::default()
        };

        let app = load(&global, tmp.path(), tmp.path()).unwrap();

        assert_eq!(app.ctx.root, dunce::canonicalize(&dots).unwrap());
        assert_eq!(app.manifest.display_name(), "mine");
        assert_eq!(app.ctx.home, tmp.path());
    }

    #[test]
    fn state_file_flag_is_honoured() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), "");
        let global = GlobalOpts {
            state_file: Some(tmp.path().join("s.json")),
            dry_run: true,
            ..GlobalOpts::default()
        };

        let app = load(&global, tmp.path(), tmp.path()).unwrap();

        assert_eq!(app.store.path(), tmp.path().join("s.json"));
        assert!(app.ctx.dry_run);
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load(&GlobalOpts::default(), tmp.path(), tmp.path()).unwrap_err();
        assert!(err.to_string().contains(MANIFEST_FILE_NAME));
    }

    #[test]
    fn corrupt_state_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), "");
        std::fs::write(tmp.path().join("s.json"), "{ not json").unwrap();
        let global = GlobalOpts {
            state_file: Some(tmp.path().join("s.json")),
            ..GlobalOpts::default()
        };

        let app = load(&global, tmp.path(), tmp.path()).unwrap();

        assert!(app.load_state().is_none());
        assert!(app.state_or_new().configs.is_empty());
    }

    #[test]
    fn dry_run_never_writes_state() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), "");
        let global = GlobalOpts {
            state_file: Some(tmp.path().join("s.json")),
            dry_run: true,
            ..GlobalOpts::default()
        };
        let app = load(&global, tmp.path(), tmp.path()).unwrap();

        app.save_state(&app.state_or_new()).unwrap();

        assert!(!tmp.path().join("s.json").exists());
    }

    #[test]
    fn finish_fails_on_failures() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), "");
        let app = load(&GlobalOpts::default(), tmp.path(), tmp.path()).unwrap();
        assert!(app.finish(0).is_ok());
        assert!(app.finish(2).unwrap_err().to_string().contains('2'));
    }
}
