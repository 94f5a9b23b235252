// Shared helpers for integration tests.
//
// Provides a temporary home directory with a dotfiles repository inside it,
// a fake executor that never spawns processes, and builders for the
// application context.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dotstow::cli::GlobalOpts;
use dotstow::commands::App;
use dotstow::config::MANIFEST_FILE_NAME;
use dotstow::context::Context;
use dotstow::exec::{ExecResult, Executor};
use dotstow::logging::Logger;
use dotstow::state::{State, StateStore};

/// Executor that records command lines and pretends every call succeeded.
///
/// `git clone <url> <dest>` creates `<dest>` so later checks see the asset.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<String>>,
    missing: Vec<String>,
    failing: Vec<String>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `program` as absent from `PATH`.
    pub fn without(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    /// Fail every call whose command line contains `pattern`.
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, program: &str, args: &[&str]) -> bool {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let fails = self.failing.iter().any(|p| line.contains(p.as_str()));
        self.calls.lock().expect("calls lock").push(line);
        if !fails
            && program == "git"
            && args.first() == Some(&"clone")
            && let Some(dest) = args.last()
        {
            std::fs::create_dir_all(Path::new(dest).join(".git")).expect("fake clone");
        }
        fails
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        if self.record(program, args) {
            anyhow::bail!("{program} failed (exit 1)");
        }
        Ok(ExecResult {
            success: true,
            code: Some(0),
            ..ExecResult::default()
        })
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let dir = dir.display().to_string();
        let mut full = vec!["-C", dir.as_str()];
        full.extend_from_slice(args);
        self.run(program, &full)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let fails = self.record(program, args);
        Ok(ExecResult {
            success: !fails,
            code: Some(i32::from(fails)),
            ..ExecResult::default()
        })
    }

    fn which(&self, program: &str) -> bool {
        !self.missing.iter().any(|m| m == program)
    }
}

/// An isolated home directory holding a dotfiles repository at `~/dotfiles`.
///
/// Everything is deleted when dropped.
pub struct IntegrationTestContext {
    pub dir: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create the home directory and an empty repository.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("home/dotfiles")).expect("create repo dir");
        Self { dir }
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// The dotfiles root, canonicalized the way manifest discovery reports it.
    pub fn root(&self) -> PathBuf {
        let root = self.home().join("dotfiles");
        dunce::canonicalize(&root).unwrap_or(root)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state/state.json")
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.state_path())
    }

    pub fn state(&self) -> Option<State> {
        self.store().load().expect("load state")
    }

    /// Write the manifest.
    pub fn with_manifest(self, text: &str) -> Self {
        std::fs::write(self.root().join(MANIFEST_FILE_NAME), text).expect("write manifest");
        self
    }

    /// Create a config group directory with one file in it.
    pub fn with_group(self, name: &str) -> Self {
        let dir = self.root().join(name);
        std::fs::create_dir_all(&dir).expect("create group dir");
        std::fs::write(dir.join(format!(".{name}rc")), "# managed\n").expect("write group file");
        self
    }

    /// Core context for calling the library directly.
    pub fn context(&self, executor: Arc<FakeExecutor>, dry_run: bool) -> Context {
        Context::with_home(
            self.root(),
            self.home(),
            Arc::new(Logger::new("test")),
            executor,
            dry_run,
        )
    }

    /// Application context as `main` would build it, rooted at the repository.
    pub fn app(&self, executor: Arc<FakeExecutor>, dry_run: bool) -> App {
        let global = GlobalOpts {
            root: Some(self.root()),
            state_file: Some(self.state_path()),
            dry_run,
            ..GlobalOpts::default()
        };
        App::load(
            &global,
            Arc::new(Logger::new("test")),
            executor,
            &self.home(),
            self.dir.path(),
            None,
        )
        .expect("load app")
    }
}
