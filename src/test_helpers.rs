//! Shared helpers for unit tests.
//!
//! Provides a recording executor, an in-memory logger, and manifest factories
//! so each test module does not have to duplicate boilerplate.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::bail;

use crate::config::Manifest;
use crate::context::Context;
use crate::exec::{ExecResult, Executor};
use crate::logging::{Log, Phase, PhaseStatus, ProgressEvent};

/// Executor that records every invocation and never spawns a process.
///
/// Every program is on `PATH` unless removed with
/// [`without_program`](Self::without_program). A call whose command line
/// contains a pattern registered with [`failing_on`](Self::failing_on) fails.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
    missing: Vec<String>,
    failures: Vec<String>,
    simulate_clone: bool,
}

impl RecordingExecutor {
    /// Executor where every program exists and every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `program` as absent from `PATH`.
    #[must_use]
    pub fn without_program(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    /// Fail any call whose command line contains `pattern`.
    #[must_use]
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.failures.push(pattern.to_string());
        self
    }

    /// Make `git clone ... <dest>` create `<dest>` with a `.git` directory.
    #[must_use]
    pub const fn simulating_clone(mut self) -> Self {
        self.simulate_clone = true;
        self
    }

    /// All recorded command lines, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded command lines starting with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, program: &str, args: &[&str]) -> (String, bool) {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());
        let fails = self.failures.iter().any(|p| line.contains(p.as_str()));
        if !fails
            && self.simulate_clone
            && program == "git"
            && args.first() == Some(&"clone")
            && let Some(dest) = args.last()
        {
            let dest = Path::new(dest);
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            std::fs::write(dest.join("README"), "cloned\n").unwrap();
        }
        (line, fails)
    }
}

impl Executor for RecordingExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let (line, fails) = self.record(program, args);
        if fails {
            bail!("{program} failed (exit 1): simulated failure of `{line}`");
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
        let (_, fails) = self.record(program, args);
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

/// Logger that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Mutex<Vec<(&'static str, String)>>,
    events: Mutex<Vec<ProgressEvent>>,
    phases: Mutex<Vec<(Phase, PhaseStatus)>>,
}

impl MemoryLog {
    /// Messages logged at `level` (`stage`, `info`, `debug`, `warn`, `error`, `dry_run`).
    pub fn messages(&self, level: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// All progress events, in order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// All recorded phase results, in order.
    pub fn phases(&self) -> Vec<(Phase, PhaseStatus)> {
        self.phases.lock().unwrap().clone()
    }

    fn push(&self, level: &'static str, msg: &str) {
        self.messages.lock().unwrap().push((level, msg.to_string()));
    }
}

impl Log for MemoryLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
    fn progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
    fn record_phase(&self, phase: Phase, status: PhaseStatus, _message: Option<&str>) {
        self.phases.lock().unwrap().push((phase, status));
    }
}

/// Build a [`Context`] with a default [`RecordingExecutor`].
pub fn test_context(
    root: &Path,
    home: &Path,
) -> (Context, Arc<MemoryLog>, Arc<RecordingExecutor>) {
    test_context_with(root, home, RecordingExecutor::new())
}

/// Build a [`Context`] around the given executor.
pub fn test_context_with(
    root: &Path,
    home: &Path,
    executor: RecordingExecutor,
) -> (Context, Arc<MemoryLog>, Arc<RecordingExecutor>) {
    let log = Arc::new(MemoryLog::default());
    let executor = Arc::new(executor);
    let ctx = Context::with_home(
        root.to_path_buf(),
        home.to_path_buf(),
        log.clone(),
        executor.clone(),
        false,
    );
    (ctx, log, executor)
}

/// Parse a manifest from inline TOML.
pub fn manifest(toml: &str) -> Manifest {
    Manifest::from_toml(toml).expect("test manifest should parse")
}

/// Create `root/<name>` config group directories.
pub fn make_groups(root: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|n| {
            let dir = root.join(n);
            std::fs::create_dir_all(&dir).unwrap();
            dir
        })
        .collect()
}
