#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for updating an installed repository.
//!
//! The dotfiles root is a real git repository; `git pull` goes through the
//! fake executor and never moves HEAD.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{FakeExecutor, IntegrationTestContext};
use dotstow::config::{MANIFEST_FILE_NAME, Manifest};
use dotstow::platform::{Os, Platform};
use dotstow::setup::{UpdateOptions, update};
use dotstow::state::State;

const MANIFEST: &str = r#"
[[configs.core]]
name = "git"

[[configs.optional]]
name = "nvim"
"#;

fn commit_all(root: &Path) {
    let repo = git2::Repository::init(root).unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = git2::Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .unwrap();
}

fn repo() -> IntegrationTestContext {
    let t = IntegrationTestContext::new()
        .with_manifest(MANIFEST)
        .with_group("git")
        .with_group("nvim");
    commit_all(&t.root());
    t
}

fn installed(t: &IntegrationTestContext, groups: &[&str]) -> State {
    let mut state = State::new(&t.root(), "dotfiles");
    for g in groups {
        state.add_config(g, g);
    }
    t.store().save(&state).unwrap();
    state
}

#[test]
fn restows_only_installed_groups() {
    let t = repo();
    let state = installed(&t, &["nvim"]);
    let executor = Arc::new(FakeExecutor::new());
    let ctx = t.context(executor.clone(), false);
    let mut manifest = Manifest::from_toml(MANIFEST).unwrap();

    let result = update(
        &ctx,
        &mut manifest,
        &t.root().join(MANIFEST_FILE_NAME),
        Some(&state),
        &Platform::new(Os::Linux, "arch", "pacman"),
        UpdateOptions::default(),
    )
    .unwrap();

    assert!(!result.has_errors());
    assert!(!result.changed());
    assert!(!result.manifest_reloaded);
    assert_eq!(result.restow.success, vec!["nvim"]);
    assert_eq!(executor.count("git -C"), 1);
    assert_eq!(executor.count("stow -v -R"), 1);
}

#[test]
fn skip_restow_only_pulls() {
    let t = repo();
    let executor = Arc::new(FakeExecutor::new());
    let ctx = t.context(executor.clone(), false);
    let mut manifest = Manifest::from_toml(MANIFEST).unwrap();

    let result = update(
        &ctx,
        &mut manifest,
        &t.root().join(MANIFEST_FILE_NAME),
        None,
        &Platform::new(Os::Linux, "arch", "pacman"),
        UpdateOptions {
            skip_restow: true,
            ..UpdateOptions::default()
        },
    )
    .unwrap();

    assert!(result.restow.success.is_empty());
    assert_eq!(executor.count("stow"), 0);
}

#[test]
fn failed_pull_is_fatal() {
    let t = repo();
    let ctx = t.context(Arc::new(FakeExecutor::new().failing_on("pull")), false);
    let mut manifest = Manifest::from_toml(MANIFEST).unwrap();

    let err = update(
        &ctx,
        &mut manifest,
        &t.root().join(MANIFEST_FILE_NAME),
        None,
        &Platform::new(Os::Linux, "arch", "pacman"),
        UpdateOptions::default(),
    )
    .unwrap_err();

    assert!(format!("{err:#}").contains("pulling"));
}

#[test]
fn not_a_repository_is_fatal() {
    let t = IntegrationTestContext::new()
        .with_manifest(MANIFEST)
        .with_group("git");
    let ctx = t.context(Arc::new(FakeExecutor::new()), false);
    let mut manifest = Manifest::from_toml(MANIFEST).unwrap();

    let err = update(
        &ctx,
        &mut manifest,
        &t.root().join(MANIFEST_FILE_NAME),
        None,
        &Platform::new(Os::Linux, "arch", "pacman"),
        UpdateOptions::default(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("not a git repository"));
}
