//! Git helpers.
//!
//! Read-only inspection (is this a repository, what is HEAD, did a file
//! change) goes through `git2`. Network operations shell out to the `git`
//! executable so the user's credential helpers and SSH config apply.
use std::path::Path;

use anyhow::{Context as _, Result};
use git2::{DiffOptions, Oid, Repository};

use crate::exec::Executor;

/// Whether `path` is the top of a git working tree.
#[must_use]
pub fn is_repository(path: &Path) -> bool {
    Repository::open(path).is_ok()
}

/// Commit id HEAD points to.
///
/// # Errors
///
/// Returns an error when `repo` is not a repository or HEAD is unborn.
pub fn head(repo: &Path) -> Result<Oid> {
    let repository =
        Repository::open(repo).with_context(|| format!("not a git repository: {}", repo.display()))?;
    let head = repository.head().context("reading HEAD")?;
    head.peel_to_commit()
        .map(|c| c.id())
        .context("resolving HEAD to a commit")
}

/// Whether `file` differs between two commits.
///
/// # Errors
///
/// Returns an error when either commit cannot be read.
pub fn file_changed(repo: &Path, old: Oid, new: Oid, file: &str) -> Result<bool> {
    if old == new {
        return Ok(false);
    }
    let repository =
        Repository::open(repo).with_context(|| format!("not a git repository: {}", repo.display()))?;
    let old_tree = repository.find_commit(old)?.tree()?;
    let new_tree = repository.find_commit(new)?.tree()?;
    let mut opts = DiffOptions::new();
    opts.pathspec(file);
    let diff = repository.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?;
    Ok(diff.deltas().len() > 0)
}

/// Shallow-clone `url` into `dest`, creating its parent first.
///
/// # Errors
///
/// Returns an error when the parent cannot be created or `git clone` fails.
pub fn clone_shallow(executor: &dyn Executor, url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    let dest = dest.display().to_string();
    executor.run("git", &["clone", "--depth", "1", url, &dest])?;
    Ok(())
}

/// Fast-forward `repo` from its upstream.
///
/// # Errors
///
/// Returns an error when `git pull --ff-only` fails.
pub fn pull_ff_only(executor: &dyn Executor, repo: &Path) -> Result<()> {
    executor.run_in(repo, "git", &["pull", "--ff-only"])?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::test_helpers::RecordingExecutor;

    /// Commit `files` (path, content) on top of HEAD and return the new id.
    pub(crate) fn commit(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, content) in files {
            let full = workdir.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<git2::Commit<'_>> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn detects_repositories() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_repository(tmp.path()));
        Repository::init(tmp.path()).unwrap();
        assert!(is_repository(tmp.path()));
    }

    #[test]
    fn head_of_unborn_repository_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        Repository::init(tmp.path()).unwrap();
        assert!(head(tmp.path()).is_err());
    }

    #[test]
    fn file_changed_between_commits() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        let first = commit(&repo, &[(".dotstow.toml", "a"), ("git/.gitconfig", "x")], "one");
        let second = commit(&repo, &[("git/.gitconfig", "y")], "two");
        let third = commit(&repo, &[(".dotstow.toml", "b")], "three");

        assert_eq!(head(tmp.path()).unwrap(), third);
        assert!(!file_changed(tmp.path(), first, second, ".dotstow.toml").unwrap());
        assert!(file_changed(tmp.path(), second, third, ".dotstow.toml").unwrap());
        assert!(!file_changed(tmp.path(), third, third, ".dotstow.toml").unwrap());
    }

    #[test]
    fn clone_creates_parent_and_runs_git() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("a").join("b").join("tpm");
        let ex = RecordingExecutor::new();
        clone_shallow(&ex, "https://example.com/tpm.git", &dest).unwrap();
        assert!(dest.parent().unwrap().is_dir());
        assert_eq!(
            ex.calls(),
            vec![format!(
                "git clone --depth 1 https://example.com/tpm.git {}",
                dest.display()
            )]
        );
    }

    #[test]
    fn pull_runs_in_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let ex = RecordingExecutor::new();
        pull_ff_only(&ex, tmp.path()).unwrap();
        assert_eq!(
            ex.calls(),
            vec![format!("git -C {} pull --ff-only", tmp.path().display())]
        );
    }
}
