//! Execution context shared by every component.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::exec::Executor;
use crate::logging::{Log, ProgressEvent};

/// Shared context passed to every component.
///
/// Built once per command; components read paths and collaborators from it
/// instead of consulting the environment themselves.
pub struct Context {
    /// Root directory of the dotfiles repository.
    pub root: PathBuf,
    /// User's home directory path; the symlink target and `~` expansion base.
    pub home: PathBuf,
    /// Logger for output and phase recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("home", &self.home)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Context {
    /// Creates a context with an explicit home directory.
    #[must_use]
    pub fn with_home(
        root: PathBuf,
        home: PathBuf,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        dry_run: bool,
    ) -> Self {
        Self {
            root,
            home,
            log,
            executor,
            dry_run,
        }
    }

    /// Expand a leading `~` against the home directory.
    #[must_use]
    pub fn expand(&self, path: &str) -> PathBuf {
        expand_tilde(path, &self.home)
    }

    /// Whether deleting `path` would delete the dotfiles repository.
    ///
    /// True when `path` is the repository root or one of its ancestors.
    #[must_use]
    pub fn is_protected(&self, path: &Path) -> bool {
        let target = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let root = dunce::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        root.starts_with(&target)
    }

    /// Forward a progress event to the logger.
    pub fn progress(&self, event: &ProgressEvent) {
        self.log.progress(event);
    }
}

/// Resolve the current user's home directory from the environment.
///
/// # Errors
///
/// Returns an error if neither variable is set.
pub fn home_dir() -> Result<PathBuf> {
    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .map_err(|_| {
                anyhow::anyhow!("neither USERPROFILE nor HOME environment variable is set")
            })?
    } else {
        std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?
    };
    Ok(PathBuf::from(home))
}

/// Expand `~` and `~/rest` against `home`; other paths are returned unchanged.
#[must_use]
pub fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path
        .strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"))
    {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::test_context;

    #[test]
    fn expand_tilde_variants() {
        let home = Path::new("/home/u");
        assert_eq!(expand_tilde("~", home), PathBuf::from("/home/u"));
        assert_eq!(
            expand_tilde("~/.config/git", home),
            PathBuf::from("/home/u/.config/git")
        );
        assert_eq!(expand_tilde("/etc/x", home), PathBuf::from("/etc/x"));
        assert_eq!(expand_tilde("rel/~x", home), PathBuf::from("rel/~x"));
    }

    #[test]
    fn protected_paths_cover_root_and_ancestors() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("dotfiles");
        std::fs::create_dir_all(root.join("git")).unwrap();
        let (ctx, _log, _ex) = test_context(&root, tmp.path());

        assert!(ctx.is_protected(&root));
        assert!(ctx.is_protected(tmp.path()));
        assert!(!ctx.is_protected(&root.join("git")));
        assert!(!ctx.is_protected(&tmp.path().join("elsewhere")));
    }

    #[test]
    fn debug_hides_trait_objects() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log, _ex) = test_context(tmp.path(), tmp.path());
        let dbg = format!("{ctx:?}");
        assert!(dbg.contains("<dyn Log>"));
        assert!(dbg.contains("dry_run: false"));
    }
}
