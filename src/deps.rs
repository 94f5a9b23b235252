//! Dependency checking and installation.
//!
//! Dependencies are processed in tier order (critical, core, optional). A
//! dependency counts as installed when its declared binary is on `PATH`, or
//! otherwise when the package manager reports the package as installed.
use std::fmt;

use crate::config::{DependencyItem, Manifest};
use crate::context::Context;
use crate::error::{DependencyError, PlatformError};
use crate::logging::{Outcome, Phase, ProgressEvent};
use crate::packages::PackageManager;
use crate::platform::Platform;

/// Priority tier of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Needed by the engine itself.
    Critical,
    /// Needed by core configs.
    Core,
    /// Nice to have.
    Optional,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::Core => "core",
            Self::Optional => "optional",
        })
    }
}

/// Installation status of one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    /// The declared dependency.
    pub item: DependencyItem,
    /// Its tier.
    pub tier: Tier,
    /// Package name for the active package manager.
    pub package: String,
    /// Whether it is already present.
    pub installed: bool,
}

/// Status of every declared dependency, grouped by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyCheckResult {
    /// Critical tier.
    pub critical: Vec<DependencyStatus>,
    /// Core tier.
    pub core: Vec<DependencyStatus>,
    /// Optional tier.
    pub optional: Vec<DependencyStatus>,
}

impl DependencyCheckResult {
    /// All statuses in tier order.
    pub fn all(&self) -> impl Iterator<Item = &DependencyStatus> {
        self.critical
            .iter()
            .chain(&self.core)
            .chain(&self.optional)
    }

    /// Dependencies not yet installed, in tier order.
    pub fn missing(&self) -> impl Iterator<Item = &DependencyStatus> {
        self.all().filter(|s| !s.installed)
    }

    /// Critical dependencies not yet installed.
    pub fn missing_critical(&self) -> impl Iterator<Item = &DependencyStatus> {
        self.critical.iter().filter(|s| !s.installed)
    }

    /// Whether nothing is missing.
    #[must_use]
    pub fn all_installed(&self) -> bool {
        self.missing().next().is_none()
    }
}

/// Options for [`install`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DepsOptions {
    /// Install only dependencies that are not already present.
    pub only_missing: bool,
}

/// A dependency that was not installed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDependency {
    /// The dependency.
    pub item: DependencyItem,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of [`install`].
#[derive(Debug, Default)]
pub struct InstallOutcome {
    /// Installed successfully.
    pub installed: Vec<DependencyItem>,
    /// Failed to install, with the cause.
    pub failed: Vec<DependencyError>,
    /// Not attempted (already present, dry run).
    pub skipped: Vec<SkippedDependency>,
    /// Critical dependencies that were missing before installing.
    pub missing_critical: Vec<String>,
}

impl InstallOutcome {
    /// Critical dependencies that are still missing after this run.
    pub fn still_missing_critical(&self) -> impl Iterator<Item = &str> {
        self.missing_critical
            .iter()
            .filter(|name| !self.installed.iter().any(|i| &i.name == *name))
            .map(String::as_str)
    }
}

/// Resolve the package manager for the platform.
///
/// # Errors
///
/// Returns a [`PlatformError`] when no manager was detected or its id is
/// unsupported.
pub fn manager_for(platform: &Platform) -> Result<PackageManager, PlatformError> {
    PackageManager::from_id(&platform.package_manager)
}

/// Check every declared dependency.
///
/// # Errors
///
/// Returns a [`PlatformError`] when the platform has no usable package manager.
pub fn check(
    ctx: &Context,
    manifest: &Manifest,
    platform: &Platform,
) -> Result<DependencyCheckResult, PlatformError> {
    let pm = manager_for(platform)?;
    let deps = &manifest.dependencies;
    let status = |tier: Tier, items: &[DependencyItem]| -> Vec<DependencyStatus> {
        items
            .iter()
            .map(|item| {
                let package = pm.package_name(item);
                let installed = is_present(ctx, pm, item, &package);
                DependencyStatus {
                    item: item.clone(),
                    tier,
                    package,
                    installed,
                }
            })
            .collect()
    };
    Ok(DependencyCheckResult {
        critical: status(Tier::Critical, &deps.critical),
        core: status(Tier::Core, &deps.core),
        optional: status(Tier::Optional, &deps.optional),
    })
}

fn is_present(ctx: &Context, pm: PackageManager, item: &DependencyItem, package: &str) -> bool {
    match &item.binary {
        Some(binary) => ctx.executor.which(binary),
        None => pm.is_package_installed(ctx.executor.as_ref(), package),
    }
}

/// Install declared dependencies.
///
/// Each dependency is installed with its own package manager invocation so
/// one failure never prevents the rest. In dry-run mode nothing is invoked
/// and every candidate is reported as skipped.
///
/// # Errors
///
/// Returns a [`PlatformError`] when the platform has no usable package manager.
pub fn install(
    ctx: &Context,
    manifest: &Manifest,
    platform: &Platform,
    opts: DepsOptions,
) -> Result<InstallOutcome, PlatformError> {
    let pm = manager_for(platform)?;
    let check = check(ctx, manifest, platform)?;
    let mut outcome = InstallOutcome {
        missing_critical: check.missing_critical().map(|s| s.item.name.clone()).collect(),
        ..InstallOutcome::default()
    };

    let candidates: Vec<&DependencyStatus> = if opts.only_missing {
        for status in check.all().filter(|s| s.installed) {
            outcome.skipped.push(SkippedDependency {
                item: status.item.clone(),
                reason: "already installed".to_string(),
            });
        }
        check.missing().collect()
    } else {
        check.all().collect()
    };

    let total = candidates.len();
    for (idx, status) in candidates.into_iter().enumerate() {
        let name = status.item.name.clone();
        let event = |outcome: Outcome, msg: String| {
            ProgressEvent::new(Phase::Dependencies, outcome, msg)
                .item(&name)
                .at(idx + 1, total)
        };

        if ctx.dry_run {
            ctx.progress(&event(
                Outcome::DryRun,
                format!("would install {} via {pm}", status.package),
            ));
            outcome.skipped.push(SkippedDependency {
                item: status.item.clone(),
                reason: "dry run".to_string(),
            });
            continue;
        }

        ctx.progress(&event(Outcome::Started, format!("installing {}", status.package)));
        match pm.install_exact(ctx.executor.as_ref(), &[status.package.as_str()]) {
            Ok(()) => {
                ctx.progress(&event(Outcome::Done, format!("installed ({})", status.tier)));
                outcome.installed.push(status.item.clone());
            }
            Err(e) => {
                ctx.progress(&event(Outcome::Failed, format!("{e:#}")));
                outcome.failed.push(DependencyError {
                    name: name.clone(),
                    package: status.package.clone(),
                    source: e.into(),
                });
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::platform::Os;
    use crate::test_helpers::{RecordingExecutor, manifest, test_context, test_context_with};

    const DEPS: &str = r#"
[dependencies]
critical = ["git"]
core = [{ name = "fd", binary = "fd" }]
optional = ["python"]
"#;

    fn fedora() -> Platform {
        Platform::new(Os::Linux, "fedora", "dnf")
    }

    #[test]
    fn check_groups_by_tier_and_maps_names() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log, ex) = test_context_with(
            tmp.path(),
            tmp.path(),
            RecordingExecutor::new()
                .without_program("fd")
                .failing_on("rpm -q python3"),
        );
        let result = check(&ctx, &manifest(DEPS), &fedora()).unwrap();

        assert_eq!(result.critical.len(), 1);
        assert!(result.critical[0].installed);
        assert_eq!(result.core[0].package, "fd-find");
        assert!(!result.core[0].installed, "binary check wins for fd");
        assert_eq!(result.optional[0].package, "python3");
        assert!(!result.optional[0].installed);
        assert_eq!(result.missing().count(), 2);
        assert_eq!(result.missing_critical().count(), 0);
        assert!(!result.all_installed());
        assert_eq!(ex.calls(), vec!["rpm -q git", "rpm -q python3"]);
    }

    #[test]
    fn check_without_package_manager_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log, _ex) = test_context(tmp.path(), tmp.path());
        let platform = Platform::new(Os::Linux, "alpine", "apk");
        assert!(matches!(
            check(&ctx, &manifest(DEPS), &platform),
            Err(PlatformError::UnsupportedPackageManager(_))
        ));
    }

    #[test]
    fn install_only_missing_in_tier_order() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, log, ex) = test_context_with(
            tmp.path(),
            tmp.path(),
            RecordingExecutor::new()
                .failing_on("rpm -q git")
                .failing_on("rpm -q python3"),
        );
        let outcome = install(
            &ctx,
            &manifest(DEPS),
            &fedora(),
            DepsOptions { only_missing: true },
        )
        .unwrap();

        let installed: Vec<_> = outcome.installed.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(installed, vec!["git", "python"]);
        assert_eq!(outcome.skipped[0].item.name, "fd");
        assert!(outcome.failed.is_empty());
        assert_eq!(ex.count_prefix("sudo dnf install"), 2);

        let done: Vec<_> = log
            .events()
            .into_iter()
            .filter(|e| e.outcome == Outcome::Done)
            .map(|e| (e.current, e.total))
            .collect();
        assert_eq!(done, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn install_continues_after_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log, _ex) = test_context_with(
            tmp.path(),
            tmp.path(),
            RecordingExecutor::new().failing_on("install -y git"),
        );
        let outcome = install(&ctx, &manifest(DEPS), &fedora(), DepsOptions::default()).unwrap();

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].name, "git");
        assert_eq!(outcome.installed.len(), 2);
    }

    #[test]
    fn dry_run_invokes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut ctx, log, ex) = test_context(tmp.path(), tmp.path());
        ctx.dry_run = true;
        let outcome = install(&ctx, &manifest(DEPS), &fedora(), DepsOptions::default()).unwrap();

        assert!(outcome.installed.is_empty());
        assert_eq!(outcome.skipped.len(), 3);
        assert_eq!(ex.count_prefix("sudo"), 0);
        assert!(log.events().iter().all(|e| e.outcome == Outcome::DryRun));
    }
}
