//! Health checks for a dotfiles installation.
//!
//! [`diagnose`] never fails: every problem becomes a [`HealthCheck`] with a
//! status and, where one exists, a suggested fix.
use std::fmt;

use crate::config::Manifest;
use crate::context::Context;
use crate::deps;
use crate::platform::Platform;
use crate::state::State;
use crate::stow;

/// Result of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Nothing to fix.
    Ok,
    /// Usable, but something looks wrong.
    Warning,
    /// An install or update would fail.
    Error,
    /// Not applicable here.
    Skipped,
}

impl CheckStatus {
    /// Marker shown before the check name.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Warning => "!",
            Self::Error => "✗",
            Self::Skipped => "⊘",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Skipped => "skipped",
        })
    }
}

/// One named check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Short name, e.g. "stow".
    pub name: &'static str,
    /// Outcome.
    pub status: CheckStatus,
    /// What was found.
    pub message: String,
    /// How to fix a warning or error.
    pub fix: Option<String>,
}

impl HealthCheck {
    fn ok(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Ok,
            message: message.into(),
            fix: None,
        }
    }

    fn skipped(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            message: message.into(),
            fix: None,
        }
    }

    fn problem(
        name: &'static str,
        status: CheckStatus,
        message: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            fix: Some(fix.into()),
        }
    }
}

/// Every check, in the order they ran.
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    /// Check results.
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// Number of checks with `status`.
    #[must_use]
    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// True when no check is an error.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.count(CheckStatus::Error) == 0
    }

    /// Suggested fixes for failing checks, errors first, without duplicates.
    #[must_use]
    pub fn fixes(&self) -> Vec<&str> {
        let mut fixes: Vec<&str> = Vec::new();
        for status in [CheckStatus::Error, CheckStatus::Warning] {
            for fix in self
                .checks
                .iter()
                .filter(|c| c.status == status)
                .filter_map(|c| c.fix.as_deref())
            {
                if !fixes.contains(&fix) {
                    fixes.push(fix);
                }
            }
        }
        fixes
    }
}

/// Check the tools, dependencies, and recorded state this repository needs.
///
/// `platform` is `None` when detection failed; checks that need it are
/// skipped.
#[must_use]
pub fn diagnose(
    ctx: &Context,
    manifest: &Manifest,
    platform: Option<&Platform>,
    state: Option<&State>,
) -> HealthReport {
    let mut checks = vec![
        platform_check(platform),
        git_check(ctx),
        stow_check(ctx),
        dependency_check(ctx, manifest, platform),
        sources_check(ctx, manifest),
    ];
    checks.extend(state_checks(manifest, state));
    HealthReport { checks }
}

fn platform_check(platform: Option<&Platform>) -> HealthCheck {
    platform.map_or_else(
        || {
            HealthCheck::problem(
                "platform",
                CheckStatus::Error,
                "detection failed",
                "run `dotstow detect -v` for details",
            )
        },
        |p| HealthCheck::ok("platform", p.describe()),
    )
}

fn git_check(ctx: &Context) -> HealthCheck {
    if ctx.executor.which("git") {
        HealthCheck::ok("git", "found")
    } else {
        HealthCheck::problem(
            "git",
            CheckStatus::Error,
            "not found on PATH",
            "install git with your package manager",
        )
    }
}

fn stow_check(ctx: &Context) -> HealthCheck {
    match stow::validate_stow(ctx) {
        Ok(()) => HealthCheck::ok("stow", "found"),
        Err(e) => HealthCheck::problem(
            "stow",
            CheckStatus::Error,
            format!("{e:#}"),
            "install GNU stow with your package manager",
        ),
    }
}

fn dependency_check(ctx: &Context, manifest: &Manifest, platform: Option<&Platform>) -> HealthCheck {
    const NAME: &str = "dependencies";
    let declared = &manifest.dependencies;
    if declared.critical.is_empty() && declared.core.is_empty() && declared.optional.is_empty() {
        return HealthCheck::skipped(NAME, "none declared");
    }
    let Some(platform) = platform else {
        return HealthCheck::skipped(NAME, "platform unknown");
    };
    let result = match deps::check(ctx, manifest, platform) {
        Ok(result) => result,
        Err(e) => {
            return HealthCheck::problem(
                NAME,
                CheckStatus::Error,
                e.to_string(),
                "install a supported package manager (dnf, yum, apt, pacman, or brew)",
            );
        }
    };
    let names = |items: &[&deps::DependencyStatus]| {
        items
            .iter()
            .map(|s| s.item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let critical: Vec<_> = result.missing_critical().collect();
    if !critical.is_empty() {
        return HealthCheck::problem(
            NAME,
            CheckStatus::Error,
            format!("critical missing: {}", names(&critical)),
            "run `dotstow deps install`",
        );
    }
    let missing: Vec<_> = result.missing().collect();
    if missing.is_empty() {
        HealthCheck::ok(NAME, format!("all {} installed", result.all().count()))
    } else {
        HealthCheck::problem(
            NAME,
            CheckStatus::Warning,
            format!("{} missing: {}", missing.len(), names(&missing)),
            "run `dotstow deps install`",
        )
    }
}

fn sources_check(ctx: &Context, manifest: &Manifest) -> HealthCheck {
    const NAME: &str = "config sources";
    let total = manifest.all_configs().count();
    if total == 0 {
        return HealthCheck::skipped(NAME, "no config groups declared");
    }
    let missing: Vec<&str> = manifest
        .all_configs()
        .filter(|c| !ctx.root.join(c.source_dir()).is_dir())
        .map(|c| c.name.as_str())
        .collect();
    if missing.is_empty() {
        HealthCheck::ok(NAME, format!("all {total} group directories present"))
    } else {
        HealthCheck::problem(
            NAME,
            CheckStatus::Warning,
            format!("missing under {}: {}", ctx.root.display(), missing.join(", ")),
            "create the group directories or remove them from the manifest",
        )
    }
}

fn state_checks(manifest: &Manifest, state: Option<&State>) -> Vec<HealthCheck> {
    let Some(state) = state else {
        return vec![HealthCheck::problem(
            "state",
            CheckStatus::Warning,
            "not installed",
            "run `dotstow install`",
        )];
    };

    let stale: Vec<&str> = state
        .configs
        .iter()
        .filter(|c| manifest.config(&c.name).is_none())
        .map(|c| c.name.as_str())
        .collect();
    let state_check = if stale.is_empty() {
        HealthCheck::ok(
            "state",
            format!(
                "{} groups, {} external, {} machine configs recorded",
                state.configs.len(),
                state.externals.len(),
                state.machine_configs.len()
            ),
        )
    } else {
        HealthCheck::problem(
            "state",
            CheckStatus::Warning,
            format!("no longer in manifest: {}", stale.join(", ")),
            "unstow them with `dotstow stow remove <name>`",
        )
    };

    let vanished: Vec<&str> = state
        .externals
        .iter()
        .filter(|(_, e)| !e.path.exists())
        .map(|(id, _)| id.as_str())
        .chain(
            state
                .machine_configs
                .iter()
                .filter(|(_, m)| !m.destination.exists())
                .map(|(id, _)| id.as_str()),
        )
        .collect();
    let files_check = if vanished.is_empty() {
        HealthCheck::ok("recorded files", "all present")
    } else {
        HealthCheck::problem(
            "recorded files",
            CheckStatus::Warning,
            format!("missing: {}", vanished.join(", ")),
            "run `dotstow install` to restore them",
        )
    };

    vec![state_check, files_check]
}
