//! Package manager abstraction.
use std::fmt;

use anyhow::Result;

use crate::config::DependencyItem;
use crate::error::PlatformError;
use crate::exec::Executor;

/// Logical names whose package differs per manager: `(logical, manager, package)`.
const NAME_MAP: &[(&str, &str, &str)] = &[
    ("fd", "apt", "fd-find"),
    ("fd", "dnf", "fd-find"),
    ("fd", "yum", "fd-find"),
    ("build-essential", "pacman", "base-devel"),
    ("python", "apt", "python3"),
    ("python", "dnf", "python3"),
    ("python", "yum", "python3"),
    ("python", "brew", "python3"),
];

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian / Ubuntu (`apt-get`).
    Apt,
    /// Fedora (`dnf`).
    Dnf,
    /// Older RHEL / CentOS (`yum`).
    Yum,
    /// Arch Linux (`pacman`).
    Pacman,
    /// Homebrew on macOS or Linux.
    Brew,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl PackageManager {
    /// Select the implementation for a package manager id.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoPackageManager`] for an empty id and
    /// [`PlatformError::UnsupportedPackageManager`] for an unknown one.
    pub fn from_id(id: &str) -> Result<Self, PlatformError> {
        match id {
            "apt" => Ok(Self::Apt),
            "dnf" => Ok(Self::Dnf),
            "yum" => Ok(Self::Yum),
            "pacman" => Ok(Self::Pacman),
            "brew" => Ok(Self::Brew),
            "" => Err(PlatformError::NoPackageManager),
            other => Err(PlatformError::UnsupportedPackageManager(other.to_string())),
        }
    }

    /// Identifier used in manifests and platform detection.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Brew => "brew",
        }
    }

    /// Executable that performs installs.
    const fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Brew => "brew",
        }
    }

    /// Whether installs run through `sudo`.
    #[must_use]
    pub const fn needs_sudo(self) -> bool {
        !matches!(self, Self::Brew)
    }

    /// Whether the manager's executable is on `PATH`.
    #[must_use]
    pub fn is_available(self, executor: &dyn Executor) -> bool {
        executor.which(self.program())
    }

    /// Map a logical name to this manager's package name via the built-in table.
    #[must_use]
    pub fn map_name(self, logical: &str) -> String {
        NAME_MAP
            .iter()
            .find(|(name, pm, _)| *name == logical && *pm == self.id())
            .map_or_else(|| logical.to_string(), |(_, _, pkg)| (*pkg).to_string())
    }

    /// Package name for a dependency: a manifest override wins over the table.
    #[must_use]
    pub fn package_name(self, item: &DependencyItem) -> String {
        item.package
            .get(self.id())
            .cloned()
            .unwrap_or_else(|| self.map_name(&item.name))
    }

    /// Install packages given by logical name.
    ///
    /// # Errors
    ///
    /// Returns an error if the install command fails.
    pub fn install(self, executor: &dyn Executor, logical: &[&str]) -> Result<()> {
        let mapped: Vec<String> = logical.iter().map(|n| self.map_name(n)).collect();
        let refs: Vec<&str> = mapped.iter().map(String::as_str).collect();
        self.install_exact(executor, &refs)
    }

    /// Install packages by their exact package-manager name.
    ///
    /// # Errors
    ///
    /// Returns an error if the install command fails.
    pub fn install_exact(self, executor: &dyn Executor, packages: &[&str]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = match self {
            Self::Apt | Self::Dnf | Self::Yum => vec!["install", "-y"],
            Self::Pacman => vec!["-S", "--needed", "--noconfirm"],
            Self::Brew => vec!["install"],
        };
        args.extend_from_slice(packages);
        self.run(executor, &args)
    }

    /// Whether a package, given by logical name, is installed.
    #[must_use]
    pub fn is_installed(self, executor: &dyn Executor, logical: &str) -> bool {
        self.is_package_installed(executor, &self.map_name(logical))
    }

    /// Whether a package, given by its exact name, is installed.
    #[must_use]
    pub fn is_package_installed(self, executor: &dyn Executor, package: &str) -> bool {
        let (program, args): (&str, Vec<&str>) = match self {
            Self::Apt => ("dpkg", vec!["-s", package]),
            Self::Dnf | Self::Yum => ("rpm", vec!["-q", package]),
            Self::Pacman => ("pacman", vec!["-Q", package]),
            Self::Brew => ("brew", vec!["list", "--versions", package]),
        };
        executor
            .run_unchecked(program, &args)
            .is_ok_and(|r| r.success)
    }

    /// Refresh the package index.
    ///
    /// `dnf`/`yum check-update` exits 100 when updates exist, so its exit
    /// status is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the update command fails (or cannot be spawned).
    pub fn update(self, executor: &dyn Executor) -> Result<()> {
        match self {
            Self::Apt => self.run(executor, &["update"]),
            Self::Dnf | Self::Yum => {
                executor.run_unchecked("sudo", &[self.program(), "check-update"])?;
                Ok(())
            }
            Self::Pacman => self.run(executor, &["-Sy"]),
            Self::Brew => self.run(executor, &["update"]),
        }
    }

    fn run(self, executor: &dyn Executor, args: &[&str]) -> Result<()> {
        if self.needs_sudo() {
            let full: Vec<&str> = std::iter::once(self.program())
                .chain(args.iter().copied())
                .collect();
            executor.run("sudo", &full)?;
        } else {
            executor.run(self.program(), args)?;
        }
        Ok(())
    }
}
