//! Host platform detection.
//!
//! Determines the OS family, Linux distribution, package manager, CPU
//! architecture, and whether the host is WSL.
use std::fmt;
use std::path::Path;

use crate::error::PlatformError;
use crate::exec::Executor;

/// Package managers probed on Linux, in priority order.
const LINUX_MANAGERS: [&str; 5] = ["dnf", "yum", "apt", "pacman", "brew"];

/// Files consulted for the Linux distribution identity, in order.
const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// Detected operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Any Linux distribution.
    Linux,
    /// macOS.
    Darwin,
    /// Windows.
    Windows,
}

impl Os {
    /// Map a Rust `target_os` identifier onto a supported OS.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedOs`] for anything else.
    pub fn from_id(id: &str) -> Result<Self, PlatformError> {
        match id {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::Darwin),
            "windows" => Ok(Self::Windows),
            other => Err(PlatformError::UnsupportedOs(other.to_string())),
        }
    }

    /// Identifier used in manifests and conditions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// Distribution id (`fedora`, `ubuntu`, `macos`, ...).
    pub distro: String,
    /// Distribution version, empty when unknown.
    pub distro_version: String,
    /// Package manager id, empty when none was found.
    pub package_manager: String,
    /// CPU architecture (`x86_64`, `aarch64`, ...).
    pub architecture: String,
    /// Whether this is a Linux environment under WSL.
    pub is_wsl: bool,
}

impl Platform {
    /// Detect the current platform.
    ///
    /// # Errors
    ///
    /// Returns an error when the OS is unsupported or, on Linux, when no
    /// `os-release` file can be read.
    pub fn detect(executor: &dyn Executor) -> Result<Self, PlatformError> {
        let os = Os::from_id(std::env::consts::OS)?;
        let (distro, distro_version) = match os {
            Os::Linux => read_os_release()?,
            Os::Darwin => ("macos".to_string(), macos_version(executor)),
            Os::Windows => ("windows".to_string(), String::new()),
        };
        let is_wsl = os == Os::Linux && detect_wsl();
        let package_manager = detect_package_manager(os, executor)
            .map(str::to_string)
            .unwrap_or_default();

        Ok(Self {
            os,
            distro,
            distro_version,
            package_manager,
            architecture: std::env::consts::ARCH.to_string(),
            is_wsl,
        })
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub fn new(os: Os, distro: &str, package_manager: &str) -> Self {
        Self {
            os,
            distro: distro.to_string(),
            distro_version: String::new(),
            package_manager: package_manager.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            is_wsl: false,
        }
    }

    /// Check whether a declared platform list admits this platform.
    ///
    /// An empty list, or one containing `all`, matches everywhere. Otherwise
    /// an entry must equal the OS or the distribution id.
    #[must_use]
    pub fn matches_any(&self, platforms: &[String]) -> bool {
        platforms.is_empty()
            || platforms.iter().any(|p| {
                let p = p.trim();
                p.eq_ignore_ascii_case("all")
                    || p.eq_ignore_ascii_case(self.os.as_str())
                    || p.eq_ignore_ascii_case(&self.distro)
            })
    }

    /// One-line description used in summaries.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!("{} ({}", self.os, self.distro);
        if !self.distro_version.is_empty() {
            out.push(' ');
            out.push_str(&self.distro_version);
        }
        out.push(')');
        if self.is_wsl {
            out.push_str(" [wsl]");
        }
        out
    }
}

/// Read the distribution id and version from the first readable `os-release`.
fn read_os_release() -> Result<(String, String), PlatformError> {
    for path in OS_RELEASE_PATHS {
        if let Ok(content) = std::fs::read_to_string(path) {
            let (id, version) = parse_os_release(&content);
            if id.is_empty() {
                return Err(PlatformError::DetectionFailed(format!("no ID in {path}")));
            }
            return Ok((id, version));
        }
    }
    Err(PlatformError::DetectionFailed(format!(
        "cannot read {}",
        OS_RELEASE_PATHS.join(" or ")
    )))
}

/// Extract `ID` (lowercased) and `VERSION_ID` from `os-release` content.
#[must_use]
pub fn parse_os_release(content: &str) -> (String, String) {
    let mut id = String::new();
    let mut version = String::new();
    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key.trim() {
            "ID" => id = value.to_ascii_lowercase(),
            "VERSION_ID" => version = value.to_string(),
            _ => {}
        }
    }
    (id, version)
}

fn macos_version(executor: &dyn Executor) -> String {
    executor
        .run_unchecked("sw_vers", &["-productVersion"])
        .ok()
        .filter(|r| r.success)
        .map(|r| r.stdout.trim().to_string())
        .unwrap_or_default()
}

fn detect_wsl() -> bool {
    if std::env::var_os("WSL_DISTRO_NAME").is_some() || std::env::var_os("WSL_INTEROP").is_some()
    {
        return true;
    }
    std::fs::read_to_string(Path::new("/proc/version"))
        .is_ok_and(|v| kernel_mentions_wsl(&v))
}

/// Check a `/proc/version` string for the WSL kernel signature.
#[must_use]
pub fn kernel_mentions_wsl(proc_version: &str) -> bool {
    let lower = proc_version.to_ascii_lowercase();
    lower.contains("microsoft") || lower.contains("wsl")
}

/// Pick the first available package manager for an OS.
pub fn detect_package_manager(os: Os, executor: &dyn Executor) -> Option<&'static str> {
    match os {
        Os::Linux => LINUX_MANAGERS.into_iter().find(|pm| executor.which(pm)),
        Os::Darwin => executor.which("brew").then_some("brew"),
        Os::Windows => None,
    }
}
