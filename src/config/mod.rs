//! The dotfiles manifest: discovery, parsing, and lookups.
pub mod items;
pub mod validation;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use items::{
    ConfigItem, Configs, Dependencies, DependencyItem, ExternalDep, MachinePrompt, Metadata,
    PromptField, PromptKind,
};
pub use validation::ValidationWarning;

use crate::error::ManifestError;

/// File name looked for in the dotfiles root.
pub const MANIFEST_FILE_NAME: &str = ".dotstow.toml";

/// Schema major version this build reads.
pub const SUPPORTED_SCHEMA_MAJOR: &str = "1";

/// Environment variable naming the dotfiles root.
pub const ROOT_ENV: &str = "DOTSTOW_ROOT";

fn default_schema() -> String {
    "1.0".to_string()
}

/// Everything declared by a dotfiles repository.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Manifest {
    /// Manifest schema version (`major.minor`).
    #[serde(default = "default_schema")]
    pub schema_version: String,
    /// Descriptive metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Config groups.
    #[serde(default)]
    pub configs: Configs,
    /// Retired groups, listed with `list --all` and never installed.
    #[serde(default)]
    pub archived: Vec<ConfigItem>,
    /// Packages.
    #[serde(default)]
    pub dependencies: Dependencies,
    /// Third-party repositories.
    #[serde(default)]
    pub external: Vec<ExternalDep>,
    /// Per-machine rendered files.
    #[serde(default)]
    pub machine_config: Vec<MachinePrompt>,
    /// Free text shown after a successful install.
    #[serde(default)]
    pub post_install: String,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: default_schema(),
            metadata: Metadata::default(),
            configs: Configs::default(),
            archived: Vec::new(),
            dependencies: Dependencies::default(),
            external: Vec::new(),
            machine_config: Vec::new(),
            post_install: String::new(),
        }
    }
}

impl Manifest {
    /// Parse manifest TOML without structural validation.
    ///
    /// # Errors
    ///
    /// Returns the TOML error when the text is malformed or mistyped.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read, parse, and validate a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file is missing or unreadable, is
    /// not valid TOML, declares an unsupported schema, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.is_file() {
            return Err(ManifestError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_toml(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        validation::check(&manifest)?;
        Ok(manifest)
    }

    /// Non-fatal findings about this manifest.
    #[must_use]
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        validation::warnings(self)
    }

    /// Core then optional config groups.
    pub fn all_configs(&self) -> impl Iterator<Item = &ConfigItem> {
        self.configs.core.iter().chain(&self.configs.optional)
    }

    /// Look up a config group by name.
    #[must_use]
    pub fn config(&self, name: &str) -> Option<&ConfigItem> {
        self.all_configs().find(|c| c.name == name)
    }

    /// Look up an external asset by id.
    #[must_use]
    pub fn external(&self, id: &str) -> Option<&ExternalDep> {
        self.external.iter().find(|e| e.id == id)
    }

    /// Look up a machine config by id.
    #[must_use]
    pub fn machine(&self, id: &str) -> Option<&MachinePrompt> {
        self.machine_config.iter().find(|m| m.id == id)
    }

    /// Name shown for the manifest in summaries and state.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.metadata.name.is_empty() {
            "dotfiles"
        } else {
            &self.metadata.name
        }
    }
}

/// Locate the manifest.
///
/// An explicit path (a manifest file or a directory containing one) wins.
/// Otherwise `$DOTSTOW_ROOT`, `cwd`, `~/dotfiles`, `~/.dotfiles`, and
/// `~/.config/dotfiles` are tried in that order.
///
/// # Errors
///
/// Returns [`ManifestError::MissingFile`] when the explicit path has no
/// manifest, or [`ManifestError::NotFound`] listing every searched location.
pub fn discover(
    explicit: Option<&Path>,
    env_root: Option<&Path>,
    cwd: &Path,
    home: &Path,
) -> Result<PathBuf, ManifestError> {
    if let Some(path) = explicit {
        let candidate = if path.is_dir() {
            path.join(MANIFEST_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        return if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(ManifestError::MissingFile { path: candidate })
        };
    }

    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(root) = env_root {
        dirs.push(root.to_path_buf());
    }
    dirs.push(cwd.to_path_buf());
    dirs.push(home.join("dotfiles"));
    dirs.push(home.join(".dotfiles"));
    dirs.push(home.join(".config").join("dotfiles"));

    let candidates: Vec<PathBuf> = dirs.iter().map(|d| d.join(MANIFEST_FILE_NAME)).collect();
    if let Some(found) = candidates.iter().find(|c| c.is_file()) {
        return Ok(found.clone());
    }
    Err(ManifestError::NotFound {
        searched: candidates
            .iter()
            .map(|c| c.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Dotfiles root for a manifest path: its parent directory.
#[must_use]
pub fn root_of(manifest_path: &Path) -> PathBuf {
    let parent = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    dunce::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf())
}
