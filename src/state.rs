//! Persisted install state.
//!
//! The state file records what is actually active on this machine, as
//! opposed to what the manifest merely declares. A missing file means
//! nothing has been installed.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::platform::Platform;

/// Current state file format version.
pub const STATE_VERSION: u32 = 1;

/// Environment variable overriding the state file location.
pub const STATE_ENV: &str = "DOTSTOW_STATE";

/// Platform summary stored with the state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformState {
    /// OS id.
    pub os: String,
    /// Distribution id.
    pub distro: String,
    /// Package manager id.
    pub package_manager: String,
}

impl From<&Platform> for PlatformState {
    fn from(platform: &Platform) -> Self {
        Self {
            os: platform.os.as_str().to_string(),
            distro: platform.distro.clone(),
            package_manager: platform.package_manager.clone(),
        }
    }
}

/// A stowed config group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigState {
    /// Group name.
    pub name: String,
    /// Directory under the dotfiles root.
    pub path: String,
    /// When it was stowed.
    pub stowed_at: DateTime<Utc>,
}

/// An installed external asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalState {
    /// Whether it is present.
    pub installed: bool,
    /// Expanded destination.
    pub path: PathBuf,
    /// When it was installed.
    pub installed_at: DateTime<Utc>,
}

/// A written machine config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineState {
    /// Expanded destination.
    pub destination: PathBuf,
    /// When it was written.
    pub configured_at: DateTime<Utc>,
}

/// Everything dotstow has installed on this machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    /// Format version.
    pub version: u32,
    /// Dotfiles root the state belongs to.
    pub dotfiles_path: PathBuf,
    /// Manifest display name.
    pub manifest_name: String,
    /// Platform at install time.
    #[serde(default)]
    pub platform: PlatformState,
    /// First install.
    pub installed_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// Stowed groups in install order.
    #[serde(default)]
    pub configs: Vec<ConfigState>,
    /// Installed external assets by id.
    #[serde(default)]
    pub externals: BTreeMap<String, ExternalState>,
    /// Written machine configs by id.
    #[serde(default)]
    pub machine_configs: BTreeMap<String, MachineState>,
}

impl State {
    /// Fresh state for a dotfiles root.
    #[must_use]
    pub fn new(dotfiles_path: &Path, manifest_name: &str) -> Self {
        let now = Utc::now();
        Self {
            version: STATE_VERSION,
            dotfiles_path: dotfiles_path.to_path_buf(),
            manifest_name: manifest_name.to_string(),
            platform: PlatformState::default(),
            installed_at: now,
            updated_at: now,
            configs: Vec::new(),
            externals: BTreeMap::new(),
            machine_configs: BTreeMap::new(),
        }
    }

    /// Record a stowed group; a group already present keeps its first entry.
    pub fn add_config(&mut self, name: &str, path: &str) {
        if !self.has_config(name) {
            self.configs.push(ConfigState {
                name: name.to_string(),
                path: path.to_string(),
                stowed_at: Utc::now(),
            });
        }
        self.touch();
    }

    /// Forget a group. Returns whether it was recorded.
    pub fn remove_config(&mut self, name: &str) -> bool {
        let before = self.configs.len();
        self.configs.retain(|c| c.name != name);
        self.touch();
        self.configs.len() != before
    }

    /// Whether a group is recorded as stowed.
    #[must_use]
    pub fn has_config(&self, name: &str) -> bool {
        self.configs.iter().any(|c| c.name == name)
    }

    /// Names of stowed groups in install order.
    #[must_use]
    pub fn config_names(&self) -> Vec<String> {
        self.configs.iter().map(|c| c.name.clone()).collect()
    }

    /// Record an installed external asset.
    pub fn set_external(&mut self, id: &str, path: &Path) {
        self.externals.insert(
            id.to_string(),
            ExternalState {
                installed: true,
                path: path.to_path_buf(),
                installed_at: Utc::now(),
            },
        );
        self.touch();
    }

    /// Forget an external asset.
    pub fn remove_external(&mut self, id: &str) -> bool {
        let removed = self.externals.remove(id).is_some();
        self.touch();
        removed
    }

    /// Record a written machine config.
    pub fn set_machine_config(&mut self, id: &str, destination: &Path) {
        self.machine_configs.insert(
            id.to_string(),
            MachineState {
                destination: destination.to_path_buf(),
                configured_at: Utc::now(),
            },
        );
        self.touch();
    }

    /// Forget a machine config.
    pub fn remove_machine_config(&mut self, id: &str) -> bool {
        let removed = self.machine_configs.remove(id).is_some();
        self.touch();
        removed
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Location of the state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `$XDG_CONFIG_HOME/dotstow/state.json`, or `~/.config/dotstow/state.json`.
    #[must_use]
    pub fn default_path(home: &Path) -> PathBuf {
        std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map_or_else(|| home.join(".config"), PathBuf::from)
            .join("dotstow")
            .join("state.json")
    }

    /// Pick the state file: an explicit path, then `$DOTSTOW_STATE`, then the default.
    #[must_use]
    pub fn resolve(explicit: Option<&Path>, home: &Path) -> Self {
        let path = explicit.map_or_else(
            || {
                std::env::var_os(STATE_ENV)
                    .filter(|v| !v.is_empty())
                    .map_or_else(|| Self::default_path(home), PathBuf::from)
            },
            Path::to_path_buf,
        );
        Self::new(path)
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state; `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<State>, StateError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StateError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Write the state, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when serialization or any filesystem step fails.
    pub fn save(&self, state: &State) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp, json + "\n").map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }

    /// Remove the state file; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] when the file exists but cannot be removed.
    pub fn delete(&self) -> Result<(), StateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::platform::Os;

    #[test]
    fn missing_file_loads_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
        store.delete().unwrap();
    }

    #[test]
    fn save_then_load_preserves_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("nested/dir/state.json"));
        let mut state = State::new(Path::new("/home/u/dotfiles"), "my-dots");
        state.platform = PlatformState::from(&Platform::new(Os::Linux, "arch", "pacman"));
        state.add_config("git", "git");
        state.set_external("tpm", Path::new("/home/u/.tmux/plugins/tpm"));
        state.set_machine_config("git", Path::new("/home/u/.gitconfig.local"));

        store.save(&state).unwrap();
        assert!(!tmp.path().join("nested/dir/state.json.tmp").exists());
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.platform.package_manager, "pacman");

        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            StateStore::new(path).load(),
            Err(StateError::Parse { .. })
        ));
    }

    #[test]
    fn config_mutators() {
        let mut state = State::new(Path::new("/d"), "d");
        state.add_config("git", "git");
        state.add_config("zsh", "shell/zsh");
        state.add_config("git", "other");
        assert_eq!(state.config_names(), vec!["git", "zsh"]);
        assert_eq!(state.configs[0].path, "git");
        assert!(state.remove_config("git"));
        assert!(!state.remove_config("git"));
        assert!(!state.has_config("git"));
        assert!(state.has_config("zsh"));
    }

    #[test]
    fn external_and_machine_mutators() {
        let mut state = State::new(Path::new("/d"), "d");
        state.set_external("tpm", Path::new("/x"));
        assert!(state.externals["tpm"].installed);
        assert!(state.remove_external("tpm"));
        assert!(!state.remove_external("tpm"));
        state.set_machine_config("git", Path::new("/y"));
        assert!(state.remove_machine_config("git"));
        assert!(state.machine_configs.is_empty());
    }

    #[test]
    fn explicit_path_wins() {
        let store = StateStore::resolve(Some(Path::new("/tmp/s.json")), Path::new("/home/u"));
        assert_eq!(store.path(), Path::new("/tmp/s.json"));
    }

    #[test]
    fn state_file_format_is_stable() {
        let mut state = State::new(Path::new("/home/u/dotfiles"), "dots");
        let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        state.installed_at = epoch;
        state.updated_at = epoch;
        state.configs.push(ConfigState {
            name: "git".to_string(),
            path: "git".to_string(),
            stowed_at: epoch,
        });
        insta::assert_snapshot!(serde_json::to_string_pretty(&state).unwrap(), @r#"
        {
          "version": 1,
          "dotfiles_path": "/home/u/dotfiles",
          "manifest_name": "dots",
          "platform": {
            "os": "",
            "distro": "",
            "package_manager": ""
          },
          "installed_at": "1970-01-01T00:00:00Z",
          "updated_at": "1970-01-01T00:00:00Z",
          "configs": [
            {
              "name": "git",
              "path": "git",
              "stowed_at": "1970-01-01T00:00:00Z"
            }
          ],
          "externals": {},
          "machine_configs": {}
        }
        "#);
    }
}
