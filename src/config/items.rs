//! Manifest item types.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};

/// Manifest metadata.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// Dotfiles repository name.
    #[serde(default)]
    pub name: String,
    /// Author shown in `list`.
    #[serde(default)]
    pub author: String,
    /// Repository URL.
    #[serde(default)]
    pub repository: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Version of the dotfiles themselves.
    #[serde(default)]
    pub version: String,
}

/// A named group of config files symlinked into the home directory.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ConfigItem {
    /// Unique group name.
    pub name: String,
    /// Directory under the dotfiles root; defaults to `name` when empty.
    #[serde(default)]
    pub path: String,
    /// Shown in `list`.
    #[serde(default)]
    pub description: String,
    /// Platforms the group applies to (`linux`, `darwin`, a distro id, `all`).
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl ConfigItem {
    /// A group whose directory matches its name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: name.to_string(),
            ..Self::default()
        }
    }

    /// Directory (relative to the dotfiles root) holding the group's files.
    #[must_use]
    pub fn source_dir(&self) -> &str {
        if self.path.is_empty() {
            &self.name
        } else {
            &self.path
        }
    }
}

/// Core and optional config groups.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Configs {
    /// Installed by default, including in minimal mode.
    #[serde(default)]
    pub core: Vec<ConfigItem>,
    /// Installed unless minimal mode is selected.
    #[serde(default)]
    pub optional: Vec<ConfigItem>,
}

/// A package the dotfiles need.
///
/// Accepts either a bare name (`"git"`) or a table with a binary name and
/// per-package-manager overrides.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(from = "DependencySpec")]
pub struct DependencyItem {
    /// Logical dependency name.
    pub name: String,
    /// Executable that proves the dependency is installed.
    pub binary: Option<String>,
    /// Package name per package manager id, overriding the built-in mapping.
    pub package: BTreeMap<String, String>,
}

impl DependencyItem {
    /// A dependency with no binary or overrides.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencySpec {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        binary: Option<String>,
        #[serde(default)]
        package: BTreeMap<String, String>,
    },
}

impl From<DependencySpec> for DependencyItem {
    fn from(spec: DependencySpec) -> Self {
        match spec {
            DependencySpec::Name(name) => Self::named(&name),
            DependencySpec::Full {
                name,
                binary,
                package,
            } => Self {
                name,
                binary,
                package,
            },
        }
    }
}

/// Dependencies in priority tiers.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Dependencies {
    /// Required for the engine itself (e.g. `git`, `stow`).
    #[serde(default)]
    pub critical: Vec<DependencyItem>,
    /// Needed by the core configs.
    #[serde(default)]
    pub core: Vec<DependencyItem>,
    /// Nice to have.
    #[serde(default)]
    pub optional: Vec<DependencyItem>,
}

/// A third-party repository placed at a fixed destination.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ExternalDep {
    /// Unique id.
    pub id: String,
    /// Display name; falls back to the id.
    #[serde(default)]
    pub name: String,
    /// Git URL.
    #[serde(default)]
    pub url: String,
    /// Destination path, `~` allowed.
    #[serde(default)]
    pub destination: String,
    /// `clone` (default) or `copy`.
    #[serde(default)]
    pub method: String,
    /// Condition keys (`os`, `distro`, `package_manager`, `wsl`, `arch`).
    #[serde(default, deserialize_with = "scalar_map")]
    pub condition: BTreeMap<String, String>,
}

impl ExternalDep {
    /// Name shown to the user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Kind of prompt field.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    /// Free text.
    #[default]
    Text,
    /// Yes/no, stored as `"true"` or `"false"`.
    Confirm,
    /// Free text whose default is never echoed.
    Password,
    /// One of a fixed list of options.
    Select,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Confirm => "confirm",
            Self::Password => "password",
            Self::Select => "select",
        })
    }
}

/// A value collected for a machine config template.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PromptField {
    /// Variable name used in the template.
    pub id: String,
    /// Question shown to the user.
    #[serde(default, alias = "prompt")]
    pub label: String,
    /// Field kind.
    #[serde(default, rename = "type")]
    pub kind: PromptKind,
    /// Value used when the answer is empty or prompting is skipped.
    #[serde(default, deserialize_with = "scalar")]
    pub default: String,
    /// Whether an empty value is rejected.
    #[serde(default)]
    pub required: bool,
    /// Choices for `select` fields.
    #[serde(default)]
    pub options: Vec<String>,
}

/// A per-machine file rendered from a template and prompted values.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MachinePrompt {
    /// Unique id.
    pub id: String,
    /// Shown in status listings.
    #[serde(default)]
    pub description: String,
    /// Output path, `~` allowed.
    #[serde(default)]
    pub destination: String,
    /// Template text with `{{ name }}` placeholders.
    #[serde(default)]
    pub template: String,
    /// Fields collected before rendering.
    #[serde(default)]
    pub prompts: Vec<PromptField>,
}

impl MachinePrompt {
    /// Whether any field holds a secret.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.prompts.iter().any(|p| p.kind == PromptKind::Password)
    }
}

/// Scalar TOML value accepted where the engine stores a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Flag(bool),
    Int(i64),
    Float(f64),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Flag(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn scalar_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, String::from(v))).collect())
}
