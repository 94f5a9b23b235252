//! Domain-specific error types for the installation engine.
//!
//! Internal modules return typed errors (e.g., [`ManifestError`],
//! [`ExternalError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotstowError
//! ├── Platform(PlatformError)     — OS / package manager detection
//! ├── Manifest(ManifestError)     — discovery, parsing, validation
//! ├── Dependency(DependencyError) — a single package install
//! ├── External(ExternalError)     — external asset clone / update / remove
//! ├── Stow(StowError)             — a single symlink group
//! ├── Template(TemplateError)     — machine config prompts and rendering
//! └── State(StateError)           — install state persistence
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by errors that wrap a failed external command.
pub type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum DotstowError {
    /// Platform detection or package manager resolution failed.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// The manifest could not be found, read, or validated.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// A dependency could not be installed.
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// An external asset operation failed.
    #[error("External error: {0}")]
    External(#[from] ExternalError),

    /// A symlink group operation failed.
    #[error("Stow error: {0}")]
    Stow(#[from] StowError),

    /// Machine config collection or rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// The state file could not be read or written.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Errors that arise while detecting the host platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The operating system is not one the engine supports.
    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    /// Platform detection failed (e.g., unreadable system info).
    #[error("Platform detection failed: {0}")]
    DetectionFailed(String),

    /// A package manager identifier has no implementation.
    #[error("Unsupported package manager: {0}")]
    UnsupportedPackageManager(String),

    /// No supported package manager was found on this host.
    #[error("No supported package manager found")]
    NoPackageManager,
}

/// Errors that arise while locating, parsing, or validating the manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No manifest file exists in any of the searched locations.
    #[error("No manifest found (searched: {searched})")]
    NotFound {
        /// Comma-separated list of searched paths.
        searched: String,
    },

    /// An explicitly requested manifest path does not exist.
    #[error("Manifest not found: {}", .path.display())]
    MissingFile {
        /// The requested path.
        path: PathBuf,
    },

    /// The manifest file could not be read.
    #[error("IO error reading manifest {}: {source}", .path.display())]
    Io {
        /// Path to the manifest.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or does not match the schema.
    #[error("Invalid manifest syntax in {}: {source}", .path.display())]
    Parse {
        /// Path to the manifest.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The manifest declares a schema major version this build cannot read.
    #[error("Unsupported schema version '{0}'")]
    UnsupportedSchema(String),

    /// The manifest parsed but failed structural validation.
    #[error("Invalid manifest: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// A package install failed for one dependency.
#[derive(Error, Debug)]
#[error("Failed to install '{name}' ({package}): {source}")]
pub struct DependencyError {
    /// Logical dependency name from the manifest.
    pub name: String,
    /// Package name passed to the package manager.
    pub package: String,
    /// Underlying error from the package manager.
    pub source: Cause,
}

/// Errors that arise from external asset operations.
#[derive(Error, Debug)]
pub enum ExternalError {
    /// No external asset with this id is declared.
    #[error("External dependency '{0}' not found in manifest")]
    NotFound(String),

    /// The asset's condition does not match this platform.
    #[error("Condition not met for '{0}' on this platform")]
    ConditionNotMet(String),

    /// The destination exists and updating was not requested.
    #[error("'{id}' already exists at {}", .path.display())]
    AlreadyExists {
        /// Asset id.
        id: String,
        /// Expanded destination path.
        path: PathBuf,
    },

    /// The asset is not present at its destination.
    #[error("'{id}' is not installed at {}", .path.display())]
    NotInstalled {
        /// Asset id.
        id: String,
        /// Expanded destination path.
        path: PathBuf,
    },

    /// The asset declares a retrieval method the engine does not know.
    #[error("Unknown method '{method}' for '{id}'")]
    UnknownMethod {
        /// Asset id.
        id: String,
        /// The declared method.
        method: String,
    },

    /// The `git` executable is not available.
    #[error("git is required but was not found in PATH")]
    GitMissing,

    /// Removing this path would delete the dotfiles repository.
    #[error("Refusing to remove {}: it contains the dotfiles repository", .path.display())]
    Protected {
        /// The refused path.
        path: PathBuf,
    },

    /// Cloning failed.
    #[error("Failed to clone '{id}': {source}")]
    Clone {
        /// Asset id.
        id: String,
        /// Underlying error.
        source: Cause,
    },

    /// Updating an existing clone failed.
    #[error("Failed to update '{id}': {source}")]
    Update {
        /// Asset id.
        id: String,
        /// Underlying error.
        source: Cause,
    },

    /// Removing the destination failed.
    #[error("Failed to remove '{id}': {source}")]
    Remove {
        /// Asset id.
        id: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A symlink operation failed for one config group.
#[derive(Error, Debug)]
#[error("Stow failed for '{group}': {source}")]
pub struct StowError {
    /// Name of the config group.
    pub group: String,
    /// Underlying error from the symlink tool.
    pub source: Cause,
}

/// Errors that arise while collecting values for or rendering machine configs.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No machine config with this id is declared.
    #[error("Machine config '{0}' not found in manifest")]
    NotFound(String),

    /// Prompts are skipped and a required field has no default.
    #[error("Required field '{0}' has no default value")]
    MissingDefault(String),

    /// Input ended before a required field received a value.
    #[error("Required field '{0}' was not provided")]
    NotProvided(String),

    /// The user did not give an acceptable answer within the retry bound.
    #[error("No valid value for '{field}' after {attempts} attempts")]
    TooManyAttempts {
        /// Field id.
        field: String,
        /// Number of attempts made.
        attempts: usize,
    },

    /// The template references a value no prompt provides.
    #[error("Template references undefined variable '{0}'")]
    UndefinedVariable(String),

    /// The template contains a malformed placeholder.
    #[error("Template syntax error: {0}")]
    Syntax(String),

    /// The destination exists and overwriting was not requested.
    #[error("{} already exists (use --overwrite to replace it)", .0.display())]
    AlreadyExists(PathBuf),

    /// The destination has not been written yet.
    #[error("{} is not configured", .0.display())]
    NotConfigured(PathBuf),

    /// Removing this path would delete the dotfiles repository.
    #[error("Refusing to remove {}: it contains the dotfiles repository", .0.display())]
    Protected(PathBuf),

    /// Reading input or writing the prompt failed.
    #[error("Prompt IO error: {0}")]
    Prompt(#[from] std::io::Error),

    /// Writing or removing the destination failed.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while persisting install state.
#[derive(Error, Debug)]
pub enum StateError {
    /// The state file could not be read or written.
    #[error("IO error on state file {}: {source}", .path.display())]
    Io {
        /// Path to the state file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The state file is not valid JSON.
    #[error("Invalid state file {}: {source}", .path.display())]
    Parse {
        /// Path to the state file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// State could not be serialized.
    #[error("Failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
}
