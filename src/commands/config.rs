//! `config` command: check a manifest without touching the machine.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::{ConfigCommand, GlobalOpts};
use crate::config::{self, Manifest};
use crate::context;
use crate::logging::Log;

/// Run a `config` subcommand.
///
/// # Errors
///
/// Returns an error when no manifest is found or it fails to load.
pub fn run(global: &GlobalOpts, cmd: &ConfigCommand, log: &dyn Log) -> Result<()> {
    match cmd {
        ConfigCommand::Validate { path } => {
            let home = context::home_dir()?;
            let cwd = std::env::current_dir().context("reading current directory")?;
            let env_root = std::env::var_os(config::ROOT_ENV).map(PathBuf::from);
            let explicit = path
                .as_deref()
                .or(global.manifest.as_deref())
                .or(global.root.as_deref());
            let manifest_path = config::discover(explicit, env_root.as_deref(), &cwd, &home)?;
            validate(log, &manifest_path).map(|_| ())
        }
    }
}

/// Load the manifest at `path`, run validation, and report a summary.
///
/// Warnings are reported but never fail validation.
///
/// # Errors
///
/// Returns the [`ManifestError`](crate::error::ManifestError) when the file
/// cannot be read, parsed, or validated.
pub fn validate(log: &dyn Log, path: &Path) -> Result<Manifest> {
    log.stage("Validating manifest");
    log.info(&format!("loaded manifest from {}", path.display()));
    let manifest = match Manifest::load(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            log.error(&format!("validation failed: {e}"));
            return Err(e.into());
        }
    };

    let deps = &manifest.dependencies;
    log.info("✓ manifest is valid");
    log.info(&format!("  schema version: {}", manifest.schema_version));
    log.info(&format!("  name: {}", manifest.display_name()));
    log.info(&format!(
        "  configs: {} core, {} optional, {} archived",
        manifest.configs.core.len(),
        manifest.configs.optional.len(),
        manifest.archived.len()
    ));
    log.info(&format!(
        "  dependencies: {} total",
        deps.critical.len() + deps.core.len() + deps.optional.len()
    ));
    log.info(&format!("  external assets: {}", manifest.external.len()));
    log.info(&format!("  machine configs: {}", manifest.machine_config.len()));

    let warnings = manifest.warnings();
    for warning in &warnings {
        log.warn(&warning.to_string());
    }
    if !warnings.is_empty() {
        log.warn(&format!("{} warning(s)", warnings.len()));
    }
    Ok(manifest)
}
