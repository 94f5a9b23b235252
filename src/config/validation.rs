//! Manifest validation.
//!
//! [`check`] rejects manifests that cannot be acted on; [`warnings`] reports
//! suspicious but usable entries.
use std::collections::HashSet;

use super::{Manifest, SUPPORTED_SCHEMA_MAJOR};
use crate::error::ManifestError;
use crate::machine::template;

/// Condition keys understood by external asset matching.
pub const CONDITION_KEYS: &[&str] = &[
    "platform",
    "os",
    "distro",
    "package_manager",
    "wsl",
    "arch",
    "architecture",
];

/// A non-fatal issue found in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Manifest section (e.g., "configs", "external").
    pub section: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        section: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}': {}", self.section, self.item, self.message)
    }
}

/// Reject manifests that cannot be acted on.
///
/// # Errors
///
/// Returns [`ManifestError::UnsupportedSchema`] for a foreign schema major, or
/// [`ManifestError::Invalid`] listing every structural problem found.
pub fn check(manifest: &Manifest) -> Result<(), ManifestError> {
    let major = manifest
        .schema_version
        .split('.')
        .next()
        .unwrap_or_default()
        .trim();
    if major != SUPPORTED_SCHEMA_MAJOR {
        return Err(ManifestError::UnsupportedSchema(
            manifest.schema_version.clone(),
        ));
    }

    let mut problems = Vec::new();

    let mut names = HashSet::new();
    for item in manifest.all_configs().chain(&manifest.archived) {
        if item.name.trim().is_empty() {
            problems.push("config with empty name".to_string());
        } else if !names.insert(item.name.as_str()) {
            problems.push(format!("duplicate config '{}'", item.name));
        }
    }

    let deps = &manifest.dependencies;
    for item in deps.critical.iter().chain(&deps.core).chain(&deps.optional) {
        if item.name.trim().is_empty() {
            problems.push("dependency with empty name".to_string());
        }
    }

    let mut ids = HashSet::new();
    for ext in &manifest.external {
        if ext.id.trim().is_empty() {
            problems.push("external dependency with empty id".to_string());
            continue;
        }
        if !ids.insert(ext.id.as_str()) {
            problems.push(format!("duplicate external '{}'", ext.id));
        }
        if ext.url.trim().is_empty() {
            problems.push(format!("external '{}' has empty url", ext.id));
        }
        if ext.destination.trim().is_empty() {
            problems.push(format!("external '{}' has empty destination", ext.id));
        }
    }

    let mut ids = HashSet::new();
    for mc in &manifest.machine_config {
        if mc.id.trim().is_empty() {
            problems.push("machine config with empty id".to_string());
            continue;
        }
        if !ids.insert(mc.id.as_str()) {
            problems.push(format!("duplicate machine config '{}'", mc.id));
        }
        if mc.destination.trim().is_empty() {
            problems.push(format!("machine config '{}' has empty destination", mc.id));
        }
        let mut fields = HashSet::new();
        for field in &mc.prompts {
            if field.id.trim().is_empty() {
                problems.push(format!("machine config '{}' has a prompt with empty id", mc.id));
            } else if !fields.insert(field.id.as_str()) {
                problems.push(format!(
                    "machine config '{}' has duplicate prompt '{}'",
                    mc.id, field.id
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ManifestError::Invalid(problems))
    }
}

/// Collect non-fatal findings.
#[must_use]
pub fn warnings(manifest: &Manifest) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for item in manifest.all_configs() {
        if item.path.is_empty() {
            warnings.push(ValidationWarning::new(
                "configs",
                &item.name,
                "no path given, using the name",
            ));
        }
    }

    for ext in &manifest.external {
        for key in ext.condition.keys() {
            if !CONDITION_KEYS.contains(&key.as_str()) {
                warnings.push(ValidationWarning::new(
                    "external",
                    &ext.id,
                    format!("unknown condition key '{key}' is ignored"),
                ));
            }
        }
        if !matches!(ext.method.as_str(), "" | "clone" | "copy") {
            warnings.push(ValidationWarning::new(
                "external",
                &ext.id,
                format!("unknown method '{}'", ext.method),
            ));
        }
    }

    for mc in &manifest.machine_config {
        for field in &mc.prompts {
            if field.kind == super::PromptKind::Select && field.options.is_empty() {
                warnings.push(ValidationWarning::new(
                    "machine_config",
                    &mc.id,
                    format!("select prompt '{}' has no options", field.id),
                ));
            }
        }
        match template::placeholders(&mc.template) {
            Ok(names) => {
                for name in names {
                    if !mc.prompts.iter().any(|p| p.id == name) {
                        warnings.push(ValidationWarning::new(
                            "machine_config",
                            &mc.id,
                            format!("template uses '{name}' but no prompt provides it"),
                        ));
                    }
                }
            }
            Err(e) => warnings.push(ValidationWarning::new("machine_config", &mc.id, e.to_string())),
        }
    }

    warnings
}
