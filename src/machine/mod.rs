//! Machine configs: per-machine files rendered from prompted values.
pub mod prompts;
pub mod template;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub use prompts::{MAX_ATTEMPTS, PromptOptions, PromptResult, Prompter};

use crate::config::{MachinePrompt, Manifest};
use crate::context::Context;
use crate::error::TemplateError;
use crate::logging::{Outcome, Phase, ProgressEvent};

/// Options for [`render_and_write`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Replace an existing destination.
    pub overwrite: bool,
}

/// Outcome of [`render_and_write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// Machine config id.
    pub id: String,
    /// Expanded destination path.
    pub destination: PathBuf,
    /// Rendered content.
    pub content: String,
    /// False in dry-run mode.
    pub written: bool,
}

/// Whether a machine config's file exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// The destination file exists.
    Configured,
    /// Not written yet.
    Missing,
    /// Something other than a file is at the destination.
    Error,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configured => "configured",
            Self::Missing => "missing",
            Self::Error => "error",
        })
    }
}

/// Status report for one machine config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineStatus {
    /// Machine config id.
    pub id: String,
    /// Declared description.
    pub description: String,
    /// Expanded destination.
    pub destination: PathBuf,
    /// Its state.
    pub state: MachineState,
}

/// Render `prompt`'s template without writing anything.
///
/// # Errors
///
/// Returns a [`TemplateError`] when the template is malformed or references
/// a value not in `values`.
pub fn preview(prompt: &MachinePrompt, values: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    template::render(&prompt.template, values)
}

/// Render `prompt` and write it to its destination.
///
/// # Errors
///
/// Returns [`TemplateError::AlreadyExists`] when the destination exists and
/// `opts.overwrite` is false (the file is left untouched), or a render or
/// I/O error.
pub fn render_and_write(
    ctx: &Context,
    prompt: &MachinePrompt,
    values: &BTreeMap<String, String>,
    opts: RenderOptions,
) -> Result<RenderResult, TemplateError> {
    let destination = ctx.expand(&prompt.destination);
    if destination.exists() && !opts.overwrite {
        return Err(TemplateError::AlreadyExists(destination));
    }
    let content = preview(prompt, values)?;
    let event =
        |outcome: Outcome, msg: &str| ProgressEvent::new(Phase::Machine, outcome, msg).item(&prompt.id);

    if ctx.dry_run {
        ctx.progress(&event(
            Outcome::DryRun,
            &format!("would write {}", destination.display()),
        ));
        return Ok(RenderResult {
            id: prompt.id.clone(),
            destination,
            content,
            written: false,
        });
    }

    write_file(&destination, &content, prompt.has_secret()).map_err(|source| TemplateError::Io {
        path: destination.clone(),
        source,
    })?;
    ctx.progress(&event(
        Outcome::Done,
        &format!("wrote {}", destination.display()),
    ));
    Ok(RenderResult {
        id: prompt.id.clone(),
        destination,
        content,
        written: true,
    })
}

fn write_file(path: &Path, content: &str, secret: bool) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if secret { 0o600 } else { 0o644 };
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = secret;
    Ok(())
}

/// Delete a machine config's generated file and return its path.
///
/// # Errors
///
/// Returns [`TemplateError::NotConfigured`] when the file is absent,
/// [`TemplateError::Protected`] when the destination holds the dotfiles
/// repository, or an I/O error.
pub fn remove(ctx: &Context, prompt: &MachinePrompt) -> Result<PathBuf, TemplateError> {
    let destination = ctx.expand(&prompt.destination);
    if destination.symlink_metadata().is_err() {
        return Err(TemplateError::NotConfigured(destination));
    }
    if ctx.is_protected(&destination) {
        return Err(TemplateError::Protected(destination));
    }
    let event =
        |outcome: Outcome, msg: &str| ProgressEvent::new(Phase::Machine, outcome, msg).item(&prompt.id);
    if ctx.dry_run {
        ctx.progress(&event(
            Outcome::DryRun,
            &format!("would remove {}", destination.display()),
        ));
        return Ok(destination);
    }
    std::fs::remove_file(&destination).map_err(|source| TemplateError::Io {
        path: destination.clone(),
        source,
    })?;
    ctx.progress(&event(Outcome::Done, "removed"));
    Ok(destination)
}

/// Report whether each declared machine config has been written.
#[must_use]
pub fn check_status(ctx: &Context, manifest: &Manifest) -> Vec<MachineStatus> {
    manifest
        .machine_config
        .iter()
        .map(|prompt| {
            let destination = ctx.expand(&prompt.destination);
            let state = if destination.is_file() {
                MachineState::Configured
            } else if destination.exists() {
                MachineState::Error
            } else {
                MachineState::Missing
            };
            MachineStatus {
                id: prompt.id.clone(),
                description: prompt.description.clone(),
                destination,
                state,
            }
        })
        .collect()
}

/// Facts about the current machine shown by `machine info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    /// Login name.
    pub username: String,
    /// Host name.
    pub hostname: String,
    /// Home directory.
    pub home: PathBuf,
    /// Global git `user.name`, if set.
    pub git_name: Option<String>,
    /// Global git `user.email`, if set.
    pub git_email: Option<String>,
    /// Whether the SSH agent holds keys.
    pub ssh_keys: bool,
    /// Whether GPG has secret keys.
    pub gpg_keys: bool,
}

/// Gather [`SystemInfo`]; probes that fail leave their field empty.
#[must_use]
pub fn system_info(ctx: &Context) -> SystemInfo {
    let output = |program: &str, args: &[&str]| -> Option<String> {
        if !ctx.executor.which(program) {
            return None;
        }
        ctx.executor
            .run_unchecked(program, args)
            .ok()
            .filter(|r| r.success)
            .map(|r| r.stdout.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();
    let hostname = output("hostname", &[])
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_default();

    SystemInfo {
        username,
        hostname,
        home: ctx.home.clone(),
        git_name: output("git", &["config", "--global", "user.name"]),
        git_email: output("git", &["config", "--global", "user.email"]),
        ssh_keys: output("ssh-add", &["-l"]).is_some(),
        gpg_keys: output("gpg", &["--list-secret-keys"]).is_some(),
    }
}
