//! `machine` command: generated per-machine config files.
use std::collections::BTreeMap;

use anyhow::Result;

use super::App;
use crate::cli::MachineCommand;
use crate::config::{MachinePrompt, PromptKind};
use crate::error::TemplateError;
use crate::logging::Phase;
use crate::machine::{self, MachineState, PromptOptions, Prompter, RenderOptions, RenderResult};
use crate::setup::phase_status;

/// Run a `machine` subcommand.
///
/// # Errors
///
/// Returns an error for an unknown id, a render or write failure, or when
/// any machine config could not be configured.
pub fn run(app: &App, cmd: &MachineCommand, prompter: &mut Prompter<'_>) -> Result<()> {
    match cmd {
        MachineCommand::Status => {
            status(app);
            Ok(())
        }
        MachineCommand::Configure {
            id,
            defaults,
            overwrite,
        } => configure(app, prompter, id.as_deref(), *defaults, *overwrite),
        MachineCommand::Show { id } => show(app, id),
        MachineCommand::Remove { id } => remove(app, id),
        MachineCommand::Info => {
            info(app);
            Ok(())
        }
    }
}

fn status(app: &App) {
    let statuses = machine::check_status(&app.ctx, &app.manifest);
    if statuses.is_empty() {
        app.log.info("no machine configs declared");
        return;
    }
    app.log.stage("Machine configs");
    for status in &statuses {
        let marker = match status.state {
            MachineState::Configured => "✓",
            MachineState::Missing => "·",
            MachineState::Error => "✗",
        };
        app.log.info(&format!(
            "{marker} {} ({}) -> {}",
            status.id,
            status.state,
            status.destination.display()
        ));
    }
}

fn configure(
    app: &App,
    prompter: &mut Prompter<'_>,
    id: Option<&str>,
    defaults: bool,
    overwrite: bool,
) -> Result<()> {
    let prompt_opts = PromptOptions {
        skip_prompts: defaults,
    };
    let render_opts = RenderOptions { overwrite };

    if let Some(id) = id {
        let prompt = app
            .manifest
            .machine(id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        if !overwrite && app.ctx.expand(&prompt.destination).exists() {
            return Err(TemplateError::AlreadyExists(app.ctx.expand(&prompt.destination)).into());
        }
        let collected = prompter.collect(prompt, prompt_opts)?;
        let rendered = machine::render_and_write(&app.ctx, prompt, &collected.values, render_opts)?;
        return record(app, &[rendered]);
    }

    app.log.stage(Phase::Machine.title());
    let mut written = Vec::new();
    let mut failed = 0;
    for prompt in &app.manifest.machine_config {
        if !overwrite && app.ctx.expand(&prompt.destination).exists() {
            app.log.info(&format!("{}: already configured", prompt.id));
            continue;
        }
        let result = prompter
            .collect(prompt, prompt_opts)
            .and_then(|c| machine::render_and_write(&app.ctx, prompt, &c.values, render_opts));
        match result {
            Ok(rendered) => written.push(rendered),
            Err(e) => {
                app.log.error(&format!("machine '{}': {e}", prompt.id));
                failed += 1;
            }
        }
    }
    let status = phase_status(&app.ctx, failed);
    app.log.record_phase(
        Phase::Machine,
        status,
        Some(&format!("{} configured", written.len())),
    );
    record(app, &written)?;
    app.finish(failed)
}

fn record(app: &App, rendered: &[RenderResult]) -> Result<()> {
    let written: Vec<&RenderResult> = rendered.iter().filter(|r| r.written).collect();
    if written.is_empty() {
        return Ok(());
    }
    let mut state = app.state_or_new();
    for r in written {
        app.log
            .info(&format!("{}: wrote {}", r.id, r.destination.display()));
        state.set_machine_config(&r.id, &r.destination);
    }
    state.touch();
    app.save_state(&state)
}

/// Values used by `machine show`: every field's default, with confirm
/// defaults normalized and missing defaults left empty.
fn default_values(prompt: &MachinePrompt) -> BTreeMap<String, String> {
    prompt
        .prompts
        .iter()
        .map(|field| {
            let value = if field.kind == PromptKind::Confirm && !field.default.is_empty() {
                machine::prompts::normalize_confirm(&field.default).to_string()
            } else {
                field.default.clone()
            };
            (field.id.clone(), value)
        })
        .collect()
}

#[allow(clippy::print_stdout)]
fn show(app: &App, id: &str) -> Result<()> {
    let prompt = app
        .manifest
        .machine(id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
    let content = machine::preview(prompt, &default_values(prompt))?;
    app.log.info(&format!(
        "{} -> {}",
        prompt.id,
        app.ctx.expand(&prompt.destination).display()
    ));
    println!("{content}");
    Ok(())
}

fn remove(app: &App, id: &str) -> Result<()> {
    let prompt = app
        .manifest
        .machine(id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
    let path = machine::remove(&app.ctx, prompt)?;
    if app.ctx.dry_run {
        return Ok(());
    }
    app.log.info(&format!("removed {}", path.display()));
    if let Some(mut state) = app.load_state()
        && state.remove_machine_config(id)
    {
        state.touch();
        app.save_state(&state)?;
    }
    Ok(())
}

fn info(app: &App) {
    let info = machine::system_info(&app.ctx);
    let or_unknown = |value: Option<&str>| value.unwrap_or("not set").to_string();
    app.log.stage("System");
    app.log.info(&format!("user:      {}", info.username));
    app.log.info(&format!("hostname:  {}", info.hostname));
    app.log.info(&format!("home:      {}", info.home.display()));
    app.log
        .info(&format!("git name:  {}", or_unknown(info.git_name.as_deref())));
    app.log
        .info(&format!("git email: {}", or_unknown(info.git_email.as_deref())));
    app.log.info(&format!("ssh keys:  {}", yes_no(info.ssh_keys)));
    app.log.info(&format!("gpg keys:  {}", yes_no(info.gpg_keys)));
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
