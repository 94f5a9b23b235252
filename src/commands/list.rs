//! `list` command: declared groups and what is installed.
use anyhow::Result;

use super::App;
use crate::cli::ListOpts;
use crate::config::ConfigItem;
use crate::state::State;

/// List config groups with their install state.
///
/// # Errors
///
/// Never fails today; the signature matches the other handlers.
pub fn run(app: &App, opts: &ListOpts) -> Result<()> {
    let state = app.load_state();
    match &state {
        Some(s) => app.log.info(&format!(
            "installed {} (updated {})",
            s.installed_at.format("%Y-%m-%d %H:%M"),
            s.updated_at.format("%Y-%m-%d %H:%M")
        )),
        None => app.log.info("not installed"),
    }

    section(app, "Core", &app.manifest.configs.core, state.as_ref());
    section(app, "Optional", &app.manifest.configs.optional, state.as_ref());
    if opts.all {
        section(app, "Archived", &app.manifest.archived, None);
    }

    if let Some(s) = &state {
        if !s.externals.is_empty() {
            app.log.stage("External");
            for (id, ext) in &s.externals {
                app.log.info(&format!("✓ {id} -> {}", ext.path.display()));
            }
        }
        if !s.machine_configs.is_empty() {
            app.log.stage("Machine configs");
            for (id, machine) in &s.machine_configs {
                app.log
                    .info(&format!("✓ {id} -> {}", machine.destination.display()));
            }
        }
    }
    Ok(())
}

fn section(app: &App, title: &str, items: &[ConfigItem], state: Option<&State>) {
    if items.is_empty() {
        return;
    }
    app.log.stage(title);
    for item in items {
        let marker = if state.is_some_and(|s| s.has_config(&item.name)) {
            "✓"
        } else {
            "·"
        };
        let mut line = format!("{marker} {}", item.name);
        if !item.description.is_empty() {
            line.push_str(&format!(" - {}", item.description));
        }
        if !item.platforms.is_empty() {
            line.push_str(&format!(" [{}]", item.platforms.join(", ")));
        }
        app.log.info(&line);
    }
}
