//! `detect` command.
use anyhow::Result;

use super::App;

/// Print the detected platform.
///
/// # Errors
///
/// Returns an error if the platform cannot be detected.
pub fn run(app: &App) -> Result<()> {
    let platform = app.detect_platform()?;
    app.log.stage("Platform");
    app.log.info(&format!("os:              {}", platform.os));
    app.log.info(&format!("distro:          {}", or_none(&platform.distro)));
    app.log
        .info(&format!("version:         {}", or_none(&platform.distro_version)));
    app.log.info(&format!(
        "package manager: {}",
        or_none(&platform.package_manager)
    ));
    app.log
        .info(&format!("architecture:    {}", or_none(&platform.architecture)));
    app.log.info(&format!("wsl:             {}", platform.is_wsl));
    Ok(())
}

fn or_none(value: &str) -> &str {
    if value.is_empty() { "none" } else { value }
}
