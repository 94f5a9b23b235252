//! `dotstow` binary entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use dotstow::cli::{Cli, Command};
use dotstow::commands::{self, App};
use dotstow::logging::{Logger, init_subscriber};
use dotstow::machine::Prompter;

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    match &args.command {
        Command::Version => {
            commands::version::run();
            return Ok(());
        }
        Command::Completions { shell } => {
            commands::version::completions(*shell);
            return Ok(());
        }
        _ => {}
    }

    let name = command_name(&args.command);
    init_subscriber(args.verbose, name);
    let log = Arc::new(Logger::new(name));
    if let Command::Config(cmd) = &args.command {
        return commands::config::run(&args.global, cmd, &*log);
    }
    let mut app = App::init(&args.global, log)?;
    let mut prompter = Prompter::stdio();

    match &args.command {
        Command::Install(opts) => commands::install::run(&app, opts, &mut prompter),
        Command::Update(opts) => commands::update::run(&mut app, opts),
        Command::Uninstall(opts) => commands::uninstall::run(&app, opts, &mut prompter),
        Command::List(opts) => commands::list::run(&app, opts),
        Command::Detect => commands::detect::run(&app),
        Command::Doctor => commands::doctor::run(&app),
        Command::Deps(cmd) => commands::deps::run(&app, cmd),
        Command::External(cmd) => commands::external::run(&app, cmd),
        Command::Machine(cmd) => commands::machine::run(&app, cmd, &mut prompter),
        Command::Stow(cmd) => commands::stow::run(&app, cmd),
        Command::Config(_) | Command::Version | Command::Completions { .. } => Ok(()),
    }
}

/// Log file stem for a subcommand.
const fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Install(_) => "install",
        Command::Update(_) => "update",
        Command::Uninstall(_) => "uninstall",
        Command::List(_) => "list",
        Command::Detect => "detect",
        Command::Doctor => "doctor",
        Command::Config(_) => "config",
        Command::Deps(_) => "deps",
        Command::External(_) => "external",
        Command::Machine(_) => "machine",
        Command::Stow(_) => "stow",
        Command::Completions { .. } => "completions",
        Command::Version => "version",
    }
}
