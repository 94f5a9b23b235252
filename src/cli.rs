//! Command-line definitions.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "dotstow",
    about = "Declarative dotfiles installer built on GNU stow",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Dotfiles root directory (containing .dotstow.toml)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Manifest file to use instead of discovering one
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// State file location (default: $XDG_CONFIG_HOME/dotstow/state.json)
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install dependencies, configs, external assets, and machine configs
    Install(InstallOpts),
    /// Pull the dotfiles repository and restow installed configs
    Update(UpdateOpts),
    /// Unstow configs and remove installed state
    Uninstall(UninstallOpts),
    /// List declared configs and their state
    #[command(visible_alias = "status")]
    List(ListOpts),
    /// Show the detected platform
    Detect,
    /// Check tools, dependencies, and recorded state
    Doctor,
    /// Work with the manifest file
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Check or install dependencies
    #[command(subcommand)]
    Deps(DepsCommand),
    /// Manage external assets
    #[command(subcommand)]
    External(ExternalCommand),
    /// Manage machine-specific configs
    #[command(subcommand)]
    Machine(MachineCommand),
    /// Stow, unstow, or restow individual config groups
    #[command(subcommand)]
    Stow(StowCommand),
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
    /// Print version information
    Version,
}

/// Options for the `install` subcommand.
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstallOpts {
    /// Never prompt; use defaults for every machine config field
    #[arg(long)]
    pub auto: bool,

    /// Install only core configs
    #[arg(long)]
    pub minimal: bool,

    /// Skip dependency installation
    #[arg(long)]
    pub skip_deps: bool,

    /// Skip stowing configs
    #[arg(long)]
    pub skip_stow: bool,

    /// Skip external assets
    #[arg(long)]
    pub skip_external: bool,

    /// Skip machine configs
    #[arg(long)]
    pub skip_machine: bool,

    /// Overwrite existing machine configs
    #[arg(long)]
    pub overwrite: bool,

    /// Adopt conflicting files into the repository when stowing
    #[arg(long)]
    pub force: bool,
}

/// Options for the `update` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct UpdateOpts {
    /// Also update external assets
    #[arg(long)]
    pub external: bool,

    /// Do not restow configs after pulling
    #[arg(long)]
    pub skip_restow: bool,
}

/// Options for the `uninstall` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct UninstallOpts {
    /// Also delete external assets
    #[arg(long)]
    pub remove_external: bool,

    /// Also delete generated machine configs
    #[arg(long)]
    pub remove_machine: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub force: bool,
}

/// Options for the `list` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ListOpts {
    /// Include archived configs
    #[arg(short, long)]
    pub all: bool,
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Load and validate a manifest, then print a summary
    Validate {
        /// Manifest file or directory containing one (default: discovered)
        path: Option<PathBuf>,
    },
}

/// `deps` subcommands.
#[derive(Subcommand, Debug)]
pub enum DepsCommand {
    /// Report which dependencies are installed
    Check,
    /// Install missing dependencies
    Install {
        /// Reinstall dependencies that are already present
        #[arg(long)]
        all: bool,
    },
}

/// `external` subcommands.
#[derive(Subcommand, Debug)]
pub enum ExternalCommand {
    /// Show the state of every external asset
    Status,
    /// Clone one asset, or every applicable asset
    Clone {
        /// Asset id
        id: Option<String>,
    },
    /// Pull one asset, or every applicable asset
    Update {
        /// Asset id
        id: Option<String>,
    },
    /// Delete an asset
    Remove {
        /// Asset id
        id: String,
    },
}

/// `machine` subcommands.
#[derive(Subcommand, Debug)]
pub enum MachineCommand {
    /// Show which machine configs are written
    Status,
    /// Prompt for values and write one or all machine configs
    Configure {
        /// Machine config id
        id: Option<String>,
        /// Use defaults without prompting
        #[arg(long)]
        defaults: bool,
        /// Replace existing files
        #[arg(long)]
        overwrite: bool,
    },
    /// Render a machine config with its defaults without writing it
    Show {
        /// Machine config id
        id: String,
    },
    /// Delete a generated machine config
    Remove {
        /// Machine config id
        id: String,
    },
    /// Show facts about this machine
    Info,
}

/// `stow` subcommands.
#[derive(Subcommand, Debug)]
pub enum StowCommand {
    /// Stow one config group
    Add {
        /// Config name
        name: String,
    },
    /// Unstow one config group
    Remove {
        /// Config name
        name: String,
    },
    /// Restow one group, or every installed group
    Refresh {
        /// Config name
        name: Option<String>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::Path;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_flags() {
        let cli = Cli::parse_from([
            "dotstow",
            "install",
            "--auto",
            "--minimal",
            "--skip-deps",
            "--overwrite",
        ]);
        let Command::Install(opts) = cli.command else {
            panic!("expected install");
        };
        assert!(opts.auto && opts.minimal && opts.skip_deps && opts.overwrite);
        assert!(!opts.skip_stow && !opts.force);
    }

    #[test]
    fn parse_global_dry_run_short() {
        let cli = Cli::parse_from(["dotstow", "-d", "install"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["dotstow", "update", "--root", "/tmp/dots", "-v", "--external"]);
        assert!(cli.verbose);
        assert_eq!(cli.global.root, Some(PathBuf::from("/tmp/dots")));
        assert!(matches!(cli.command, Command::Update(UpdateOpts { external: true, .. })));
    }

    #[test]
    fn status_is_alias_of_list() {
        let cli = Cli::parse_from(["dotstow", "status", "--all"]);
        assert!(matches!(cli.command, Command::List(ListOpts { all: true })));
    }

    #[test]
    fn parse_nested_subcommands() {
        let cli = Cli::parse_from(["dotstow", "external", "remove", "tpm"]);
        assert!(matches!(cli.command, Command::External(ExternalCommand::Remove { ref id }) if id == "tpm"));

        let cli = Cli::parse_from(["dotstow", "machine", "configure", "git", "--defaults"]);
        assert!(matches!(
            cli.command,
            Command::Machine(MachineCommand::Configure { defaults: true, overwrite: false, .. })
        ));

        let cli = Cli::parse_from(["dotstow", "stow", "refresh"]);
        assert!(matches!(cli.command, Command::Stow(StowCommand::Refresh { name: None })));

        let cli = Cli::parse_from(["dotstow", "deps", "install", "--all"]);
        assert!(matches!(cli.command, Command::Deps(DepsCommand::Install { all: true })));
    }

    #[test]
    fn parse_config_validate_and_doctor() {
        let cli = Cli::parse_from(["dotstow", "config", "validate", "/tmp/dots"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { path: Some(ref p) }) if p == Path::new("/tmp/dots")
        ));

        let cli = Cli::parse_from(["dotstow", "config", "validate"]);
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Validate { path: None })));

        let cli = Cli::parse_from(["dotstow", "doctor"]);
        assert!(matches!(cli.command, Command::Doctor));
    }

    #[test]
    fn parse_completions_shell() {
        let cli = Cli::parse_from(["dotstow", "completions", "bash"]);
        assert!(matches!(cli.command, Command::Completions { shell: Shell::Bash }));
    }

    #[test]
    fn uninstall_force_short() {
        let cli = Cli::parse_from(["dotstow", "uninstall", "-f", "--remove-machine"]);
        let Command::Uninstall(opts) = cli.command else {
            panic!("expected uninstall");
        };
        assert!(opts.force && opts.remove_machine && !opts.remove_external);
    }
}
