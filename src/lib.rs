//! Declarative dotfiles installer.
//!
//! A dotfiles repository describes itself in a `.dotstow.toml` manifest:
//! config groups linked into the home directory with GNU stow, packages to
//! install, third-party repositories to clone, and per-machine files rendered
//! from prompted values. Installs are recorded in a JSON state file so later
//! runs can update or undo them.
//!
//! The crate is organised in layers:
//!
//! - **[`config`]**: manifest discovery, parsing, and validation
//! - **[`platform`]**, **[`packages`]**, **[`deps`]**: host detection and package installation
//! - **[`stow`]**, **[`external`]**, **[`machine`]**: the per-item managers
//! - **[`state`]**: what has been installed
//! - **[`setup`]**: multi-phase install, update, and uninstall
//! - **[`doctor`]**: health checks
//! - **[`commands`]**: subcommand handlers behind the CLI
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod deps;
pub mod doctor;
pub mod error;
pub mod exec;
pub mod external;
pub mod git;
pub mod logging;
pub mod machine;
pub mod packages;
pub mod platform;
pub mod setup;
pub mod state;
pub mod stow;

#[cfg(test)]
pub mod test_helpers;
