//! Reticle-core - Nested subcommand CLIs assembled from command groups
//!
//! This crate provides:
//! - Discovery of command-group modules in a package
//! - Explicit registration of commands and arguments through a build context
//! - Lazy loading of groups into a two-level clap command tree
//! - Dispatch of one argument vector, or an interactive shell on empty input
//! - Privilege gating for commands that need super user rights

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod args;
pub mod config;
pub mod console;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod group;
pub mod privilege;
pub mod registry;
pub mod shell;

pub use args::{
    ArgKind, ArgSpec, ArgValue, CommandSpec, Handler, HandlerResult, Invocation, ParsedArgs,
};
pub use config::{load_config, load_config_from, CliConfig};
pub use console::{Capture, Console};
pub use discovery::{list_modules, Discovery};
pub use dispatcher::{Cli, Status};
pub use error::{CommandError, Error, Result};
pub use group::{CommandGroup, GroupModule, LoadState, ModuleCatalog, BASE_GROUP};
pub use privilege::{require_privilege, FixedPrivilege, PrivilegeCheck, ProcessPrivilege};
pub use registry::{BuildContext, CommandEntry, ModuleId, Registry};
