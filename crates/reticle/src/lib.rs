//! Reticle - demo CLI for reticle-core
//!
//! Three command groups (`base`, `greet`, `system`) wired into one binary.
//! With arguments it runs a single command; without, an interactive shell.

pub mod cli;
pub mod commands;

pub use cli::{build_cli, default_config, exit_code, format_error, run};
