//! Command groups of the reticle binary
//!
//! Each file under `commands/` is one group. `base` holds the top-level
//! commands; every other file becomes `reticle <group> <command>`.

use std::path::PathBuf;

use reticle_core::ModuleCatalog;

pub mod base;
pub mod greet;
pub mod system;

/// Package the groups live in, relative to [`source_root`].
pub const PACKAGE: &str = "commands";

/// Every compiled-in group, keyed by its module id.
pub fn catalog() -> ModuleCatalog {
    ModuleCatalog::new()
        .with(format!("{PACKAGE}.base"), base::Base)
        .with(format!("{PACKAGE}.greet"), greet::Greet)
        .with(format!("{PACKAGE}.system"), system::System)
}

/// Source directory holding the `commands` package, for directory discovery.
pub fn source_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src")
}
