//! Command groups and their one-time load.
//!
//! A group wraps one compiled-in [`GroupModule`]. Loading it runs the
//! module's registrations against a [`BuildContext`] scoped to the group,
//! then builds the group's clap parser. Loading happens once; attaching the
//! finished parser under a parent happens on every call that supplies one.

use std::{collections::BTreeMap, sync::Arc};

use clap::Command;
use strum::Display;

use crate::{
    error::{Error, Result},
    registry::{BuildContext, CommandEntry, ModuleId},
};

/// Name of the group that owns the root parser
pub const BASE_GROUP: &str = "base";

/// A module contributing commands to the CLI
///
/// `register` is called exactly once per group, during its load.
pub trait GroupModule: Send + Sync {
    /// Group description, shown as the group's help.
    fn doc(&self) -> &str;

    fn register(&self, ctx: &mut BuildContext<'_>) -> Result<()>;
}

/// Compiled-in group modules, addressable by module id
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<ModuleId, Arc<dyn GroupModule>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, id: impl Into<ModuleId>, module: impl GroupModule + 'static) -> Self {
        self.insert(id, module);
        self
    }

    pub fn insert(&mut self, id: impl Into<ModuleId>, module: impl GroupModule + 'static) {
        self.modules.insert(id.into(), Arc::new(module));
    }

    pub fn get(&self, id: &ModuleId) -> Option<Arc<dyn GroupModule>> {
        self.modules.get(id).cloned()
    }

    /// Registered module ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.modules.keys()).finish()
    }
}

/// Load progress of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

/// One discovered module and the parser it contributes
#[derive(Debug)]
pub struct CommandGroup {
    name: String,
    module: ModuleId,
    state: LoadState,
    is_base: bool,
    doc: Option<String>,
    parser: Option<Command>,
    commands: Vec<CommandEntry>,
    attached_to: Vec<String>,
}

impl CommandGroup {
    pub fn new(module: ModuleId) -> Self {
        Self {
            name: module.name().to_string(),
            module,
            state: LoadState::Unloaded,
            is_base: false,
            doc: None,
            parser: None,
            commands: Vec::new(),
            attached_to: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn module(&self) -> &ModuleId {
        &self.module
    }

    pub const fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Finished parser; `None` until loaded.
    pub const fn parser(&self) -> Option<&Command> {
        self.parser.as_ref()
    }

    /// Registered commands in registration order.
    pub fn commands(&self) -> &[CommandEntry] {
        &self.commands
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.iter().find(|entry| entry.name() == name)
    }

    /// Load the group and, when `parent` is given, attach its parser there.
    ///
    /// Without a parent the group is built as the root (base) parser.
    /// Returns the group's description.
    pub fn load(
        &mut self,
        catalog: &ModuleCatalog,
        parent: Option<&mut Command>,
    ) -> Result<Option<&str>> {
        match self.state {
            // Unreachable while `load` holds `&mut self`; kept as the state guard
            LoadState::Loading => return Err(Error::ReentrantLoad(self.module.clone())),
            LoadState::Unloaded => {
                self.state = LoadState::Loading;
                if let Err(err) = self.import(catalog, parent.is_none()) {
                    self.state = LoadState::Unloaded;
                    self.commands.clear();
                    return Err(err);
                }
                self.state = LoadState::Loaded;
            }
            LoadState::Loaded => {
                tracing::debug!(module = %self.module, "Group already loaded");
            }
        }

        if let Some(parent) = parent {
            self.attach(parent)?;
        }

        Ok(self.doc.as_deref())
    }

    fn import(&mut self, catalog: &ModuleCatalog, is_base: bool) -> Result<()> {
        let module = catalog
            .get(&self.module)
            .ok_or_else(|| Error::ModuleNotFound(self.module.clone()))?;

        tracing::debug!(module = %self.module, "Loading command group");
        let mut ctx = BuildContext::new(&self.module, &mut self.commands);
        module.register(&mut ctx)?;

        let doc = module.doc().trim();
        self.doc = (!doc.is_empty()).then(|| doc.to_string());
        self.is_base = is_base;
        self.parser = Some(self.build_parser());
        Ok(())
    }

    fn build_parser(&self) -> Command {
        let (heading, placeholder) = if self.is_base {
            ("base commands", "base_command")
        } else {
            ("commands", "command")
        };

        let mut cmd = Command::new(self.name.clone())
            .subcommand_required(true)
            .disable_help_subcommand(true)
            .subcommand_help_heading(heading)
            .subcommand_value_name(placeholder);
        if let Some(doc) = &self.doc {
            cmd = cmd.about(doc.clone());
        }

        self.commands
            .iter()
            .fold(cmd, |cmd, entry| cmd.subcommand(entry.parser()))
    }

    fn attach(&mut self, parent: &mut Command) -> Result<()> {
        let Some(parser) = &self.parser else {
            return Err(Error::ModuleNotFound(self.module.clone()));
        };
        let parent_name = parent.get_name().to_string();

        if parent.find_subcommand(&self.name).is_some() {
            if self.attached_to.contains(&parent_name) {
                tracing::debug!(group = %self.name, parent = %parent_name, "Group already attached");
                return Ok(());
            }
            return Err(Error::Conflict(format!(
                "group '{}' clashes with an existing '{parent_name}' command",
                self.name
            )));
        }

        tracing::debug!(group = %self.name, parent = %parent_name, "Attaching command group");
        *parent = std::mem::take(parent).subcommand(parser.clone());
        if !self.attached_to.contains(&parent_name) {
            self.attached_to.push(parent_name);
        }
        Ok(())
    }
}
