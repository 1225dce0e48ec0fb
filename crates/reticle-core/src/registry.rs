//! Command registry and the per-load build context.
//!
//! The [`Registry`] owns every [`CommandGroup`] a CLI has seen, keyed by
//! module id, so two references to the same module resolve to one group.
//! While a group loads, its module receives a [`BuildContext`] scoped to
//! that group; registrations go through it instead of through any shared
//! "current group" state.

use std::{collections::BTreeMap, fmt, sync::Arc};

use clap::Command;

use crate::{
    args::{ArgKind, ArgSpec, CommandSpec, Handler, HandlerResult, Invocation},
    error::{Error, Result},
    group::CommandGroup,
};

/// Dotted module identifier, e.g. `commands.greet`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `package.name`
    pub fn from_parts(package: &str, name: &str) -> Self {
        Self(format!("{package}.{name}"))
    }

    /// Last dotted segment; the group name.
    pub fn name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment; empty for a bare name.
    pub fn package(&self) -> &str {
        self.0.rsplit_once('.').map_or("", |(package, _)| package)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// All command groups known to a CLI
#[derive(Debug, Default)]
pub struct Registry {
    groups: BTreeMap<ModuleId, CommandGroup>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group for `id`, created on first reference.
    pub fn group_mut(&mut self, id: &ModuleId) -> &mut CommandGroup {
        self.groups
            .entry(id.clone())
            .or_insert_with(|| CommandGroup::new(id.clone()))
    }

    pub fn get(&self, id: &ModuleId) -> Option<&CommandGroup> {
        self.groups.get(id)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.groups.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &CommandGroup)> {
        self.groups.iter()
    }
}

/// A registered command: the sub-parser declaration plus its handler
#[derive(Clone)]
pub struct CommandEntry {
    name: String,
    about: Option<String>,
    handler: Handler,
    args: Vec<ArgSpec>,
}

impl CommandEntry {
    fn new(name: &str, handler: Handler) -> Self {
        Self {
            name: name.to_string(),
            about: None,
            handler,
            args: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Declared arguments in the order users see them.
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Build the clap sub-parser for this command.
    pub fn parser(&self) -> Command {
        let mut cmd = Command::new(self.name.clone()).disable_help_subcommand(true);
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        self.args.iter().fold(cmd, |cmd, arg| cmd.arg(arg.to_arg()))
    }

    fn invalid(&self, arg: &ArgSpec, reason: impl Into<String>) -> Error {
        Error::InvalidArgument {
            command: self.name.clone(),
            arg: arg.id().to_string(),
            reason: reason.into(),
        }
    }

    fn add_arg(&mut self, arg: ArgSpec) -> Result<()> {
        if let Some(existing) = self.args.iter().find(|a| a.id() == arg.id()) {
            // Same declaration seen again (group loaded twice): nothing to do
            if *existing == arg {
                return Ok(());
            }
            return Err(self.invalid(&arg, "declared twice with different settings"));
        }

        if arg.id().is_empty() {
            return Err(self.invalid(&arg, "argument id cannot be empty"));
        }
        if arg.id() == "help" || arg.short_name() == Some('h') || arg.long_name() == Some("help")
        {
            return Err(self.invalid(&arg, "-h/--help is reserved"));
        }
        if arg.kind() != ArgKind::Positional && arg.long_name().is_none() && arg.short_name().is_none()
        {
            return Err(self.invalid(&arg, "needs a long or short flag"));
        }
        if arg.kind() == ArgKind::Positional {
            let mut positionals = self.args.iter().filter(|a| a.kind() == ArgKind::Positional);
            if positionals.clone().any(|a| a.is_multiple()) {
                return Err(self.invalid(&arg, "follows a positional taking many values"));
            }
            if arg.is_required() && positionals.any(|a| !a.is_required()) {
                return Err(self.invalid(&arg, "required positional after an optional one"));
            }
        }
        if let Some(short) = arg.short_name() {
            if self.args.iter().any(|a| a.short_name() == Some(short)) {
                return Err(self.invalid(&arg, format!("-{short} is already taken")));
            }
        }
        if let Some(long) = arg.long_name() {
            if self.args.iter().any(|a| a.long_name() == Some(long)) {
                return Err(self.invalid(&arg, format!("--{long} is already taken")));
            }
        }

        self.args.push(arg);
        Ok(())
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("about", &self.about)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Registration surface handed to a group module during its load
pub struct BuildContext<'a> {
    module: &'a ModuleId,
    commands: &'a mut Vec<CommandEntry>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(module: &'a ModuleId, commands: &'a mut Vec<CommandEntry>) -> Self {
        Self { module, commands }
    }

    /// Module currently being loaded.
    pub const fn module(&self) -> &ModuleId {
        self.module
    }

    /// Register `name` with `handler` as its target.
    ///
    /// Idempotent per (module, name): a second registration keeps the
    /// first sub-parser and handler.
    pub fn register_command<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&mut Invocation<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.entry(name, || Arc::new(handler)).map(|_| ())
    }

    /// Attach `arg` to the command `name`, registering the command first if
    /// needed. Arguments appear in the order they are attached.
    pub fn register_argument<F>(&mut self, name: &str, handler: F, arg: ArgSpec) -> Result<()>
    where
        F: Fn(&mut Invocation<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.entry(name, || Arc::new(handler))?.add_arg(arg)
    }

    /// Set the help text of an already registered command.
    ///
    /// The first description wins, so reloading a group changes nothing.
    pub fn describe(&mut self, name: &str, about: impl Into<String>) -> Result<()> {
        let module = self.module;
        let entry = self
            .commands
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                Error::Conflict(format!("cannot describe unknown command '{name}' in {module}"))
            })?;
        if entry.about.is_none() {
            entry.about = Some(about.into());
        }
        Ok(())
    }

    /// Register a whole command declaration: the command, then each of its
    /// arguments in declared order.
    pub fn add(&mut self, spec: CommandSpec) -> Result<()> {
        let (name, about, handler, args) = spec.into_parts();
        let entry = self.entry(&name, || handler)?;
        if entry.about.is_none() {
            entry.about = about;
        }
        args.into_iter().try_for_each(|arg| entry.add_arg(arg))
    }

    fn entry(
        &mut self,
        name: &str,
        handler: impl FnOnce() -> Handler,
    ) -> Result<&mut CommandEntry> {
        validate_command_name(self.module, name)?;

        if let Some(index) = self.commands.iter().position(|c| c.name == name) {
            return Ok(&mut self.commands[index]);
        }

        tracing::debug!(module = %self.module, command = name, "Registering command");
        let index = self.commands.len();
        self.commands.push(CommandEntry::new(name, handler()));
        Ok(&mut self.commands[index])
    }
}

fn validate_command_name(module: &ModuleId, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && !name.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(Error::Conflict(format!(
            "invalid command name '{name}' in {module}"
        )))
    }
}
