//! The CLI dispatcher
//!
//! Construction discovers the command groups, loads `base` as the root
//! parser and attaches every other group under it. [`Cli::dispatch`] then
//! parses one argument vector against that tree and calls the resolved
//! handler with the parsed values.

use std::{collections::BTreeMap, io::Write};

use clap::{error::ErrorKind, Command};
use tokio::io::AsyncBufRead;

use crate::{
    args::{Invocation, ParsedArgs},
    config::CliConfig,
    console::Console,
    error::{CommandError, Error, Result},
    group::{CommandGroup, ModuleCatalog, BASE_GROUP},
    privilege::{PrivilegeCheck, ProcessPrivilege},
    registry::{ModuleId, Registry},
};

/// Result of one `run`/`dispatch` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Handler ran to completion
    Completed,
    /// Empty input while already interactive
    Idle,
    /// Help was requested and printed
    Help,
    /// Parse failure, reported on stderr
    UsageError,
    /// Handler failed recoverably, reported as `ERROR: ...`
    Reported,
    /// Handler or shell asked to end the process with this status
    Exit(i32),
}

impl Status {
    /// Process exit code for a one-shot invocation ending in this status.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Completed | Self::Idle | Self::Help | Self::Reported => 0,
            Self::UsageError => 2,
            Self::Exit(code) => code,
        }
    }
}

/// Assembled command tree plus the state needed to run it
pub struct Cli {
    pub(crate) config: CliConfig,
    registry: Registry,
    base: ModuleId,
    groups: BTreeMap<String, ModuleId>,
    root: Command,
    pub(crate) console: Console,
    privilege: Box<dyn PrivilegeCheck>,
    pub(crate) shell_input: Option<Box<dyn AsyncBufRead + Unpin + Send>>,
    pub(crate) interactive: bool,
}

impl Cli {
    /// Build a CLI with a fresh registry.
    pub fn new(config: CliConfig, catalog: &ModuleCatalog) -> Result<Self> {
        Self::with_registry(config, catalog, Registry::new())
    }

    /// Build a CLI on top of `registry`, reusing any groups already loaded
    /// into it.
    pub fn with_registry(
        config: CliConfig,
        catalog: &ModuleCatalog,
        mut registry: Registry,
    ) -> Result<Self> {
        config.validate()?;
        let discovery = config.discovery();
        let ids = discovery.discover(catalog)?;

        let mut base = None;
        let mut groups = BTreeMap::new();
        for id in ids {
            registry.group_mut(&id);
            if id.name() == BASE_GROUP {
                base = Some(id);
            } else {
                groups.insert(id.name().to_string(), id);
            }
        }

        let base = base.ok_or_else(|| Error::MissingBase {
            package: discovery.package().to_string(),
        })?;

        let base_group = registry.group_mut(&base);
        base_group.load(catalog, None)?;
        let mut root = base_group
            .parser()
            .cloned()
            .ok_or_else(|| Error::ModuleNotFound(base.clone()))?
            .name(config.name.clone())
            .bin_name(config.name.clone());

        for id in groups.values() {
            registry.group_mut(id).load(catalog, Some(&mut root))?;
        }
        root.build();

        tracing::debug!(
            groups = groups.len() + 1,
            package = discovery.package(),
            "Command tree assembled"
        );

        Ok(Self {
            config,
            registry,
            base,
            groups,
            root,
            console: Console::stdio(),
            privilege: Box::new(ProcessPrivilege),
            shell_input: None,
            interactive: false,
        })
    }

    #[must_use]
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    #[must_use]
    pub fn with_privilege(mut self, privilege: impl PrivilegeCheck + 'static) -> Self {
        self.privilege = Box::new(privilege);
        self
    }

    /// Read interactive input from `input` instead of stdin.
    #[must_use]
    pub fn with_shell_input(mut self, input: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        self.shell_input = Some(Box::new(input));
        self
    }

    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Hand the registry back, e.g. to build another CLI from it.
    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Names of the non-base groups, sorted.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Loaded group by name; `base` resolves to the root group.
    pub fn group(&self, name: &str) -> Option<&CommandGroup> {
        let id = if name == BASE_GROUP {
            &self.base
        } else {
            self.groups.get(name)?
        };
        self.registry.get(id)
    }

    pub fn base(&self) -> &ModuleId {
        &self.base
    }

    pub const fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn root(&self) -> &Command {
        &self.root
    }

    /// Top-level help text.
    pub fn render_help(&mut self) -> String {
        self.root.render_help().to_string()
    }

    /// Run one invocation; empty `args` starts the interactive shell.
    pub async fn run(&mut self, args: &[String]) -> Result<Status> {
        if args.is_empty() {
            if self.interactive {
                return Ok(Status::Idle);
            }
            return self.interactive().await;
        }
        let status = self.dispatch(args);
        self.console.flush()?;
        status
    }

    /// Parse `args` and invoke the resolved handler.
    pub fn dispatch(&mut self, args: &[String]) -> Result<Status> {
        if args.is_empty() && self.interactive {
            return Ok(Status::Idle);
        }

        if self.config.change_dir {
            if let Some(dir) = &self.config.directory {
                std::env::set_current_dir(dir)?;
            }
        }

        let argv = std::iter::once(self.config.name.clone()).chain(args.iter().cloned());
        let matches = match self.root.try_get_matches_from_mut(argv) {
            Ok(matches) => matches,
            Err(err) => return self.report_parse_error(&err, args),
        };

        let Some((first, first_matches)) = matches.subcommand() else {
            return self.report_missing_command(args);
        };
        let (module, group, command, command_matches) = match self.groups.get(first) {
            Some(module) => {
                let Some((command, command_matches)) = first_matches.subcommand() else {
                    return self.report_missing_command(args);
                };
                (module, first, command, command_matches)
            }
            None => (&self.base, BASE_GROUP, first, first_matches),
        };

        let entry = self
            .registry
            .get(module)
            .and_then(|g| g.command(command))
            .ok_or_else(|| Error::Conflict(format!("no handler for '{group} {command}'")))?;
        let handler = entry.handler().clone();
        let parsed = ParsedArgs::from_matches(entry.args(), command_matches);

        tracing::debug!(group, command, args = parsed.len(), "Dispatching command");
        let result = {
            let mut invocation = Invocation::new(
                group,
                command,
                parsed,
                &mut self.console,
                self.privilege.as_ref(),
            );
            handler(&mut invocation)
        };

        match result {
            Ok(()) => Ok(Status::Completed),
            Err(err @ (CommandError::Recoverable(_) | CommandError::PermissionDenied)) => {
                writeln!(self.console.out(), "ERROR: {err}")?;
                Ok(Status::Reported)
            }
            Err(CommandError::Exit(code)) => {
                tracing::debug!(group, command, code, "Command requested exit");
                Ok(Status::Exit(code))
            }
            Err(CommandError::Failed(source)) => Err(Error::Handler {
                command: qualified_name(group, command),
                source,
            }),
        }
    }

    fn report_parse_error(&mut self, err: &clap::Error, args: &[String]) -> Result<Status> {
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                write!(self.console.out(), "{}", err.render())?;
                Ok(Status::Help)
            }
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                write!(self.console.err(), "{}", err.render())?;
                Ok(Status::UsageError)
            }
            _ => {
                let help = help_at(&mut self.root, args);
                write!(self.console.err(), "{}", err.render())?;
                writeln!(self.console.err())?;
                write!(self.console.err(), "{help}")?;
                Ok(Status::UsageError)
            }
        }
    }

    fn report_missing_command(&mut self, args: &[String]) -> Result<Status> {
        let help = help_at(&mut self.root, args);
        writeln!(self.console.err(), "error: a command is required")?;
        write!(self.console.err(), "{help}")?;
        Ok(Status::UsageError)
    }
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli")
            .field("config", &self.config)
            .field("base", &self.base)
            .field("groups", &self.groups)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

fn qualified_name(group: &str, command: &str) -> String {
    if group == BASE_GROUP {
        command.to_string()
    } else {
        format!("{group} {command}")
    }
}

/// Help of the deepest parser that `args` reaches by subcommand name.
fn help_at(cmd: &mut Command, args: &[String]) -> String {
    if let Some((head, rest)) = args.split_first() {
        if let Some(sub) = cmd.find_subcommand_mut(head) {
            return help_at(sub, rest);
        }
    }
    cmd.render_help().to_string()
}
