//! Argument declarations, parsed invocations and handler types.
//!
//! A command is declared once with [`CommandSpec`], carrying its flags as an
//! ordered list of [`ArgSpec`]. The dispatcher turns each declaration into a
//! clap parser and, after a successful parse, hands the handler a
//! [`ParsedArgs`] keyed by the declared names.

use std::{collections::BTreeMap, io::Write, sync::Arc};

use clap::{builder::PossibleValuesParser, Arg, ArgAction, ArgMatches};
use strum::{Display, EnumString};

use crate::{console::Console, error::CommandError, privilege::PrivilegeCheck};

/// Outcome of a handler call
pub type HandlerResult = std::result::Result<(), CommandError>;

/// Shared, type-erased handler
pub type Handler = Arc<dyn Fn(&mut Invocation<'_>) -> HandlerResult + Send + Sync>;

/// How an argument is written on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ArgKind {
    /// `<value>` by position
    Positional,
    /// `--name <value>`
    Option,
    /// `--name`, no value
    Flag,
}

/// One flag or positional of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    id: String,
    kind: ArgKind,
    short: Option<char>,
    long: Option<String>,
    help: Option<String>,
    value_name: Option<String>,
    required: bool,
    default_value: Option<String>,
    multiple: bool,
    choices: Vec<String>,
}

impl ArgSpec {
    fn with_kind(id: impl Into<String>, kind: ArgKind) -> Self {
        let id = id.into();
        let long = match kind {
            ArgKind::Positional => None,
            ArgKind::Option | ArgKind::Flag => Some(id.replace('_', "-")),
        };
        Self {
            id,
            kind,
            short: None,
            long,
            help: None,
            value_name: None,
            required: kind == ArgKind::Positional,
            default_value: None,
            multiple: false,
            choices: Vec::new(),
        }
    }

    /// Required positional argument.
    pub fn positional(id: impl Into<String>) -> Self {
        Self::with_kind(id, ArgKind::Positional)
    }

    /// `--id <value>`, optional unless marked [`required`](Self::required).
    pub fn option(id: impl Into<String>) -> Self {
        Self::with_kind(id, ArgKind::Option)
    }

    /// Boolean switch; absent means `false`.
    pub fn flag(id: impl Into<String>) -> Self {
        Self::with_kind(id, ArgKind::Flag)
    }

    /// Single-letter flag; positionals have none, so it is ignored there.
    pub const fn short(mut self, short: char) -> Self {
        if !matches!(self.kind, ArgKind::Positional) {
            self.short = Some(short);
        }
        self
    }

    pub fn long(mut self, long: impl Into<String>) -> Self {
        if self.kind != ArgKind::Positional {
            self.long = Some(long.into());
        }
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn value_name(mut self, name: impl Into<String>) -> Self {
        self.value_name = Some(name.into());
        self
    }

    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Accept the argument more than once (options) or one-or-more values
    /// (positionals).
    pub const fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn kind(&self) -> ArgKind {
        self.kind
    }

    pub const fn short_name(&self) -> Option<char> {
        self.short
    }

    pub fn long_name(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub const fn is_required(&self) -> bool {
        self.required
    }

    pub const fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Build the clap argument for this declaration.
    pub(crate) fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.id.clone());

        arg = match self.kind {
            ArgKind::Flag => arg.action(ArgAction::SetTrue),
            ArgKind::Positional if self.multiple => arg.action(ArgAction::Append).num_args(1..),
            ArgKind::Option if self.multiple => arg.action(ArgAction::Append).num_args(1),
            ArgKind::Positional | ArgKind::Option => arg.action(ArgAction::Set).num_args(1),
        };

        if let Some(long) = &self.long {
            arg = arg.long(long.clone());
        }
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }
        if let Some(value_name) = &self.value_name {
            arg = arg.value_name(value_name.clone());
        }
        if let Some(default) = &self.default_value {
            arg = arg.default_value(default.clone());
        }
        if !self.choices.is_empty() {
            arg = arg.value_parser(PossibleValuesParser::new(self.choices.clone()));
        }
        if self.kind != ArgKind::Flag {
            arg = arg.required(self.required && self.default_value.is_none());
        }

        arg
    }

    /// Read this argument's value out of clap matches.
    pub(crate) fn extract(&self, matches: &ArgMatches) -> ArgValue {
        if self.kind == ArgKind::Flag {
            return ArgValue::Flag(matches.get_flag(&self.id));
        }

        if self.multiple {
            return matches
                .get_many::<String>(&self.id)
                .map(|values| ArgValue::List(values.cloned().collect()))
                .unwrap_or(ArgValue::Absent);
        }

        matches
            .get_one::<String>(&self.id)
            .map(|value| ArgValue::Text(value.clone()))
            .unwrap_or(ArgValue::Absent)
    }
}

/// Value bound to one declared name after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    List(Vec<String>),
    Flag(bool),
    /// Declared but not supplied and without a default
    Absent,
}

/// Declared name → parsed value, handed to the handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    values: BTreeMap<String, ArgValue>,
}

impl ParsedArgs {
    pub(crate) fn from_matches(specs: &[ArgSpec], matches: &ArgMatches) -> Self {
        specs
            .iter()
            .map(|spec| (spec.id.clone(), spec.extract(matches)))
            .collect()
    }

    pub fn value(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// Single text value, `None` when absent or not a text argument.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ArgValue::Flag(true)))
    }

    /// All values supplied for `name`, in command-line order.
    pub fn values(&self, name: &str) -> Vec<&str> {
        match self.values.get(name) {
            Some(ArgValue::List(values)) => values.iter().map(String::as_str).collect(),
            Some(ArgValue::Text(value)) => vec![value.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, ArgValue)> for ParsedArgs {
    fn from_iter<I: IntoIterator<Item = (String, ArgValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// What a handler sees when it runs
pub struct Invocation<'a> {
    group: &'a str,
    command: &'a str,
    args: ParsedArgs,
    console: &'a mut Console,
    privilege: &'a dyn PrivilegeCheck,
}

impl<'a> Invocation<'a> {
    pub fn new(
        group: &'a str,
        command: &'a str,
        args: ParsedArgs,
        console: &'a mut Console,
        privilege: &'a dyn PrivilegeCheck,
    ) -> Self {
        Self {
            group,
            command,
            args,
            console,
            privilege,
        }
    }

    /// Name of the group the command belongs to (`base` for top-level ones).
    pub const fn group(&self) -> &str {
        self.group
    }

    pub const fn command(&self) -> &str {
        self.command
    }

    pub const fn args(&self) -> &ParsedArgs {
        &self.args
    }

    pub fn out(&mut self) -> &mut dyn Write {
        self.console.out()
    }

    pub fn err(&mut self) -> &mut dyn Write {
        self.console.err()
    }

    pub fn is_elevated(&self) -> bool {
        self.privilege.is_elevated()
    }
}

/// A named command with its handler and ordered argument list
#[derive(Clone)]
pub struct CommandSpec {
    name: String,
    about: Option<String>,
    handler: Handler,
    args: Vec<ArgSpec>,
}

impl CommandSpec {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::from_handler(name, Arc::new(handler))
    }

    pub fn from_handler(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            about: None,
            handler,
            args: Vec::new(),
        }
    }

    /// Help text shown in the parent listing and as the command description.
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about_text(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub(crate) fn into_parts(self) -> (String, Option<String>, Handler, Vec<ArgSpec>) {
        (self.name, self.about, self.handler, self.args)
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("about", &self.about)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
