//! Invocation model: the renderer-ready description of a program's
//! command-line surface. Format-agnostic.

use serde::Serialize;

/// Complete command-line surface of one program.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Executable name, supplied by the caller.
    pub name: String,
    pub options: Vec<CliOption>,
    /// Positionals in declaration order; the order is the completion index.
    pub arguments: Vec<Positional>,
}

/// A positional slot: a plain argument or a subcommand selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Positional {
    Argument(Argument),
    CommandGroup(CommandGroup),
}

impl Positional {
    /// Display name of the slot, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Positional::Argument(arg) => Some(arg.name.as_str()),
            Positional::CommandGroup(group) => group.name.as_deref(),
        }
    }

    pub fn help(&self) -> Option<&str> {
        match self {
            Positional::Argument(arg) => arg.help.as_deref(),
            Positional::CommandGroup(group) => group.help.as_deref(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name: String,
    pub help: Option<String>,
    pub metavar: Option<String>,
    pub choices: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CliOption {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub help: Option<String>,
    pub metavar: Option<String>,
    /// Raw `action=` keyword, e.g. `store_true`.
    pub action: Option<String>,
    pub choices: Vec<String>,
}

/// Whether an option consumes a value on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    TakesValue,
    Flag,
}

/// argparse actions that never consume a value.
const FLAG_ACTIONS: &[&str] = &[
    "store_true",
    "store_false",
    "store_const",
    "append_const",
    "count",
    "help",
    "version",
];

impl CliOption {
    pub fn action_kind(&self) -> ActionKind {
        match self.action.as_deref() {
            Some(action) if FLAG_ACTIONS.contains(&action) => ActionKind::Flag,
            _ => ActionKind::TakesValue,
        }
    }

    /// All spellings of the option, short first.
    pub fn names(&self) -> Vec<&str> {
        self.short_name
            .iter()
            .chain(self.long_name.iter())
            .map(String::as_str)
            .collect()
    }
}

/// A named subcommand with its own options and positionals.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub name: String,
    pub help: Option<String>,
    pub options: Vec<CliOption>,
    pub arguments: Vec<Positional>,
}

/// A subparsers aggregator: a positional selecting one of its commands.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CommandGroup {
    /// `dest=` of the `add_subparsers` call.
    pub name: Option<String>,
    pub help: Option<String>,
    pub choices: Vec<Command>,
}
