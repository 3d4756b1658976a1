//! Generators: render an [`Invocation`] as a completion script or a dump.

pub mod bash;
pub mod fish;
pub mod json;
pub mod yaml;
pub mod zsh;

use crate::error::{Error, Result};
use crate::model::{CommandGroup, Invocation, Positional};

/// Renders an invocation model into a target format.
pub trait Generator {
    fn generate(&self, invocation: &Invocation) -> Result<String>;
}

/// Create a generator for the given format name.
pub fn create_generator(name: &str) -> Result<Box<dyn Generator>> {
    match name {
        "zsh" => Ok(Box::new(zsh::ZshGenerator)),
        "bash" => Ok(Box::new(bash::BashGenerator)),
        "fish" => Ok(Box::new(fish::FishGenerator)),
        "yaml" | "yml" => Ok(Box::new(yaml::YamlGenerator)),
        "json" => Ok(Box::new(json::JsonGenerator)),
        _ => Err(Error::UnrecognizedInput {
            kind: "generator",
            name: name.to_string(),
            available: "zsh, bash, fish, yaml, or json".to_string(),
        }),
    }
}

/// Kind of value a shell should offer for an option or argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionHint {
    File,
    Directory,
    NetworkInterface,
    Url,
    Value,
}

/// Derive the hint from a metavar's (case-insensitive) prefix.
pub fn completion_hint(metavar: Option<&str>) -> CompletionHint {
    let Some(metavar) = metavar else {
        return CompletionHint::Value;
    };
    let metavar = metavar.to_lowercase();
    if metavar.starts_with("file") {
        CompletionHint::File
    } else if metavar.starts_with("dir") {
        CompletionHint::Directory
    } else if metavar.starts_with("iface") {
        CompletionHint::NetworkInterface
    } else if metavar.starts_with("url") {
        CompletionHint::Url
    } else {
        CompletionHint::Value
    }
}

/// Positionals before the first subcommand group, and that group.
///
/// Words after a group belong to the selected subcommand, so the shells
/// only complete positionals up to it.
pub(crate) fn split_at_group(arguments: &[Positional]) -> (&[Positional], Option<&CommandGroup>) {
    for (index, positional) in arguments.iter().enumerate() {
        if let Positional::CommandGroup(group) = positional {
            return (&arguments[..index], Some(group));
        }
    }
    (arguments, None)
}

/// Name fragment usable in a shell function name.
pub(crate) fn identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
