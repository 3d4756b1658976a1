//! Flattening of the declaration tree into an [`Invocation`].

use super::declare::{group_label, Declaration};
use super::tree::DeclarationNode;
use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::model::{Command, CommandGroup, Invocation, Positional};

/// Consume the tree rooted at the parser node and build the model.
///
/// Children whose payload does not fit their position are skipped and
/// reported; everything else keeps its declaration order.
pub fn build_invocation(
    root: DeclarationNode,
    name: &str,
    diagnostics: &mut Diagnostics,
) -> Invocation {
    let mut invocation = Invocation {
        name: name.to_string(),
        ..Default::default()
    };
    for child in root.children {
        match child.declaration {
            Some(Declaration::Option(option)) => invocation.options.push(option),
            Some(Declaration::Argument(argument)) => {
                invocation.arguments.push(Positional::Argument(argument))
            }
            Some(Declaration::CommandGroup(group)) => {
                let group = populate_group(group, child.children, diagnostics);
                invocation.arguments.push(Positional::CommandGroup(group));
            }
            other => skip(other.as_ref(), "the top-level parser", diagnostics),
        }
    }
    invocation
}

fn populate_group(
    mut group: CommandGroup,
    children: Vec<DeclarationNode>,
    diagnostics: &mut Diagnostics,
) -> CommandGroup {
    let parent = group_label(&group);
    for child in children {
        match child.declaration {
            Some(Declaration::Command(command)) => {
                let command = populate_command(command, child.children, diagnostics);
                group.choices.push(command);
            }
            other => skip(other.as_ref(), &parent, diagnostics),
        }
    }
    group
}

fn populate_command(
    mut command: Command,
    children: Vec<DeclarationNode>,
    diagnostics: &mut Diagnostics,
) -> Command {
    for child in children {
        match child.declaration {
            Some(Declaration::Option(option)) => command.options.push(option),
            Some(Declaration::Argument(argument)) => {
                command.arguments.push(Positional::Argument(argument))
            }
            Some(Declaration::CommandGroup(group)) => {
                let group = populate_group(group, child.children, diagnostics);
                command.arguments.push(Positional::CommandGroup(group));
            }
            other => skip(
                other.as_ref(),
                &format!("command `{}`", command.name),
                diagnostics,
            ),
        }
    }
    command
}

fn skip(found: Option<&Declaration>, parent: &str, diagnostics: &mut Diagnostics) {
    let found = found.map_or_else(|| "untyped node".to_string(), Declaration::describe);
    diagnostics.report(&Error::UnexpectedNodeShape {
        found,
        parent: parent.to_string(),
    });
}
