//! Call classifier and declaration builders.
//!
//! Only string literals take part in a declaration; every other captured
//! value is dropped here with a debug note.

use super::call::Call;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::model::{Argument, CliOption, Command, CommandGroup};

/// The declaration calls the tree understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    CreateParser,
    AddSubparsers,
    AddArgument,
    AddParser,
    Other,
}

pub fn classify(call: &Call) -> CallKind {
    match call.attribute.as_deref() {
        Some("ArgumentParser") => CallKind::CreateParser,
        Some("add_subparsers") => CallKind::AddSubparsers,
        Some("add_argument") => CallKind::AddArgument,
        Some("add_parser") => CallKind::AddParser,
        // `from argparse import ArgumentParser`
        None if call.receiver.as_deref() == Some("ArgumentParser") => CallKind::CreateParser,
        _ => CallKind::Other,
    }
}

/// Payload attached to a declaration tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Argument(Argument),
    Option(CliOption),
    Command(Command),
    CommandGroup(CommandGroup),
}

/// String literals of a call.
struct Literals<'c> {
    args: Vec<&'c str>,
    keywords: Vec<(&'c str, &'c str)>,
}

impl<'c> Literals<'c> {
    fn collect(call: &'c Call, diagnostics: &mut Diagnostics) -> Self {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            match arg.as_str() {
                Some(value) => args.push(value),
                None => diagnostics.debug(format!("dropping non-string argument {arg} of {call}")),
            }
        }
        let mut keywords = Vec::with_capacity(call.keywords.len());
        for (name, value) in &call.keywords {
            match value.as_str() {
                Some(text) => keywords.push((name.as_str(), text)),
                None => diagnostics
                    .debug(format!("dropping non-string keyword {name}={value} of {call}")),
            }
        }
        Self { args, keywords }
    }

    /// Last value given for `name`.
    fn keyword(&self, name: &str) -> Option<String> {
        self.keywords
            .iter()
            .rev()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    /// Every value given for `name`, in order.
    fn keyword_all(&self, name: &str) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
            .collect()
    }

    fn first_arg(&self, call: &Call) -> Result<&'c str> {
        self.args
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidDeclaration {
                call: call.to_string(),
            })
    }
}

/// Build an option or a positional argument from an `add_argument` call.
///
/// A first positional string starting with `-` makes an option: `--x` sets
/// the long name, `-x` the short one, later spellings overwriting earlier
/// ones. Anything else is a positional named by that string.
pub fn create_argument(call: &Call, diagnostics: &mut Diagnostics) -> Result<Declaration> {
    let literals = Literals::collect(call, diagnostics);
    let first = literals.first_arg(call)?;
    let help = literals.keyword("help");
    let metavar = literals.keyword("metavar");
    let choices = literals.keyword_all("choices");

    if !first.starts_with('-') {
        diagnostics.debug(format!("created argument `{first}`"));
        return Ok(Declaration::Argument(Argument {
            name: first.to_string(),
            help,
            metavar,
            choices,
        }));
    }

    let mut option = CliOption {
        help,
        metavar,
        action: literals.keyword("action"),
        choices,
        ..Default::default()
    };
    for arg in &literals.args {
        if arg.starts_with("--") {
            option.long_name = Some(arg.to_string());
        } else if arg.starts_with('-') {
            option.short_name = Some(arg.to_string());
        }
    }
    diagnostics.debug(format!("created option `{}`", option.names().join(" ")));
    Ok(Declaration::Option(option))
}

/// Build a subcommand group from an `add_subparsers` call.
pub fn create_command_group(call: &Call, diagnostics: &mut Diagnostics) -> CommandGroup {
    let literals = Literals::collect(call, diagnostics);
    CommandGroup {
        name: literals.keyword("dest"),
        help: literals.keyword("help"),
        choices: Vec::new(),
    }
}

/// Build a subcommand from an `add_parser` call.
pub fn create_command(call: &Call, diagnostics: &mut Diagnostics) -> Result<Command> {
    let literals = Literals::collect(call, diagnostics);
    let name = literals.first_arg(call)?;
    diagnostics.debug(format!("created command `{name}`"));
    Ok(Command {
        name: name.to_string(),
        help: literals.keyword("help"),
        ..Default::default()
    })
}

impl Declaration {
    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Declaration::Argument(arg) => format!("argument `{}`", arg.name),
            Declaration::Option(opt) => format!("option `{}`", opt.names().join(" ")),
            Declaration::Command(cmd) => format!("command `{}`", cmd.name),
            Declaration::CommandGroup(group) => group_label(group),
        }
    }
}

pub(crate) fn group_label(group: &CommandGroup) -> String {
    match &group.name {
        Some(name) => format!("subcommand group `{name}`"),
        None => "subcommand group".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::call::CallArgument;
    use super::*;
    use crate::diagnostics::Severity;

    fn call(attribute: &str, args: &[CallArgument], keywords: &[(&str, CallArgument)]) -> Call {
        Call {
            receiver: Some("parser".into()),
            attribute: Some(attribute.into()),
            args: args.to_vec(),
            keywords: keywords
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }

    fn s(value: &str) -> CallArgument {
        CallArgument::String(value.into())
    }

    #[test]
    fn classify_by_method() {
        assert_eq!(classify(&call("ArgumentParser", &[], &[])), CallKind::CreateParser);
        assert_eq!(classify(&call("add_subparsers", &[], &[])), CallKind::AddSubparsers);
        assert_eq!(classify(&call("add_argument", &[], &[])), CallKind::AddArgument);
        assert_eq!(classify(&call("add_parser", &[], &[])), CallKind::AddParser);
        assert_eq!(classify(&call("set_defaults", &[], &[])), CallKind::Other);
        let bare = Call {
            receiver: Some("ArgumentParser".into()),
            ..Default::default()
        };
        assert_eq!(classify(&bare), CallKind::CreateParser);
    }

    #[test]
    fn long_and_short_names() {
        let mut diag = Diagnostics::new();
        let decl = create_argument(
            &call(
                "add_argument",
                &[s("--dry-run"), s("-n")],
                &[("action", s("store_true")), ("help", s("do not commit"))],
            ),
            &mut diag,
        )
        .unwrap();
        let Declaration::Option(opt) = decl else {
            panic!("expected option");
        };
        assert_eq!(opt.short_name.as_deref(), Some("-n"));
        assert_eq!(opt.long_name.as_deref(), Some("--dry-run"));
        assert_eq!(opt.action.as_deref(), Some("store_true"));
        assert_eq!(opt.help.as_deref(), Some("do not commit"));
    }

    #[test]
    fn identity_ignores_keywords() {
        let mut diag = Diagnostics::new();
        for keywords in [vec![], vec![("metavar", s("FILE")), ("help", s("x"))]] {
            let short = create_argument(&call("add_argument", &[s("-o")], &keywords), &mut diag)
                .unwrap();
            assert!(matches!(
                short,
                Declaration::Option(ref o)
                    if o.short_name.as_deref() == Some("-o") && o.long_name.is_none()
            ));
            let positional =
                create_argument(&call("add_argument", &[s("out")], &keywords), &mut diag).unwrap();
            assert!(matches!(positional, Declaration::Argument(ref a) if a.name == "out"));
        }
    }

    #[test]
    fn later_spelling_overwrites() {
        let mut diag = Diagnostics::new();
        let decl =
            create_argument(&call("add_argument", &[s("-a"), s("-b")], &[]), &mut diag).unwrap();
        assert!(matches!(
            decl,
            Declaration::Option(ref o) if o.short_name.as_deref() == Some("-b")
        ));
    }

    #[test]
    fn non_strings_dropped_with_note() {
        let mut diag = Diagnostics::new();
        let decl = create_argument(
            &call(
                "add_argument",
                &[CallArgument::Reference("NAME".into()), s("path")],
                &[("help", CallArgument::Number("3".into()))],
            ),
            &mut diag,
        )
        .unwrap();
        assert!(matches!(
            decl,
            Declaration::Argument(ref a) if a.name == "path" && a.help.is_none()
        ));
        assert!(diag.contains(Severity::Debug, "dropping non-string argument NAME"));
        assert!(diag.contains(Severity::Debug, "dropping non-string keyword help=3"));
    }

    #[test]
    fn no_string_argument_is_invalid() {
        let mut diag = Diagnostics::new();
        let args = [CallArgument::Reference("X".into())];
        let err = create_argument(&call("add_argument", &args, &[]), &mut diag).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidDeclaration {
                call: "parser.add_argument(X)".into()
            }
        );
        assert!(create_command(&call("add_parser", &[], &[]), &mut diag).is_err());
    }

    #[test]
    fn duplicate_keywords_last_wins_except_choices() {
        let mut diag = Diagnostics::new();
        let decl = create_argument(
            &call(
                "add_argument",
                &[s("mode")],
                &[
                    ("help", s("first")),
                    ("choices", s("a")),
                    ("help", s("second")),
                    ("choices", s("b")),
                ],
            ),
            &mut diag,
        )
        .unwrap();
        let Declaration::Argument(arg) = decl else {
            panic!("expected argument");
        };
        assert_eq!(arg.help.as_deref(), Some("second"));
        assert_eq!(arg.choices, ["a", "b"]);
    }

    #[test]
    fn group_and_command() {
        let mut diag = Diagnostics::new();
        let group = create_command_group(
            &call("add_subparsers", &[], &[("dest", s("cmd")), ("help", s("commands"))]),
            &mut diag,
        );
        assert_eq!(group.name.as_deref(), Some("cmd"));
        assert_eq!(group.help.as_deref(), Some("commands"));
        let unnamed = create_command_group(&call("add_subparsers", &[], &[]), &mut diag);
        assert_eq!(unnamed.name, None);

        let cmd = create_command(&call("add_parser", &[s("go")], &[("help", s("run"))]), &mut diag)
            .unwrap();
        assert_eq!(cmd.name, "go");
        assert_eq!(cmd.help.as_deref(), Some("run"));
        assert!(cmd.options.is_empty() && cmd.arguments.is_empty());
    }
}
