//! Python `argparse` front end.
//!
//! Pipeline: gettext unwrapping, tokenizing, parsing, the call-extracting
//! walk into a [`DeclarationTree`], then flattening into an [`Invocation`].

pub mod call;
pub mod declare;
pub mod grammar;
pub mod invocation;
pub mod lexer;
pub mod syntax;
pub mod tree;
pub mod visitor;

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use self::invocation::build_invocation;
use self::tree::DeclarationTree;
use super::SourceParser;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::model::Invocation;

/// `help=_('...')` / `metavar=_("...")` with a single string literal inside.
static RE_GETTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(help|metavar)(\s*=\s*)_\(\s*('(?:[^'\\\n]|\\.)*'|"(?:[^"\\\n]|\\.)*")\s*\)"#,
    )
    .unwrap()
});

/// Unwrap gettext markers around help texts and metavars so the literal is
/// seen by the visitor instead of a (skipped) nested call.
pub fn ungettextize(source: &str) -> Cow<'_, str> {
    RE_GETTEXT.replace_all(source, "${1}${2}${3}")
}

#[derive(Debug, Default)]
pub struct PythonParser;

impl SourceParser for PythonParser {
    fn parse(
        &self,
        source: &str,
        executable: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Invocation> {
        let source = ungettextize(source);
        let body = grammar::parse_module(&source)?;
        diagnostics.debug(format!("parsed {} top-level statements", body.len()));

        let mut tree = DeclarationTree::new();
        visitor::visit_module(&body, &mut tree, diagnostics)?;
        let root = tree.into_root().ok_or(Error::MissingParser)?;
        Ok(build_invocation(root, executable, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::error::ReceiverKind;
    use crate::model::Positional;

    fn parse(source: &str) -> Result<Invocation> {
        PythonParser.parse(source, "prog", &mut Diagnostics::new())
    }

    #[test]
    fn gettext_wrappers_unwrapped() {
        let text = "p.add_argument('-o', help=_('output (file)'), metavar=_(\"FILE\"), x=_('y'))";
        assert_eq!(
            ungettextize(text),
            "p.add_argument('-o', help='output (file)', metavar=\"FILE\", x=_('y'))"
        );
    }

    #[test]
    fn subcommand_group_round_trip() {
        let inv = parse(
            "import argparse\nP = argparse.ArgumentParser()\n\
             subs = P.add_subparsers(dest='cmd')\nsubs.add_parser('go', help='run')\n",
        )
        .unwrap();
        assert_eq!(inv.name, "prog");
        let [Positional::CommandGroup(group)] = inv.arguments.as_slice() else {
            panic!("expected a single group");
        };
        assert_eq!(group.name.as_deref(), Some("cmd"));
        assert_eq!(group.choices.len(), 1);
        assert_eq!(group.choices[0].name, "go");
        assert_eq!(group.choices[0].help.as_deref(), Some("run"));
        assert!(group.choices[0].options.is_empty());
        assert!(group.choices[0].arguments.is_empty());
    }

    #[test]
    fn unbound_group_is_an_error() {
        let err = parse("import argparse\nP = argparse.ArgumentParser()\nsubs.add_parser('go')\n")
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedReference {
                name: "subs".into(),
                expected: ReceiverKind::CommandGroup,
            }
        );
    }

    #[test]
    fn missing_parser_is_an_error() {
        assert_eq!(parse("print('hello')\n").unwrap_err(), Error::MissingParser);
    }

    #[test]
    fn model_name_independent_of_variable() {
        let a = parse("a = argparse.ArgumentParser()\na.add_argument('x')\n").unwrap();
        let b = parse("zzz = ArgumentParser()\nzzz.add_argument('x')\n").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn nested_subcommands() {
        let source = "\
parser = argparse.ArgumentParser()
cmds = parser.add_subparsers(dest='cmd')
remote = cmds.add_parser('remote')
actions = remote.add_subparsers(dest='action')
add = actions.add_parser('add', help='add a remote')
add.add_argument('url', metavar='URL')
";
        let inv = parse(source).unwrap();
        let Positional::CommandGroup(cmd) = &inv.arguments[0] else {
            panic!("expected group");
        };
        let Positional::CommandGroup(action) = &cmd.choices[0].arguments[0] else {
            panic!("expected nested group");
        };
        assert_eq!(action.choices[0].name, "add");
        assert_eq!(action.choices[0].arguments[0].name(), Some("url"));
    }

    #[test]
    fn translated_help_reaches_model() {
        let mut diag = Diagnostics::new();
        let inv = PythonParser
            .parse(
                "p = ArgumentParser()\n\
                 p.add_argument('-v', action='count', help=_('be verbose'))\n",
                "prog",
                &mut diag,
            )
            .unwrap();
        assert_eq!(inv.options[0].help.as_deref(), Some("be verbose"));
        assert!(!diag.contains(Severity::Debug, "nested call ignored"));
    }

    #[test]
    fn escaped_help_texts() {
        let mut diag = Diagnostics::new();
        let inv = PythonParser
            .parse(
                "p = ArgumentParser()\n\
                 p.add_argument('-a', help='a\\N{BULLET}b')\n\
                 p.add_argument('-b', help='\\ud800')\n\
                 type Opt = str\n",
                "prog",
                &mut diag,
            )
            .unwrap();
        assert_eq!(inv.options[0].help.as_deref(), Some("a\u{2022}b"));
        assert_eq!(inv.options[1].short_name.as_deref(), Some("-b"));
        assert_eq!(inv.options[1].help, None);
        assert!(diag.contains(Severity::Warning, "string literal skipped"));
    }

    #[test]
    fn syntax_error_surfaces() {
        assert!(matches!(parse("def (:\n"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn repeated_runs_identical() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test1.py");
        let source = std::fs::read_to_string(path).unwrap();
        assert_eq!(parse(&source).unwrap(), parse(&source).unwrap());
    }
}
