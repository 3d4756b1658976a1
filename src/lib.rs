//! clixtragen: generate command-line helpers from argument parser
//! declarations found in program sources.
//!
//! The pipeline reads a Python source file, collects its `argparse` calls
//! into a declaration tree, flattens the tree into an [`Invocation`] and
//! renders it with a [`Generator`] (zsh, bash or fish completion, YAML or
//! JSON).

pub mod diagnostics;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, ReceiverKind, Result};
pub use model::{ActionKind, Argument, CliOption, Command, CommandGroup, Invocation, Positional};
pub use parser::{create_parser, SourceParser};
pub use render::{create_generator, Generator};

/// Parse `source` with the named parser and render it with the named generator.
pub fn generate(
    source: &str,
    executable: &str,
    parser: &str,
    generator: &str,
    diagnostics: &mut Diagnostics,
) -> Result<String> {
    let parser = create_parser(parser)?;
    let generator = create_generator(generator)?;
    let invocation = parser.parse(source, executable, diagnostics)?;
    generator.generate(&invocation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_zsh() {
        let source = "\
import argparse
parser = argparse.ArgumentParser()
parser.add_argument('-v', '--verbose', action='store_true', help='talk more')
parser.add_argument('target')
";
        let mut diagnostics = Diagnostics::new();
        let text = generate(source, "tool", "python", "zsh", &mut diagnostics).unwrap();
        assert!(text.starts_with("#compdef tool\n"));
        assert!(text.contains("--verbose"));
    }

    #[test]
    fn generator_checked_before_parsing() {
        let mut diagnostics = Diagnostics::new();
        let err = generate("not python (", "tool", "python", "tcsh", &mut diagnostics).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedInput { kind: "generator", .. }));
    }
}
