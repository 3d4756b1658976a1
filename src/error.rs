//! Error type shared by the parsing pipeline and the generators.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// What a receiver name was expected to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverKind {
    /// The top-level parser or a subcommand parser.
    Parser,
    /// A subparsers object returned by `add_subparsers`.
    CommandGroup,
}

impl fmt::Display for ReceiverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverKind::Parser => f.write_str("a parser"),
            ReceiverKind::CommandGroup => f.write_str("a subcommand group"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A receiver used by a declaration call is not bound in the tree.
    #[error("cannot resolve `{name}` to {expected}")]
    UnresolvedReference { name: String, expected: ReceiverKind },

    /// An `add_argument`/`add_parser` call without any literal name.
    #[error("invalid option or argument declaration: {call}")]
    InvalidDeclaration { call: String },

    /// A declaration found where the model builder cannot place it.
    /// Never returned: the node is skipped and this is reported as a warning.
    #[error("unexpected {found} under {parent}, skipped")]
    UnexpectedNodeShape { found: String, parent: String },

    #[error("unknown {kind}: {name}. Use {available}")]
    UnrecognizedInput {
        kind: &'static str,
        name: String,
        available: String,
    },

    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("no argument parser construction found")]
    MissingParser,

    #[error("cannot serialize invocation: {0}")]
    Serialize(String),
}

impl Error {
    pub(crate) fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}
