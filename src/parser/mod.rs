//! Source parsers: turn program source into an [`Invocation`].

pub mod python;

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::model::Invocation;

/// Extracts the command-line surface declared by one source file.
pub trait SourceParser {
    fn parse(
        &self,
        source: &str,
        executable: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Invocation>;
}

/// Create a parser for the given language name.
pub fn create_parser(name: &str) -> Result<Box<dyn SourceParser>> {
    match name {
        "python" | "py" => Ok(Box::new(python::PythonParser)),
        _ => Err(Error::UnrecognizedInput {
            kind: "parser",
            name: name.to_string(),
            available: "python".to_string(),
        }),
    }
}
